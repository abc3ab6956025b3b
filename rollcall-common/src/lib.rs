//! # Rollcall Common Library
//!
//! Shared code for the Rollcall attendance service including:
//! - Class and student records
//! - Attendance dates and history filtering
//! - Roll number ordering
//! - Image references (data URIs)
//! - Event types (RollcallEvent) and the EventBus
//! - Configuration loading

pub mod config;
pub mod dates;
pub mod error;
pub mod events;
pub mod image;
pub mod models;
pub mod roll;

pub use dates::AttendanceDate;
pub use error::{Error, Result};
pub use image::ImageData;
