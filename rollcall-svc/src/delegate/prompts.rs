//! Prompt construction for the generative model
//!
//! Each builder returns the ordered content parts of one user turn. Images
//! are interleaved with the text that introduces them.

use rollcall_common::ImageData;
use serde::Serialize;

use super::{RecognitionRequest, SummaryRequest};

/// One content part of a `generateContent` request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(image: &ImageData) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type().to_string(),
                data: image.base64_payload().to_string(),
            },
        }
    }
}

const RECOGNITION_INSTRUCTIONS: &str = "\
You match faces in a classroom photograph against reference photos of enrolled students.

Steps:
1. Find every clearly visible human face in the classroom photograph and report the count as totalFacesDetected.
2. Compare each face with every student reference photo below.
3. List a student in presentStudents only when their face is clearly visible and confidently matches their reference photo.
4. For each listed student give the face bounding box: x and y are the top-left corner, width and height the size, all as fractions (0 to 1) of the image dimensions.

Answer with JSON only, shaped as:
{\"totalFacesDetected\": <number>, \"presentStudents\": [{\"rollNumber\": \"<roll number>\", \"box\": {\"x\": 0.0, \"y\": 0.0, \"width\": 0.0, \"height\": 0.0}}]}";

const FACE_COUNT_INSTRUCTIONS: &str = "\
Count the human faces in this image. Only count faces that are clear and visible; skip faces that are mostly hidden or out of focus.

Answer with JSON only, shaped as: {\"faceCount\": <number>}";

/// Parts for a recognition request
pub fn recognition_parts(request: &RecognitionRequest) -> Vec<Part> {
    let mut parts = Vec::with_capacity(3 + request.student_profiles.len() * 2);
    parts.push(Part::text(RECOGNITION_INSTRUCTIONS));
    parts.push(Part::text("Classroom photograph:"));
    parts.push(Part::image(&request.class_photo));
    parts.push(Part::text("Enrolled students:"));

    for profile in &request.student_profiles {
        parts.push(Part::text(format!(
            "Student roll number: {}\nReference photo:",
            profile.roll_number
        )));
        parts.push(Part::image(&profile.profile_photo));
    }

    parts
}

/// Parts for a face count request
pub fn face_count_parts(photo: &ImageData) -> Vec<Part> {
    vec![
        Part::text(FACE_COUNT_INSTRUCTIONS),
        Part::text("Image:"),
        Part::image(photo),
    ]
}

/// Parts for an attendance summary request
pub fn summary_parts(request: &SummaryRequest) -> Vec<Part> {
    vec![Part::text(format!(
        "You summarize student attendance for one class over a date range so faculty can spot \
         students who need intervention.\n\n\
         Class code: {}\n\
         Start date: {}\n\
         End date: {}\n\
         Attendance data (JSON; each student lists the dates they were present): {}\n\n\
         Write a concise summary that highlights students with poor attendance and gives \
         actionable suggestions for the faculty.\n\n\
         Answer with JSON only, shaped as: {{\"summary\": \"<text>\"}}",
        request.class_code, request.start_date, request.end_date, request.attendance_data
    ))]
}
