//! Roll number ordering
//!
//! Rosters are shown sorted by roll number with digit runs compared by
//! numeric value, so "2" sorts before "10" and "CS-9" before "CS-10".

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(s)
    } else {
        Chunk::Text(s)
    }
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Numeric-aware comparison of two roll numbers.
///
/// Falls back to a plain byte comparison when the natural comparison ties
/// (e.g. "007" vs "7"), so the ordering is total.
pub fn compare_roll_numbers(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => cmp_text(x, y),
            // digits before letters, as in a locale-aware sort
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<&str>) -> Vec<&str> {
        v.sort_by(|a, b| compare_roll_numbers(a, b));
        v
    }

    #[test]
    fn test_numeric_runs_compare_by_value() {
        assert_eq!(sorted(vec!["10", "2", "1", "101"]), vec!["1", "2", "10", "101"]);
    }

    #[test]
    fn test_prefixed_roll_numbers() {
        assert_eq!(
            sorted(vec!["CS-10", "CS-9", "cs-11", "CS-1"]),
            vec!["CS-1", "CS-9", "CS-10", "cs-11"]
        );
    }

    #[test]
    fn test_suffix_sorts_after_bare_number() {
        assert_eq!(sorted(vec!["10a", "10", "9"]), vec!["9", "10", "10a"]);
    }

    #[test]
    fn test_leading_zeros_tie_break_is_total() {
        assert_eq!(compare_roll_numbers("007", "7"), "007".cmp("7"));
        assert_eq!(compare_roll_numbers("7", "7"), Ordering::Equal);
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(compare_roll_numbers("", ""), Ordering::Equal);
        assert_eq!(compare_roll_numbers("", "1"), Ordering::Less);
    }
}
