// src/utils/isbn.rs

//! ISBN normalization, checksum validation and extraction from free text.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, Result};

/// Strip separators and uppercase the `X` check character.
///
/// # Examples
/// ```
/// use librarycard::utils::isbn::normalize;
///
/// assert_eq!(normalize("0-306-40615-x"), "030640615X");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether `raw` is a checksum-valid ISBN-10 or ISBN-13.
pub fn is_valid(raw: &str) -> bool {
    let isbn = normalize(raw);
    match isbn.len() {
        10 => valid_isbn10(&isbn),
        13 => valid_isbn13(&isbn),
        _ => false,
    }
}

/// Normalize and validate, failing with `InvalidIsbn`.
pub fn parse(raw: &str) -> Result<String> {
    let isbn = normalize(raw);
    if is_valid(&isbn) {
        Ok(isbn)
    } else {
        Err(AppError::InvalidIsbn(raw.trim().to_string()))
    }
}

/// Convert to ISBN-13. Valid ISBN-13s are returned unchanged.
pub fn to_isbn13(raw: &str) -> Option<String> {
    let isbn = normalize(raw);
    match isbn.len() {
        13 if valid_isbn13(&isbn) => Some(isbn),
        10 if valid_isbn10(&isbn) => {
            let stem = format!("978{}", &isbn[..9]);
            let check = isbn13_check_digit(&stem)?;
            Some(format!("{stem}{check}"))
        }
        _ => None,
    }
}

/// Whether two strings denote the same ISBN, across 10/13 forms.
pub fn same_isbn(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    match (to_isbn13(&a), to_isbn13(&b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Find checksum-valid ISBNs in OCR or pasted text, in order of appearance.
///
/// Each run of digits and separators is scanned window by window, so a
/// stray digit or a split EAN prefix (`9 780140 449136`) does not hide
/// the ISBN next to it.
pub fn extract_candidates(text: &str) -> Vec<String> {
    static RUN: OnceLock<Regex> = OnceLock::new();
    let run = RUN.get_or_init(|| {
        Regex::new(r"(?i)[\dX][\dX\s-]{8,}[\dX]").expect("static ISBN regex")
    });

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for m in run.find_iter(text) {
        for isbn in scan_run(&normalize(m.as_str())) {
            if seen.insert(isbn.clone()) {
                found.push(isbn);
            }
        }
    }
    found
}

/// Valid ISBNs inside a normalized run, preferring 13 digits over 10 at
/// each position. Matched windows are consumed.
fn scan_run(run: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut at = 0;
    while at + 10 <= run.len() {
        let hit = [13, 10].into_iter().find_map(|len| {
            run.get(at..at + len)
                .filter(|window| is_valid(window))
                .map(|window| window.to_string())
        });
        match hit {
            Some(isbn) => {
                at += isbn.len();
                found.push(isbn);
            }
            None => at += 1,
        }
    }
    found
}

fn valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn valid_isbn13(isbn: &str) -> bool {
    if !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    isbn13_check_digit(&isbn[..12]) == isbn.chars().nth(12)
}

fn isbn13_check_digit(stem: &str) -> Option<char> {
    let mut sum = 0u32;
    for (i, c) in stem.chars().enumerate() {
        let digit = c.to_digit(10)?;
        sum += if i % 2 == 0 { digit } else { digit * 3 };
    }
    char::from_digit((10 - sum % 10) % 10, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_both_lengths() {
        assert!(is_valid("0-306-40615-2"));
        assert!(is_valid("978-0-306-40615-7"));
        assert!(is_valid("080442957X"));
        assert!(!is_valid("0-306-40615-3"));
        assert!(!is_valid("9780306406158"));
        assert!(!is_valid("X803064061"));
        assert!(!is_valid("12345"));
    }

    #[test]
    fn converts_isbn10_to_isbn13() {
        assert_eq!(to_isbn13("0306406152").as_deref(), Some("9780306406157"));
        assert_eq!(to_isbn13("9780306406157").as_deref(), Some("9780306406157"));
        assert_eq!(to_isbn13("0306406153"), None);
    }

    #[test]
    fn same_isbn_across_forms() {
        assert!(same_isbn("0-306-40615-2", "9780306406157"));
        assert!(same_isbn("978 0306406157", "9780306406157"));
        assert!(!same_isbn("", ""));
        assert!(!same_isbn("9780306406157", "9780441013593"));
    }

    #[test]
    fn parse_rejects_invalid() {
        assert_eq!(parse(" 978-0-441-01359-3 ").unwrap(), "9780441013593");
        assert!(matches!(parse("not an isbn"), Err(AppError::InvalidIsbn(_))));
    }

    #[test]
    fn extracts_from_ocr_text() {
        let text = "Penguin Books\nISBN 978-0-14-044913-6\nprice 12.99\nISBN-10: 0140449132 \
                    copy 978-0-14-044913-6 again";
        assert_eq!(
            extract_candidates(text),
            vec!["9780140449136".to_string(), "0140449132".to_string()]
        );
    }

    #[test]
    fn extracts_split_ean_barcode_line() {
        assert_eq!(extract_candidates("9 780140 449136"), vec!["9780140449136".to_string()]);
    }

    #[test]
    fn stray_digit_does_not_hide_isbn() {
        assert_eq!(extract_candidates("Vol 3 0140449132"), vec!["0140449132".to_string()]);
        assert_eq!(
            extract_candidates("0140449132 9780441013593"),
            vec!["0140449132".to_string(), "9780441013593".to_string()]
        );
    }

    #[test]
    fn extraction_skips_checksum_failures() {
        assert!(extract_candidates("order number 1234567890123").is_empty());
    }
}
