//! Validation helpers and constants for registry identifiers

use regex::Regex;

lazy_static::lazy_static! {
    /// Registry document validation regex
    /// Allows alphanumeric characters with hyphens, 4-20 characters,
    /// starting with an alphanumeric character
    pub static ref DOCUMENT_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{3,19}$").unwrap();
}

/// Validate a registry document identifier
pub fn validate_document(document: &str) -> bool {
    DOCUMENT_REGEX.is_match(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_regex() {
        // Valid documents
        assert!(validate_document("1002003"));
        assert!(validate_document("CC-1002003"));
        assert!(validate_document("abcd"));
        assert!(validate_document("A1B2"));

        // Invalid documents
        assert!(!validate_document(""));
        assert!(!validate_document("abc"));
        assert!(!validate_document("-1002003"));
        assert!(!validate_document("has space"));
        assert!(!validate_document("под-документ"));
        assert!(!validate_document(&"a".repeat(21)));
        assert!(validate_document(&"a".repeat(20)));
    }
}
