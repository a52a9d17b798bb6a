//! Validation of names that end up as URL path segments.

use crate::Error;

/// Upper bound for account, client, and library template names.
pub const NAME_MAX_LEN: usize = 256;

/// Upper bound for survey codes.
pub const SURVEY_CODE_MAX_LEN: usize = 28;

/// Why a name was rejected. The display text names the violated rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{label} too short, must be between {min} and {max} characters")]
    TooShort {
        label: String,
        min: usize,
        max: usize,
    },

    #[error("{label} too long, must be between {min} and {max} characters")]
    TooLong {
        label: String,
        min: usize,
        max: usize,
    },

    #[error("{label} must start with a letter")]
    LeadingLetter { label: String },

    #[error("{label} must contain only characters in \"[a-z0-9_]\"")]
    Charset { label: String },
}

/// Checks `value` against the URL field rules and returns its lower-cased form.
///
/// Length is counted in characters. The first character must be alphabetic
/// and every character, once lower-cased, must be in `[a-z0-9_]`.
pub fn valid_url_field(
    label: &str,
    value: &str,
    min_len: usize,
    max_len: usize,
) -> Result<String, FieldError> {
    let len = value.chars().count();
    if len < min_len {
        return Err(FieldError::TooShort {
            label: label.into(),
            min: min_len,
            max: max_len,
        });
    }
    if len > max_len {
        return Err(FieldError::TooLong {
            label: label.into(),
            min: min_len,
            max: max_len,
        });
    }

    // An empty value with min_len == 0 has no first character to check.
    if let Some(first) = value.chars().next() {
        if !first.is_alphabetic() {
            return Err(FieldError::LeadingLetter {
                label: label.into(),
            });
        }
    }

    let lowered = value.to_lowercase();
    if !lowered
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(FieldError::Charset {
            label: label.into(),
        });
    }

    Ok(lowered)
}

/// Same as [`valid_url_field`], failing with [`Error::Runtime`].
pub fn require_url_field(
    label: &str,
    value: &str,
    min_len: usize,
    max_len: usize,
) -> Result<String, Error> {
    valid_url_field(label, value, min_len, max_len).map_err(|e| Error::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_lowercases() {
        assert_eq!(
            valid_url_field("Client name", "SurvoxHealth_2", 1, 256).unwrap(),
            "survoxhealth_2"
        );
    }

    #[test]
    fn accepts_single_letter() {
        assert_eq!(valid_url_field("Client name", "A", 1, 256).unwrap(), "a");
    }

    #[test]
    fn accepts_exact_max_length() {
        let name = format!("a{}", "b".repeat(27));
        assert_eq!(valid_url_field("Survey surveycode", &name, 1, 28).unwrap(), name);
    }

    #[test]
    fn rejects_empty() {
        let err = valid_url_field("Client name", "", 1, 256).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Client name too short, must be between 1 and 256 characters"
        );
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(29);
        let err = valid_url_field("Survey surveycode", &name, 1, 28).unwrap_err();
        assert!(matches!(err, FieldError::TooLong { .. }));
        assert_eq!(
            err.to_string(),
            "Survey surveycode too long, must be between 1 and 28 characters"
        );
    }

    #[test]
    fn rejects_leading_digit() {
        let err = valid_url_field("Client name", "9abc", 1, 256).unwrap_err();
        assert_eq!(err.to_string(), "Client name must start with a letter");
    }

    #[test]
    fn rejects_leading_underscore() {
        let err = valid_url_field("Client name", "_abc", 1, 256).unwrap_err();
        assert!(matches!(err, FieldError::LeadingLetter { .. }));
    }

    #[test]
    fn rejects_disallowed_characters() {
        for bad in ["ab-c", "ab c", "abc/", "ab.c", "abé"] {
            let err = valid_url_field("Client name", bad, 1, 256).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Client name must contain only characters in \"[a-z0-9_]\"",
                "value {bad:?}"
            );
        }
    }

    #[test]
    fn length_counts_characters() {
        // Two characters, four bytes: fails on charset, not length.
        let err = valid_url_field("x", "éé", 1, 2).unwrap_err();
        assert!(matches!(err, FieldError::Charset { .. }));
    }

    #[test]
    fn require_maps_to_runtime() {
        let err = require_url_field("Account name", "1x", 1, 256).unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "Error[0] - Account name must start with a letter");
    }
}
