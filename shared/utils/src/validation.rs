use crate::error::{LcmError, LcmResult};
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> LcmResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(LcmError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("length") => {
                    format!("Length validation failed for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("range") => {
                    format!("Value out of range for field '{}'", field)
                }
                std::borrow::Cow::Borrowed("invalid_regex") => {
                    format!("Field '{}' contains an invalid regular expression", field)
                }
                std::borrow::Cow::Borrowed("blank_keyword") => {
                    format!("Field '{}' contains a blank keyword", field)
                }
                _ => format!("Validation failed for field '{}': {}", field, error.code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Custom validator: every entry must compile as a regular expression
pub fn validate_regex_list(patterns: &[String]) -> Result<(), ValidationError> {
    for pattern in patterns {
        if Regex::new(pattern).is_err() {
            let mut error = ValidationError::new("invalid_regex");
            error.add_param("pattern".into(), pattern);
            return Err(error);
        }
    }
    Ok(())
}

/// Custom validator: keywords are matched as substrings, so a blank one
/// would match every row
pub fn validate_keywords(keywords: &[String]) -> Result<(), ValidationError> {
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ValidationError::new("blank_keyword"));
    }
    Ok(())
}

/// Lower-cases, trims and collapses internal whitespace
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
