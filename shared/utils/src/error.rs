use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural failures that abort a single sheet.
///
/// Row-level problems never surface here; they are counted in the
/// completion report instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyError {
    #[error("Sheet '{sheet}' is empty")]
    EmptySheet { sheet: String },

    #[error("No header row found in sheet '{sheet}' (scanned rows 0..{scanned_rows}, best score {best_score}, need {min_score})")]
    HeaderNotFound {
        sheet: String,
        scanned_rows: usize,
        best_score: usize,
        min_score: usize,
    },

    #[error("Required column '{field}' not found in header row {header_row} of sheet '{sheet}'")]
    MissingRequiredColumn {
        sheet: String,
        field: String,
        header_row: usize,
    },
}

impl AssemblyError {
    pub fn sheet(&self) -> &str {
        match self {
            Self::EmptySheet { sheet }
            | Self::HeaderNotFound { sheet, .. }
            | Self::MissingRequiredColumn { sheet, .. } => sheet,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptySheet { .. } => "EMPTY_SHEET",
            Self::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            Self::MissingRequiredColumn { .. } => "MISSING_REQUIRED_COLUMN",
        }
    }
}

#[derive(Error, Debug)]
pub enum LcmError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Rule error in '{vendor}': {message}")]
    Rules { vendor: String, message: String },

    #[error("Unknown vendor: {vendor}")]
    UnknownVendor { vendor: String },

    #[error("Workbook error: {message}")]
    Workbook { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LcmError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn rules(vendor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rules {
            vendor: vendor.into(),
            message: message.into(),
        }
    }

    pub fn unknown_vendor(vendor: impl Into<String>) -> Self {
        Self::UnknownVendor {
            vendor: vendor.into(),
        }
    }

    pub fn workbook(message: impl Into<String>) -> Self {
        Self::Workbook {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Assembly(inner) => inner.error_code(),
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Rules { .. } => "RULE_ERROR",
            Self::UnknownVendor { .. } => "UNKNOWN_VENDOR",
            Self::Workbook { .. } => "WORKBOOK_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

pub type LcmResult<T> = Result<T, LcmError>;

/// Serializable error body handed to the calling service
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<LcmError> for ErrorResponse {
    fn from(error: LcmError) -> Self {
        let details = match &error {
            LcmError::Assembly(inner) => serde_json::to_value(inner).ok(),
            _ => None,
        };
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
        }
    }
}

impl From<config::ConfigError> for LcmError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}

impl From<serde_yaml::Error> for LcmError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::configuration(format!("invalid rule file: {}", error))
    }
}

impl From<serde_json::Error> for LcmError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<anyhow::Error> for LcmError {
    fn from(error: anyhow::Error) -> Self {
        Self::workbook(format!("{:#}", error))
    }
}

impl From<std::io::Error> for LcmError {
    fn from(error: std::io::Error) -> Self {
        Self::internal(error.to_string())
    }
}
