use thiserror::Error;
use serde::Serialize;

/// User-facing message for a conversion the table cannot resolve.
pub const ERR_CONVERSION_UNAVAILABLE: &str = "Conversion not available for the selected units.";

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// No rule in either direction for (category, from, to). Unknown categories
    /// and unknown units end up here too.
    #[error("Conversion not available for the selected units. ({category}: {from} -> {to})")]
    ConversionUnavailable {
        category: String,
        from: String,
        to: String,
    },

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Config Error: {0}")]
    Config(String),
}

impl AppError {
    pub fn unavailable(category: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        AppError::ConversionUnavailable {
            category: category.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_conversion_unavailable(&self) -> bool {
        matches!(self, AppError::ConversionUnavailable { .. })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            AppError::Io(err.to_string())
        } else {
            AppError::Storage(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("Serialization error: {}", err))
    }
}

impl From<tempfile::PersistError> for AppError {
    fn from(err: tempfile::PersistError) -> Self {
        AppError::Io(err.error.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
