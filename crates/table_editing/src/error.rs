//! Error types for table editing

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableEditError {
    #[error("Division by zero")]
    DivideByZero,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid width value {value}: {reason}")]
    InvalidPixelPercent { value: i32, reason: String },

    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("No editable table is selected")]
    NoTableSelected,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document error: {0}")]
    Dom(#[from] html_dom::DomError),
}

pub type Result<T> = std::result::Result<T, TableEditError>;
