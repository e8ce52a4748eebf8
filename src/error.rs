use thiserror::Error;

use crate::brush::BrushType;

#[derive(Debug, Error)]
pub enum InkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Brush asset '{brush}' unavailable: {reason}")]
    AssetLoad { brush: BrushType, reason: String },

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image encode error: {0}")]
    Encode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("A stroke is still in progress")]
    StrokeInProgress,

    #[error("Background task failed: {0}")]
    Worker(String),
}

impl InkError {
    pub(crate) fn asset(brush: BrushType, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            brush,
            reason: reason.into(),
        }
    }
}

impl From<InkError> for String {
    fn from(err: InkError) -> Self {
        err.to_string()
    }
}

impl From<serde_json::Error> for InkError {
    fn from(e: serde_json::Error) -> Self {
        InkError::Config(e.to_string())
    }
}

pub type InkResult<T> = Result<T, InkError>;
