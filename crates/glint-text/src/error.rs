use std::fmt;

/// Errors raised while loading a font atlas.
#[derive(Debug)]
pub enum TextError {
    /// The font-atlas JSON could not be parsed.
    Json(serde_json::Error),
    /// The atlas parsed but its metrics are unusable.
    InvalidMetrics(String),
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextError::Json(e) => write!(f, "malformed font atlas JSON: {}", e),
            TextError::InvalidMetrics(reason) => write!(f, "invalid font atlas: {}", reason),
        }
    }
}

impl std::error::Error for TextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextError::Json(e) => Some(e),
            TextError::InvalidMetrics(_) => None,
        }
    }
}

impl From<serde_json::Error> for TextError {
    fn from(e: serde_json::Error) -> Self {
        TextError::Json(e)
    }
}

pub type TextResult<T> = Result<T, TextError>;
