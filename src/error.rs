//! Error types for reading GeoJSON documents

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoJsonError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid GeoJSON at {context}: {message}")]
    Invalid { context: String, message: String },

    #[error("unsupported geometry type '{0}'")]
    UnsupportedGeometry(String),

    #[error("document contains no polygon feature")]
    NoPolygon,
}

impl GeoJsonError {
    pub fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            context: context.into(),
            message: message.into(),
        }
    }
}
