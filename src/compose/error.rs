//! Error types for map composition

use thiserror::Error;

/// Errors that can occur while composing a map
#[derive(Debug, Error, PartialEq)]
pub enum ComposeError {
    #[error("canvas size must be a positive number of centimetres, got {0}")]
    InvalidSize(f64),

    #[error("line thickness must be a non-negative number, got {0}")]
    InvalidThickness(f64),

    #[error("font size must be a positive number of points, got {0}")]
    InvalidFontSize(f64),
}
