//! Error types for boundary construction and clipping

use std::path::PathBuf;

use thiserror::Error;

use crate::error::GeoJsonError;

/// Errors that make the input boundary unusable
///
/// These are fatal: no feature is fetched or rendered without a boundary.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Fewer than three distinct points after removing duplicates
    #[error("boundary needs at least 3 distinct points, found {found}")]
    TooFewPoints { found: usize },

    /// A coordinate is NaN or infinite
    #[error("boundary coordinate {index} is not finite")]
    NonFiniteCoordinate { index: usize },

    /// Nothing is left of the ring after repairing it
    #[error("boundary is empty after repairing an invalid polygon")]
    EmptyAfterRepair,

    /// Buffer distance is negative or not finite
    #[error("invalid buffer distance {0}")]
    InvalidBufferDistance(f64),

    /// The boundary document could not be read
    #[error("failed to read boundary file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The boundary document is not usable GeoJSON
    #[error("malformed boundary document: {0}")]
    Malformed(#[from] GeoJsonError),
}

/// Per-layer clip failure
///
/// Recoverable: the caller keeps the unclipped layer and reports a warning.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("feature {feature} of layer '{layer}' has non-finite coordinates")]
    NonFiniteCoordinate { layer: String, feature: usize },

    #[error("feature {feature} of layer '{layer}' is degenerate: {reason}")]
    Degenerate {
        layer: String,
        feature: usize,
        reason: String,
    },
}

impl ClipError {
    /// Name of the layer that failed to clip
    pub fn layer(&self) -> &str {
        match self {
            Self::NonFiniteCoordinate { layer, .. } | Self::Degenerate { layer, .. } => layer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_points_display() {
        let err = GeometryError::TooFewPoints { found: 2 };
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_clip_error_names_layer() {
        let err = ClipError::NonFiniteCoordinate {
            layer: "water".to_string(),
            feature: 3,
        };
        assert_eq!(err.layer(), "water");
        assert!(err.to_string().contains("'water'"));
    }
}
