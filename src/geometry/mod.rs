//! Boundary construction, buffering and clipping
//!
//! This module takes the raw coordinate ring of a place and produces the
//! polygons that drive fetching (buffered) and clipping (exact).

pub mod boundary;
pub mod buffer;
pub mod clip;
pub mod error;

pub use boundary::{Boundary, BoundaryBuilder};
pub use buffer::BufferParams;
pub use clip::{ClippedLayer, FeatureClipper};
pub use error::{ClipError, GeometryError};
