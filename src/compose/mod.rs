//! Map composition
//!
//! This module takes a dataset's layers and a color theme and produces a
//! MapArtifact: styled draw layers in canvas coordinates plus the label.

pub mod config;
pub mod engine;
pub mod error;
pub mod types;
pub mod viewport;

pub use config::{ComposeOptions, MapLabel};
pub use engine::{ids, MapComposer, CANVAS_BACKGROUND};
pub use error::ComposeError;
pub use types::*;
pub use viewport::{Extent, Viewport};
