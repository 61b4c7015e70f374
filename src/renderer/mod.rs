//! SVG renderer for composed maps
//!
//! This module takes a MapArtifact and produces an SVG string whose user
//! units are points, sized physically in centimetres.

pub mod config;
pub mod svg;

pub use config::SvgConfig;
pub use svg::render_svg;
