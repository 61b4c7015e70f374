//! Run configuration
//!
//! A TOML file describing one map: which dataset, where the boundary and
//! feature files live, and how to render. Every section and key is optional.
//!
//! ```toml
//! [dataset]
//! id = "Bray"
//! region = "Ireland"
//!
//! [boundary]
//! file = "boundaries/bray.geojson"
//!
//! [render]
//! style = "light_vintage"
//! dpi = 600
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compose::{ComposeOptions, MapLabel};
use crate::export::{ArtifactExporter, ExportFormat, DEFAULT_DPI};
use crate::geometry::BoundaryBuilder;
use crate::provider::{default_queries, FeatureQuery};
use crate::style::{StyleCatalog, ThemeError, DEFAULT_THEME};

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    /// Dataset identifier, also the default place name
    pub id: String,
    pub place: Option<String>,
    pub region: Option<String>,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            id: "map".to_string(),
            place: None,
            region: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundarySection {
    pub file: Option<PathBuf>,
    /// Query region buffer in degrees
    pub buffer_distance: f64,
}

impl Default for BoundarySection {
    fn default() -> Self {
        Self {
            file: None,
            buffer_distance: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesSection {
    /// Directory of `{category}.geojson` files
    pub directory: PathBuf,
    pub queries: Vec<FeatureQuery>,
}

impl Default for FeaturesSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("features"),
            queries: default_queries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub style: String,
    pub theme_file: Option<PathBuf>,
    pub size_cm: f64,
    pub thickness: f64,
    pub font_size: f64,
    pub dpi: u32,
    pub formats: Vec<ExportFormat>,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            style: DEFAULT_THEME.to_string(),
            theme_file: None,
            size_cm: 24.0,
            thickness: 1.0,
            font_size: 14.0,
            dpi: DEFAULT_DPI,
            formats: ExportFormat::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Root of the layer store
    pub data_dir: PathBuf,
    /// Root of the exported maps
    pub output_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("maps"),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub dataset: DatasetSection,
    pub boundary: BoundarySection,
    pub features: FeaturesSection,
    pub render: RenderSection,
    pub paths: PathsSection,
}

impl MapConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize but cannot be used
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.id.is_empty() || self.dataset.id.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                section: "dataset",
                key: "id",
                value: self.dataset.id.clone(),
                reason: "must be a non-empty name without path separators",
            });
        }
        let distance = self.boundary.buffer_distance;
        if !distance.is_finite() || distance < 0.0 {
            return Err(ConfigError::InvalidValue {
                section: "boundary",
                key: "buffer_distance",
                value: distance.to_string(),
                reason: "must be a non-negative number",
            });
        }
        if !(self.render.size_cm.is_finite() && self.render.size_cm > 0.0) {
            return Err(ConfigError::InvalidValue {
                section: "render",
                key: "size_cm",
                value: self.render.size_cm.to_string(),
                reason: "must be positive",
            });
        }
        if self.render.dpi == 0 {
            return Err(ConfigError::InvalidValue {
                section: "render",
                key: "dpi",
                value: "0".to_string(),
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Label lines: the place (defaulting to the dataset id) and region
    pub fn label(&self) -> MapLabel {
        let place = self
            .dataset
            .place
            .clone()
            .unwrap_or_else(|| self.dataset.id.clone());
        let label = MapLabel::new(place);
        match &self.dataset.region {
            Some(region) => label.with_region(region.clone()),
            None => label,
        }
    }

    pub fn boundary_builder(&self) -> BoundaryBuilder {
        BoundaryBuilder::new().with_buffer_distance(self.boundary.buffer_distance)
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions::new()
            .with_size_cm(self.render.size_cm)
            .with_thickness(self.render.thickness)
            .with_font_size(self.render.font_size)
            .with_label(self.label())
    }

    pub fn exporter(&self) -> ArtifactExporter {
        ArtifactExporter::new(&self.paths.output_dir)
            .with_formats(self.render.formats.iter().copied())
            .with_dpi(self.render.dpi)
    }

    /// Built-in themes, plus the configured theme file if any
    pub fn catalog(&self) -> Result<StyleCatalog, ThemeError> {
        match &self.render.theme_file {
            Some(path) => StyleCatalog::with_file(path),
            None => Ok(StyleCatalog::builtin().clone()),
        }
    }
}
