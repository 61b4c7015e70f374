//! place-map - print-ready maps of a place from its boundary polygon
//!
//! This library derives a clean boundary from hand-drawn coordinates, fetches
//! and clips street, water and green-space features to it, persists them per
//! dataset and composes a styled map exported as SVG, PDF and PNG.
//!
//! # Example
//!
//! ```rust
//! use place_map::compose::{ComposeOptions, MapComposer, MapLabel};
//! use place_map::layer::LayerSet;
//! use place_map::{render_svg, StyleCatalog, SvgConfig};
//!
//! let theme = StyleCatalog::builtin().resolve("light_minimal");
//! let composer = MapComposer::new(ComposeOptions::new().with_label(MapLabel::new("Bray")));
//! let artifact = composer.compose(&LayerSet::new(), &theme).unwrap();
//!
//! let svg = render_svg(&artifact, &SvgConfig::default());
//! assert!(svg.contains("Bray"));
//! ```

pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod geojson;
pub mod geometry;
pub mod layer;
pub mod provider;
pub mod renderer;
pub mod store;
pub mod style;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use compose::{ComposeError, ComposeOptions, MapArtifact, MapComposer, MapLabel};
pub use config::{ConfigError, MapConfig};
pub use error::GeoJsonError;
pub use export::{ArtifactExporter, ExportError, ExportFormat};
pub use geometry::{Boundary, BoundaryBuilder, ClipError, FeatureClipper, GeometryError};
pub use layer::{Dataset, Feature, FeatureLayer, LayerSet};
pub use provider::{default_queries, FeatureProvider, FeatureQuery, FetchError, GeoJsonProvider};
pub use renderer::{render_svg, SvgConfig};
pub use store::{LayerStore, StoreError};
pub use style::{StyleCatalog, StyleTheme, ThemeError};

/// Errors that can occur during the map pipeline
#[derive(Debug, Error)]
pub enum MapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("boundary error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("no boundary file configured")]
    MissingBoundary,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("theme error: {0}")]
    Theme(#[from] ThemeError),

    #[error("compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// A recovered condition, reported to the caller alongside the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// The input ring was invalid and was repaired; the shape may differ
    BoundaryRepaired,
    /// A feature category could not be fetched and was omitted
    FetchFailed { category: String, reason: String },
    /// A layer could not be clipped and was kept unclipped
    ClipFallback { layer: String, reason: String },
    /// The requested style is unknown and the default theme was used
    StyleFallback { requested: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundaryRepaired => write!(f, "boundary polygon was repaired"),
            Self::FetchFailed { category, reason } => {
                write!(f, "{category} features omitted: {reason}")
            }
            Self::ClipFallback { layer, reason } => {
                write!(f, "{layer} layer kept unclipped: {reason}")
            }
            Self::StyleFallback { requested } => {
                write!(f, "style '{requested}' not found, using '{}'", style::DEFAULT_THEME)
            }
        }
    }
}

/// Output of the prepare stage
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    pub dataset: Dataset,
    pub warnings: Vec<PipelineWarning>,
}

/// Output of the render stage
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub artifact: MapArtifact,
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<PipelineWarning>,
}

/// Fetch every category within the buffered boundary and clip it
///
/// A failed fetch omits that category and a failed clip keeps the unclipped
/// layer; both are reported as warnings. Categories with no features are
/// left out. The boundary itself is stored as the `boundary` layer.
pub fn prepare_dataset(
    dataset_id: &str,
    boundary: &Boundary,
    provider: &dyn FeatureProvider,
    queries: &[FeatureQuery],
) -> PreparedDataset {
    let mut warnings = Vec::new();
    if boundary.was_repaired() {
        warnings.push(PipelineWarning::BoundaryRepaired);
    }

    let clipper = FeatureClipper::new(boundary.polygon());
    let mut dataset = Dataset::new(dataset_id);

    for query in queries {
        let raw = match provider.fetch(boundary.buffered(), query) {
            Ok(layer) => layer,
            Err(e) => {
                warn!("Failed to fetch {}: {}", query.category, e);
                warnings.push(PipelineWarning::FetchFailed {
                    category: e.category().to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if raw.is_empty() {
            info!("No {} features found", query.category);
            continue;
        }

        let layer = match clipper.clip_layer(&raw) {
            Ok(clipped) => clipped.into_layer(),
            Err(e) => {
                warn!("Clipping {} failed, keeping the unclipped layer: {}", e.layer(), e);
                warnings.push(PipelineWarning::ClipFallback {
                    layer: e.layer().to_string(),
                    reason: e.to_string(),
                });
                raw
            }
        };
        if layer.is_empty() {
            info!("No {} features inside the boundary", query.category);
            continue;
        }
        dataset.insert(layer);
    }

    dataset.insert(FeatureLayer::boundary(boundary.polygon()));
    PreparedDataset { dataset, warnings }
}

/// Configuration for the render stage
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Themes to choose from
    pub catalog: StyleCatalog,
    /// Requested theme name
    pub style: String,
    pub compose: ComposeOptions,
    pub exporter: ArtifactExporter,
}

impl RenderConfig {
    /// Built-in themes, default options, SVG, PDF and PNG written under `output_root`
    pub fn new(output_root: impl AsRef<Path>) -> Self {
        Self {
            catalog: StyleCatalog::builtin().clone(),
            style: style::DEFAULT_THEME.to_string(),
            compose: ComposeOptions::default(),
            exporter: ArtifactExporter::new(output_root),
        }
    }

    /// Render settings of a run configuration
    pub fn from_map_config(config: &MapConfig) -> Result<Self, ThemeError> {
        Ok(Self {
            catalog: config.catalog()?,
            style: config.render.style.clone(),
            compose: config.compose_options(),
            exporter: config.exporter(),
        })
    }

    /// Set the theme name
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Set the theme catalog
    pub fn with_catalog(mut self, catalog: StyleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the composition options
    pub fn with_compose(mut self, options: ComposeOptions) -> Self {
        self.compose = options;
        self
    }

    /// Set the exporter
    pub fn with_exporter(mut self, exporter: ArtifactExporter) -> Self {
        self.exporter = exporter;
        self
    }
}

/// Compose and export in-memory layers
pub fn render_layers(
    layers: &LayerSet,
    dataset_id: &str,
    config: &RenderConfig,
) -> Result<RenderOutput, MapError> {
    let mut warnings = Vec::new();
    if config.catalog.lookup(&config.style).is_none() {
        warnings.push(PipelineWarning::StyleFallback {
            requested: config.style.clone(),
        });
    }
    let theme = config.catalog.resolve(&config.style);

    let artifact = MapComposer::new(config.compose.clone()).compose(layers, &theme)?;
    let paths = config.exporter.export(&artifact, dataset_id)?;
    Ok(RenderOutput {
        artifact,
        paths,
        warnings,
    })
}

/// Load a saved dataset, compose it and export it
pub fn render_dataset(
    store: &LayerStore,
    dataset_id: &str,
    config: &RenderConfig,
) -> Result<RenderOutput, MapError> {
    let layers = store.load(dataset_id)?;
    render_layers(&layers, dataset_id, config)
}

/// Build the boundary, fetch and clip features, and save the dataset
pub fn prepare_from_config(config: &MapConfig) -> Result<PreparedDataset, MapError> {
    let file = config
        .boundary
        .file
        .as_deref()
        .ok_or(MapError::MissingBoundary)?;
    let boundary = config.boundary_builder().build_from_file(file)?;

    let provider = GeoJsonProvider::new(&config.features.directory);
    let prepared = prepare_dataset(
        &config.dataset.id,
        &boundary,
        &provider,
        &config.features.queries,
    );

    LayerStore::new(&config.paths.data_dir).save(&config.dataset.id, &prepared.dataset.layers)?;
    Ok(prepared)
}

/// Render a dataset saved by [`prepare_from_config`]
pub fn render_from_config(config: &MapConfig) -> Result<RenderOutput, MapError> {
    let render = RenderConfig::from_map_config(config)?;
    let store = LayerStore::new(&config.paths.data_dir);
    render_dataset(&store, &config.dataset.id, &render)
}

/// Prepare then render, collecting the warnings of both stages
pub fn run(config: &MapConfig) -> Result<RenderOutput, MapError> {
    let prepared = prepare_from_config(config)?;
    let mut output = render_from_config(config)?;

    let mut warnings = prepared.warnings;
    warnings.append(&mut output.warnings);
    output.warnings = warnings;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{BOUNDARY, STREETS, WATER};
    use geo::{coord, line_string, Polygon};

    /// Serves fixed layers by category and fails for the rest
    struct FixedProvider {
        layers: Vec<FeatureLayer>,
    }

    impl FeatureProvider for FixedProvider {
        fn fetch(&self, _region: &Polygon<f64>, query: &FeatureQuery) -> Result<FeatureLayer, FetchError> {
            self.layers
                .iter()
                .find(|l| l.name() == query.category)
                .cloned()
                .ok_or_else(|| FetchError::Unavailable {
                    category: query.category.clone(),
                    reason: "service timed out".to_string(),
                })
        }
    }

    fn unit_boundary() -> Boundary {
        let ring = [
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 0.0, y: 1.0 },
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 1.0, y: 0.0 },
        ];
        BoundaryBuilder::new().build(&ring).unwrap()
    }

    fn streets() -> FeatureLayer {
        FeatureLayer::from_features(
            STREETS,
            vec![Feature::new(line_string![(x: -1.0, y: 0.5), (x: 2.0, y: 0.5)])
                .with_property("highway", "residential")],
        )
    }

    #[test]
    fn test_prepare_clips_and_adds_boundary() {
        let provider = FixedProvider {
            layers: vec![streets(), FeatureLayer::new(WATER)],
        };
        let queries = [FeatureQuery::new(STREETS), FeatureQuery::new(WATER)];
        let prepared = prepare_dataset("Test", &unit_boundary(), &provider, &queries);

        assert!(prepared.warnings.is_empty());
        let names: Vec<&str> = prepared.dataset.layer_names().collect();
        assert_eq!(names, vec![BOUNDARY, STREETS]);

        let street = &prepared.dataset.layer(STREETS).unwrap().features()[0];
        let xs: Vec<f64> = match &street.geometry {
            geo::Geometry::LineString(ls) => ls.0.iter().map(|c| c.x).collect(),
            other => panic!("expected a line, got {:?}", other),
        };
        assert!(xs.iter().all(|x| (-1e-9..=1.0 + 1e-9).contains(x)));
    }

    #[test]
    fn test_fetch_failure_is_isolated() {
        let provider = FixedProvider {
            layers: vec![streets()],
        };
        let queries = [FeatureQuery::new(WATER), FeatureQuery::new(STREETS)];
        let prepared = prepare_dataset("Test", &unit_boundary(), &provider, &queries);

        assert_eq!(prepared.warnings.len(), 1);
        assert!(matches!(
            &prepared.warnings[0],
            PipelineWarning::FetchFailed { category, .. } if category == WATER
        ));
        assert!(prepared.dataset.layer(STREETS).is_some());
        assert!(prepared.dataset.layer(WATER).is_none());
    }

    #[test]
    fn test_clip_failure_keeps_unclipped_layer() {
        let broken = FeatureLayer::from_features(
            STREETS,
            vec![
                Feature::new(line_string![(x: -1.0, y: 0.5), (x: 2.0, y: 0.5)]),
                Feature::new(line_string![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.5)]),
            ],
        );
        let provider = FixedProvider {
            layers: vec![broken.clone()],
        };
        let prepared = prepare_dataset(
            "Test",
            &unit_boundary(),
            &provider,
            &[FeatureQuery::new(STREETS)],
        );

        assert!(matches!(
            &prepared.warnings[0],
            PipelineWarning::ClipFallback { layer, .. } if layer == STREETS
        ));
        assert_eq!(prepared.dataset.layer(STREETS).unwrap().len(), broken.len());
    }

    #[test]
    fn test_repaired_boundary_warns() {
        let bowtie = [
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 2.0, y: 2.0 },
            coord! { x: 2.0, y: 0.0 },
            coord! { x: 0.0, y: 2.0 },
        ];
        let boundary = BoundaryBuilder::new().build(&bowtie).unwrap();
        let provider = FixedProvider { layers: vec![] };
        let prepared = prepare_dataset("Test", &boundary, &provider, &[]);
        assert_eq!(prepared.warnings, vec![PipelineWarning::BoundaryRepaired]);
    }

    #[test]
    fn test_render_layers_unknown_style() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::new(dir.path())
            .with_style("no_such_style")
            .with_exporter(ArtifactExporter::new(dir.path()).with_formats([ExportFormat::Svg]));

        let output = render_layers(&LayerSet::new(), "Test", &config).unwrap();
        assert_eq!(
            output.warnings,
            vec![PipelineWarning::StyleFallback {
                requested: "no_such_style".to_string()
            }]
        );
        assert_eq!(output.paths, vec![dir.path().join("Test").join("Test_map.svg")]);
    }

    #[test]
    fn test_render_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = LayerStore::new(dir.path().join("data"));
        let config = RenderConfig::new(dir.path().join("maps"));
        assert!(matches!(
            render_dataset(&store, "Nowhere", &config),
            Err(MapError::Store(StoreError::DatasetNotFound(_)))
        ));
    }

    #[test]
    fn test_missing_boundary_file_configured() {
        let config = MapConfig::default();
        assert!(matches!(
            prepare_from_config(&config),
            Err(MapError::MissingBoundary)
        ));
    }

    #[test]
    fn test_warning_display() {
        let warning = PipelineWarning::ClipFallback {
            layer: "water".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(warning.to_string(), "water layer kept unclipped: bad");
    }
}
