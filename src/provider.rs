//! Feature provider
//!
//! The provider is the external service that returns raw map features inside
//! a query polygon. Each feature category (streets, water, ...) is fetched by
//! its own [`FeatureQuery`] so a failure affects only that category.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geo::{Intersects, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::GeoJsonError;
use crate::geojson::layer_from_str;
use crate::layer::{AttributeValue, Feature, FeatureLayer, LANDUSE, STREETS, WATER};

/// Errors raised while fetching one feature category
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {category} features from {path}: {source}")]
    Io {
        category: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed {category} features: {source}")]
    Malformed {
        category: String,
        source: GeoJsonError,
    },

    #[error("{category} features unavailable: {reason}")]
    Unavailable { category: String, reason: String },
}

impl FetchError {
    /// The category whose fetch failed
    pub fn category(&self) -> &str {
        match self {
            Self::Io { category, .. }
            | Self::Malformed { category, .. }
            | Self::Unavailable { category, .. } => category,
        }
    }
}

/// Matching criterion for one tag key
///
/// `true` matches any value, a list matches the listed values only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagFilter {
    Any(bool),
    Values(Vec<String>),
}

impl TagFilter {
    pub fn matches(&self, value: Option<&AttributeValue>) -> bool {
        match (self, value) {
            (_, None) | (_, Some(AttributeValue::Null)) => false,
            (TagFilter::Any(flag), Some(_)) => *flag,
            (TagFilter::Values(values), Some(v)) => v
                .as_str()
                .is_some_and(|s| values.iter().any(|allowed| allowed == s)),
        }
    }
}

/// Criteria selecting the features of one category
///
/// A feature matches when any of the tag filters matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureQuery {
    pub category: String,
    pub tags: BTreeMap<String, TagFilter>,
}

impl FeatureQuery {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Match features carrying `key` with any value
    pub fn with_any(mut self, key: impl Into<String>) -> Self {
        self.tags.insert(key.into(), TagFilter::Any(true));
        self
    }

    /// Match features whose `key` is one of `values`
    pub fn with_values(mut self, key: impl Into<String>, values: &[&str]) -> Self {
        self.tags.insert(
            key.into(),
            TagFilter::Values(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        self.tags
            .iter()
            .any(|(key, filter)| filter.matches(feature.get_property(key)))
    }
}

/// Drivable road classes; footways, paths, cycleways and tracks are left out
pub const DRIVABLE_HIGHWAYS: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "road",
    "service",
];

/// Queries for the categories the map renders
pub fn default_queries() -> Vec<FeatureQuery> {
    vec![
        FeatureQuery::new(STREETS).with_values("highway", DRIVABLE_HIGHWAYS),
        FeatureQuery::new(WATER)
            .with_values("natural", &["water", "wetland", "bay", "spring"])
            .with_any("waterway")
            .with_any("water"),
        FeatureQuery::new(LANDUSE)
            .with_values("landuse", &["park", "garden", "grass", "recreation_ground"]),
    ]
}

/// Source of raw features
///
/// Implementations block until the category is fetched. No retries are made
/// by callers.
pub trait FeatureProvider {
    /// Fetch the features of one category intersecting `region`
    fn fetch(&self, region: &Polygon<f64>, query: &FeatureQuery) -> Result<FeatureLayer, FetchError>;
}

/// Provider backed by a directory of `{category}.geojson` files
///
/// A missing file means the category has no features.
#[derive(Debug, Clone)]
pub struct GeoJsonProvider {
    dir: PathBuf,
}

impl GeoJsonProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{category}.geojson"))
    }
}

impl FeatureProvider for GeoJsonProvider {
    fn fetch(&self, region: &Polygon<f64>, query: &FeatureQuery) -> Result<FeatureLayer, FetchError> {
        let path = self.path_for(&query.category);
        if !path.exists() {
            debug!("No feature file for {} at {}", query.category, path.display());
            return Ok(FeatureLayer::new(query.category.clone()));
        }

        let text = fs::read_to_string(&path).map_err(|source| FetchError::Io {
            category: query.category.clone(),
            path: path.clone(),
            source,
        })?;
        let raw = layer_from_str(&query.category, &text).map_err(|source| {
            FetchError::Malformed {
                category: query.category.clone(),
                source,
            }
        })?;

        let features = raw
            .iter()
            .filter(|f| query.matches(f) && f.geometry.intersects(region))
            .cloned()
            .collect();
        Ok(FeatureLayer::from_features(query.category.clone(), features))
    }
}
