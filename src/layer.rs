//! Feature layers and datasets
//!
//! A [`FeatureLayer`] is a named collection of geometries with attribute
//! columns. Layers carry an explicit column schema so that rendering rules
//! can be keyed on "this layer has a `waterway` column" rather than on ad hoc
//! inspection of individual features.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use geo::{Geometry, Polygon};

/// Name of the layer holding the boundary polygon itself
pub const BOUNDARY: &str = "boundary";
/// Street network layer
pub const STREETS: &str = "streets";
/// Water bodies and waterways
pub const WATER: &str = "water";
/// Land use areas (parks, gardens, ...)
pub const LANDUSE: &str = "landuse";

/// Coordinate reference system of a layer
///
/// Only geographic WGS84 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    #[default]
    Wgs84,
}

impl Crs {
    /// Authority code as written to disk
    pub fn code(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "EPSG:4326",
        }
    }

    /// Parse an authority code, accepting the common spellings of WGS84
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "EPSG:4326" | "epsg:4326" | "urn:ogc:def:crs:EPSG::4326"
            | "urn:ogc:def:crs:OGC:1.3:CRS84" | "OGC:CRS84" => Some(Crs::Wgs84),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Attribute value types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// String content, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Create a feature without attributes
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// String attribute lookup; `None` for missing, null or non-string values
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.get_property(key).and_then(AttributeValue::as_str)
    }

    /// True when the string attribute `key` equals one of `values`
    pub fn tag_in(&self, key: &str, values: &[&str]) -> bool {
        self.tag(key).is_some_and(|v| values.contains(&v))
    }
}

/// A named collection of features sharing a CRS and a column schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    name: String,
    crs: Crs,
    columns: BTreeSet<String>,
    features: Vec<Feature>,
}

impl FeatureLayer {
    /// Create an empty WGS84 layer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: Crs::Wgs84,
            columns: BTreeSet::new(),
            features: Vec::new(),
        }
    }

    /// Create a layer from features, deriving the schema from their attributes
    pub fn from_features(name: impl Into<String>, features: Vec<Feature>) -> Self {
        let mut layer = Self::new(name);
        for feature in features {
            layer.push(feature);
        }
        layer
    }

    /// The special `boundary` layer holding a single polygon
    pub fn boundary(polygon: &Polygon<f64>) -> Self {
        Self::from_features(BOUNDARY, vec![Feature::new(polygon.clone())])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Declared attribute columns
    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    /// Whether the layer declares the given attribute column
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Declare an attribute column even if no feature carries it yet
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.insert(column.into());
        self
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Append a feature, extending the schema with its attribute keys
    pub fn push(&mut self, feature: Feature) {
        self.columns.extend(feature.properties.keys().cloned());
        self.features.push(feature);
    }

    /// A layer with the same name, CRS and schema but different features
    pub fn with_features(&self, features: Vec<Feature>) -> Self {
        let mut layer = Self {
            name: self.name.clone(),
            crs: self.crs,
            columns: self.columns.clone(),
            features: Vec::with_capacity(features.len()),
        };
        for feature in features {
            layer.push(feature);
        }
        layer
    }

    /// Features whose string attribute `column` is one of `values`
    pub fn select<'a>(
        &'a self,
        column: &'a str,
        values: &'a [&'a str],
    ) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features.iter().filter(move |f| f.tag_in(column, values))
    }
}

impl IntoIterator for FeatureLayer {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Layers keyed by layer name
pub type LayerSet = BTreeMap<String, FeatureLayer>;

/// A named bundle of layers produced by the download and clip stage
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub layers: LayerSet,
}

impl Dataset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layers: LayerSet::new(),
        }
    }

    /// Insert a layer under its own name, replacing any previous one
    pub fn insert(&mut self, layer: FeatureLayer) {
        self.layers.insert(layer.name().to_string(), layer);
    }

    pub fn layer(&self, name: &str) -> Option<&FeatureLayer> {
        self.layers.get(name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}
