//! Layer persistence
//!
//! A dataset is stored as a directory `{root}/{id}_data/` with one GeoJSON
//! FeatureCollection per layer. The prepare stage writes it and the render
//! stage reads it back, possibly in another process.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::GeoJsonError;
use crate::geojson::{layer_from_str, layer_to_value};
use crate::layer::{FeatureLayer, LayerSet};

const LAYER_EXTENSION: &str = "geojson";

/// Errors raised by the layer store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("layer '{layer}' not found in dataset '{dataset}'")]
    LayerNotFound { dataset: String, layer: String },

    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode layer '{layer}': {source}")]
    Encode {
        layer: String,
        source: serde_json::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Format { path: PathBuf, source: GeoJsonError },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory-backed store of datasets
#[derive(Debug, Clone)]
pub struct LayerStore {
    root: PathBuf,
}

impl LayerStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the layers of a dataset
    pub fn container_path(&self, dataset_id: &str) -> Result<PathBuf, StoreError> {
        validate_name("dataset", dataset_id)?;
        Ok(self.root.join(format!("{dataset_id}_data")))
    }

    pub fn exists(&self, dataset_id: &str) -> bool {
        self.container_path(dataset_id)
            .map(|p| p.is_dir())
            .unwrap_or(false)
    }

    /// Write every non-empty layer, replacing the previous contents
    ///
    /// Returns the names of the layers written.
    pub fn save(&self, dataset_id: &str, layers: &LayerSet) -> Result<Vec<String>, StoreError> {
        let container = self.container_path(dataset_id)?;
        for name in layers.keys() {
            validate_name("layer", name)?;
        }

        fs::create_dir_all(&container).map_err(|e| StoreError::io(&container, e))?;
        for stale in self.layer_files(&container)? {
            fs::remove_file(&stale).map_err(|e| StoreError::io(&stale, e))?;
        }

        let mut written = Vec::new();
        for (name, layer) in layers {
            if layer.is_empty() {
                debug!("Skipping empty layer {}", name);
                continue;
            }
            let mut value = layer_to_value(layer);
            value["name"] = Value::String(name.clone());
            let text = serde_json::to_string_pretty(&value).map_err(|source| StoreError::Encode {
                layer: name.clone(),
                source,
            })?;

            let path = layer_path(&container, name);
            fs::write(&path, text).map_err(|e| StoreError::io(&path, e))?;
            written.push(name.clone());
        }

        info!("Saved {} layers to {}", written.len(), container.display());
        Ok(written)
    }

    /// Read back every layer of a dataset
    pub fn load(&self, dataset_id: &str) -> Result<LayerSet, StoreError> {
        let container = self.existing_container(dataset_id)?;
        let mut layers = LayerSet::new();
        for path in self.layer_files(&container)? {
            let layer = read_layer(&path)?;
            layers.insert(layer.name().to_string(), layer);
        }
        info!("Loaded {} layers from {}", layers.len(), container.display());
        Ok(layers)
    }

    /// Read a single layer without touching the others
    pub fn load_layer(&self, dataset_id: &str, layer: &str) -> Result<FeatureLayer, StoreError> {
        validate_name("layer", layer)?;
        let container = self.existing_container(dataset_id)?;
        let path = layer_path(&container, layer);
        if !path.is_file() {
            return Err(StoreError::LayerNotFound {
                dataset: dataset_id.to_string(),
                layer: layer.to_string(),
            });
        }
        read_layer(&path)
    }

    /// Names of the layers stored for a dataset, sorted
    pub fn layer_names(&self, dataset_id: &str) -> Result<Vec<String>, StoreError> {
        let container = self.existing_container(dataset_id)?;
        Ok(self
            .layer_files(&container)?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    fn existing_container(&self, dataset_id: &str) -> Result<PathBuf, StoreError> {
        let container = self.container_path(dataset_id)?;
        if !container.is_dir() {
            return Err(StoreError::DatasetNotFound(dataset_id.to_string()));
        }
        Ok(container)
    }

    fn layer_files(&self, container: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(container).map_err(|e| StoreError::io(container, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(container, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == LAYER_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn layer_path(container: &Path, layer: &str) -> PathBuf {
    container.join(format!("{layer}.{LAYER_EXTENSION}"))
}

fn read_layer(path: &Path) -> Result<FeatureLayer, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    layer_from_str(stem, &text).map_err(|source| StoreError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
