//! Configuration for map composition

/// Place and region printed in the corner of the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLabel {
    pub place: String,
    pub region: Option<String>,
}

impl MapLabel {
    pub fn new(place: impl Into<String>) -> Self {
        Self {
            place: place.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Label lines from top to bottom
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.place.clone())
            .chain(self.region.clone())
            .collect()
    }
}

/// Configuration options for composing a map
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    /// Side of the square canvas in centimetres
    pub size_cm: f64,

    /// Line thickness scale; major roads are drawn at this width in points
    pub thickness: f64,

    /// Label font size in points
    pub font_size: f64,

    pub label: Option<MapLabel>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            size_cm: 24.0,
            thickness: 1.0,
            font_size: 14.0,
            label: None,
        }
    }
}

impl ComposeOptions {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canvas side in centimetres
    pub fn with_size_cm(mut self, size_cm: f64) -> Self {
        self.size_cm = size_cm;
        self
    }

    /// Set the line thickness scale
    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    /// Set the label font size
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Set the corner label
    pub fn with_label(mut self, label: MapLabel) -> Self {
        self.label = Some(label);
        self
    }
}
