//! Core types of a composed map

/// Points per centimetre (1 pt = 1/72 inch)
pub const POINTS_PER_CM: f64 = 72.0 / 2.54;

/// A point on the canvas, in points, y growing downwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Stroke color and width in points
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
}

/// How the shapes of a layer are painted
///
/// `fill` applies to areas only. `stroke` draws lines, and the edges of
/// areas when `edges` is set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paint {
    pub fill: Option<String>,
    pub stroke: Option<StrokeStyle>,
    pub edges: bool,
}

impl Paint {
    /// Filled areas without an edge
    pub fn fill(color: impl Into<String>) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
            edges: false,
        }
    }

    /// Stroked lines, areas filled and edged in the same color
    pub fn stroke(color: impl Into<String>, width: f64) -> Self {
        Self {
            edges: true,
            ..Self::lines(color, width)
        }
    }

    /// Stroked lines, areas filled in the same color without an edge
    pub fn lines(color: impl Into<String>, width: f64) -> Self {
        let color = color.into();
        Self {
            fill: Some(color.clone()),
            stroke: Some(StrokeStyle { color, width }),
            edges: false,
        }
    }

    /// Stroke applied to area outlines, if any
    pub fn area_stroke(&self) -> Option<&StrokeStyle> {
        self.stroke.as_ref().filter(|_| self.edges)
    }

    pub fn draws_areas(&self) -> bool {
        self.fill.is_some()
    }

    pub fn draws_lines(&self) -> bool {
        self.stroke.is_some()
    }
}

/// A projected shape
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasShape {
    /// Exterior ring followed by hole rings
    Area(Vec<Vec<CanvasPoint>>),
    Line(Vec<CanvasPoint>),
}

/// One styled layer of the map, drawn in order
#[derive(Debug, Clone, PartialEq)]
pub struct DrawLayer {
    pub id: String,
    pub paint: Paint,
    pub shapes: Vec<CanvasShape>,
}

/// Multi-line text anchored at its bottom-left corner
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub lines: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub color: String,
}

/// A composed map on a square canvas
#[derive(Debug, Clone, PartialEq)]
pub struct MapArtifact {
    /// Physical side length in centimetres
    pub size_cm: f64,
    /// Canvas side length in points
    pub side: f64,
    pub background: String,
    pub layers: Vec<DrawLayer>,
    pub label: Option<TextLabel>,
}

impl MapArtifact {
    /// An artifact with nothing drawn on it
    pub fn blank(size_cm: f64, background: impl Into<String>) -> Self {
        Self {
            size_cm,
            side: size_cm * POINTS_PER_CM,
            background: background.into(),
            layers: Vec::new(),
            label: None,
        }
    }

    pub fn size_inches(&self) -> f64 {
        self.size_cm / 2.54
    }

    pub fn layer(&self, id: &str) -> Option<&DrawLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_artifact_size() {
        let artifact = MapArtifact::blank(2.54, "#ffffff");
        assert!((artifact.side - 72.0).abs() < 1e-9);
        assert!((artifact.size_inches() - 1.0).abs() < 1e-12);
        assert!(artifact.layers.is_empty());
    }

    #[test]
    fn test_paint_kinds() {
        let fill = Paint::fill("#a6cbe8");
        assert!(fill.draws_areas());
        assert!(!fill.draws_lines());

        let stroke = Paint::stroke("#000000", 0.3);
        assert!(stroke.draws_lines());
        assert_eq!(stroke.area_stroke().unwrap().width, 0.3);
        assert_eq!(stroke.stroke.unwrap().width, 0.3);

        let lines = Paint::lines("#a6cbe8", 0.7);
        assert!(lines.draws_areas());
        assert!(lines.draws_lines());
        assert!(lines.area_stroke().is_none());
    }
}
