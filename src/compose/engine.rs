//! Map composition
//!
//! Stacks the dataset layers in a fixed order, paints them from the theme
//! and projects everything onto the square canvas.

use geo::{Coord, Geometry, LineString, Polygon};
use tracing::debug;

use super::config::ComposeOptions;
use super::error::ComposeError;
use super::types::{CanvasPoint, CanvasShape, DrawLayer, MapArtifact, Paint, TextLabel};
use super::viewport::{Extent, Viewport};
use crate::layer::{Feature, LayerSet, BOUNDARY, LANDUSE, STREETS, WATER};
use crate::style::StyleTheme;

/// Canvas color, independent of the theme
pub const CANVAS_BACKGROUND: &str = "#ffffff";
pub const LABEL_COLOR: &str = "#000000";
/// Label offset from the bottom-left corner, as a fraction of the side
pub const LABEL_INSET: f64 = 0.03;
pub const MINOR_ROAD_SCALE: f64 = 0.3;
pub const WATERWAY_SCALE: f64 = 0.7;
pub const BOUNDARY_EDGE_WIDTH: f64 = 1.0;

const MAJOR_HIGHWAYS: &[&str] = &["motorway", "trunk"];
const WATERWAYS: &[&str] = &["river", "canal", "stream"];
const GREEN_LANDUSE: &[&str] = &["park", "garden", "grass", "recreation_ground"];

/// Draw layer identifiers, bottom to top
pub mod ids {
    pub const BOUNDARY: &str = "boundary";
    pub const STREETS_MINOR: &str = "streets-minor";
    pub const STREETS_MAJOR: &str = "streets-major";
    pub const WATER_BODIES: &str = "water-bodies";
    pub const WATERWAYS: &str = "waterways";
    pub const LANDUSE: &str = "landuse";
}

/// A geometry part in geographic coordinates
enum Drawable {
    Area(Polygon<f64>),
    Line(LineString<f64>),
}

impl Drawable {
    fn outline(&self) -> &[Coord<f64>] {
        match self {
            Drawable::Area(p) => &p.exterior().0,
            Drawable::Line(l) => &l.0,
        }
    }

    fn project(&self, viewport: &Viewport) -> CanvasShape {
        let ring = |ls: &LineString<f64>| -> Vec<CanvasPoint> {
            ls.0.iter().map(|c| viewport.project(*c)).collect()
        };
        match self {
            Drawable::Area(p) => CanvasShape::Area(
                std::iter::once(p.exterior())
                    .chain(p.interiors())
                    .map(ring)
                    .collect(),
            ),
            Drawable::Line(l) => CanvasShape::Line(ring(l)),
        }
    }
}

struct PendingLayer {
    id: &'static str,
    paint: Paint,
    items: Vec<Drawable>,
}

impl PendingLayer {
    fn new<'a>(id: &'static str, paint: Paint, features: impl IntoIterator<Item = &'a Feature>) -> Self {
        let mut items = Vec::new();
        for feature in features {
            collect_drawables(&feature.geometry, &paint, &mut items);
        }
        Self { id, paint, items }
    }
}

/// Keep the parts of a geometry the paint can draw; points are never drawn
fn collect_drawables(geometry: &Geometry<f64>, paint: &Paint, out: &mut Vec<Drawable>) {
    let areas = paint.draws_areas();
    let lines = paint.draws_lines();
    match geometry {
        Geometry::Polygon(p) if areas => out.push(Drawable::Area(p.clone())),
        Geometry::MultiPolygon(mp) if areas => {
            out.extend(mp.0.iter().cloned().map(Drawable::Area))
        }
        Geometry::Rect(r) if areas => out.push(Drawable::Area(r.to_polygon())),
        Geometry::Triangle(t) if areas => out.push(Drawable::Area(t.to_polygon())),
        Geometry::LineString(ls) if lines && ls.0.len() >= 2 => {
            out.push(Drawable::Line(ls.clone()))
        }
        Geometry::MultiLineString(mls) if lines => out.extend(
            mls.0
                .iter()
                .filter(|ls| ls.0.len() >= 2)
                .cloned()
                .map(Drawable::Line),
        ),
        Geometry::Line(l) if lines => {
            out.push(Drawable::Line(LineString::new(vec![l.start, l.end])))
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_drawables(g, paint, out);
            }
        }
        _ => {}
    }
}

/// Turns a layer set and a theme into a [`MapArtifact`]
#[derive(Debug, Clone, Default)]
pub struct MapComposer {
    options: ComposeOptions,
}

impl MapComposer {
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Compose the map
    ///
    /// Layers missing from `layers` are skipped. An empty layer set gives a
    /// blank canvas carrying only the label.
    pub fn compose(&self, layers: &LayerSet, theme: &StyleTheme) -> Result<MapArtifact, ComposeError> {
        self.validate()?;

        let mut artifact = MapArtifact::blank(self.options.size_cm, CANVAS_BACKGROUND);
        let plan = self.plan(layers, theme);
        let extent = Extent::of(
            plan.iter()
                .flat_map(|layer| layer.items.iter())
                .flat_map(|item| item.outline().iter().copied()),
        );
        let viewport = Viewport::fit(extent, artifact.side);

        artifact.layers = plan
            .into_iter()
            .map(|layer| DrawLayer {
                id: layer.id.to_string(),
                shapes: layer.items.iter().map(|d| d.project(&viewport)).collect(),
                paint: layer.paint,
            })
            .collect();

        artifact.label = self.options.label.as_ref().map(|label| TextLabel {
            lines: label.lines(),
            x: artifact.side * LABEL_INSET,
            y: artifact.side * (1.0 - LABEL_INSET),
            font_size: self.options.font_size,
            color: LABEL_COLOR.to_string(),
        });

        debug!(
            "Composed {} draw layers: {}",
            artifact.layers.len(),
            artifact.layer_ids().join(", ")
        );
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ComposeError> {
        let options = &self.options;
        if !(options.size_cm.is_finite() && options.size_cm > 0.0) {
            return Err(ComposeError::InvalidSize(options.size_cm));
        }
        if !(options.thickness.is_finite() && options.thickness >= 0.0) {
            return Err(ComposeError::InvalidThickness(options.thickness));
        }
        if !(options.font_size.is_finite() && options.font_size > 0.0) {
            return Err(ComposeError::InvalidFontSize(options.font_size));
        }
        Ok(())
    }

    fn plan(&self, layers: &LayerSet, theme: &StyleTheme) -> Vec<PendingLayer> {
        let thickness = self.options.thickness;
        let mut plan = Vec::new();

        if let Some(boundary) = layers.get(BOUNDARY) {
            plan.push(PendingLayer::new(
                ids::BOUNDARY,
                Paint::stroke(&theme.background, BOUNDARY_EDGE_WIDTH),
                boundary.iter(),
            ));
        }

        if let Some(streets) = layers.get(STREETS) {
            let (major, minor): (Vec<&Feature>, Vec<&Feature>) = streets
                .iter()
                .partition(|f| f.tag_in("highway", MAJOR_HIGHWAYS));
            plan.push(PendingLayer::new(
                ids::STREETS_MINOR,
                Paint::stroke(&theme.roads, MINOR_ROAD_SCALE * thickness),
                minor,
            ));
            plan.push(PendingLayer::new(
                ids::STREETS_MAJOR,
                Paint::stroke(&theme.roads, thickness),
                major,
            ));
        }

        if let Some(water) = layers.get(WATER) {
            if water.has_column("natural") {
                plan.push(PendingLayer::new(
                    ids::WATER_BODIES,
                    Paint::fill(&theme.water),
                    water.select("natural", &["water"]),
                ));
            }
            if water.has_column("waterway") {
                plan.push(PendingLayer::new(
                    ids::WATERWAYS,
                    Paint::lines(&theme.water, WATERWAY_SCALE * thickness),
                    water.select("waterway", WATERWAYS),
                ));
            }

            // green space is only drawn alongside water
            if let Some(landuse) = layers.get(LANDUSE).filter(|l| l.has_column("landuse")) {
                plan.push(PendingLayer::new(
                    ids::LANDUSE,
                    Paint::fill(&theme.green),
                    landuse.select("landuse", GREEN_LANDUSE),
                ));
            }
        }

        plan.retain(|layer| !layer.items.is_empty());
        plan
    }
}
