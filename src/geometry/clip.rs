//! Clipping feature layers to the boundary polygon
//!
//! Lines are cut at the boundary, areas are intersected with it and points
//! are kept when they lie inside or on it. Features already inside the
//! boundary are passed through untouched, so clipping a clipped layer again
//! changes nothing.
//!
//! Boolean operations round coordinates to an internal grid. Output vertices
//! are snapped back to the nearest input or boundary vertex within a small
//! tolerance, and a feature whose clipped form lies within that tolerance of
//! the original is kept as it was.

use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, CoordsIter, Geometry, GeometryCollection,
    HausdorffDistance, Intersects, LineString, MapCoords, MultiLineString, MultiPoint,
    MultiPolygon, Polygon, Rect, RemoveRepeatedPoints,
};
use tracing::info;

use super::error::ClipError;
use crate::layer::{Feature, FeatureLayer};

/// Result of clipping one layer
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedLayer {
    pub layer: FeatureLayer,
    /// Feature count before clipping
    pub before: usize,
    /// Feature count after clipping
    pub after: usize,
}

impl ClippedLayer {
    /// Number of features dropped entirely
    pub fn removed(&self) -> usize {
        self.before - self.after
    }

    pub fn into_layer(self) -> FeatureLayer {
        self.layer
    }
}

/// Snapping tolerance relative to the larger side of the working extent
const SNAP_TOLERANCE: f64 = 1e-7;

/// Vertices sorted by x for nearest-vertex lookups
#[derive(Debug, Clone)]
struct VertexIndex {
    coords: Vec<Coord<f64>>,
}

impl VertexIndex {
    fn new(coords: impl IntoIterator<Item = Coord<f64>>) -> Self {
        let mut coords: Vec<_> = coords.into_iter().collect();
        coords.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { coords }
    }

    /// The closest vertex within `tolerance` of `c`, with its distance
    fn nearest(&self, c: Coord<f64>, tolerance: f64) -> Option<(Coord<f64>, f64)> {
        let start = self.coords.partition_point(|v| v.x < c.x - tolerance);
        self.coords[start..]
            .iter()
            .take_while(|v| v.x <= c.x + tolerance)
            .map(|v| (*v, (v.x - c.x).hypot(v.y - c.y)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Clips layers to a fixed boundary polygon
#[derive(Debug, Clone)]
pub struct FeatureClipper<'a> {
    boundary: &'a Polygon<f64>,
    extent: Option<Rect<f64>>,
    vertices: VertexIndex,
}

impl<'a> FeatureClipper<'a> {
    pub fn new(boundary: &'a Polygon<f64>) -> Self {
        Self {
            boundary,
            extent: boundary.bounding_rect(),
            vertices: VertexIndex::new(boundary.coords_iter()),
        }
    }

    /// Restrict a layer to the features intersecting the boundary
    ///
    /// An empty layer is returned as is. A layer containing a feature that
    /// cannot be clipped (non-finite or degenerate coordinates) fails as a
    /// whole; deciding what to do with the unclipped layer is left to the
    /// caller.
    pub fn clip_layer(&self, layer: &FeatureLayer) -> Result<ClippedLayer, ClipError> {
        if layer.is_empty() {
            info!("No {} features to clip", layer.name());
            return Ok(ClippedLayer {
                layer: layer.clone(),
                before: 0,
                after: 0,
            });
        }

        let before = layer.len();
        info!("Original {} features: {}", layer.name(), before);

        let mut kept = Vec::with_capacity(before);
        for (index, feature) in layer.iter().enumerate() {
            let geometry = &feature.geometry;
            if !geometry
                .coords_iter()
                .all(|c| c.x.is_finite() && c.y.is_finite())
            {
                return Err(ClipError::NonFiniteCoordinate {
                    layer: layer.name().to_string(),
                    feature: index,
                });
            }
            if let Some(reason) = degenerate_reason(geometry) {
                return Err(ClipError::Degenerate {
                    layer: layer.name().to_string(),
                    feature: index,
                    reason: reason.to_string(),
                });
            }
            if let Some(clipped) = self.clip_geometry(geometry) {
                kept.push(Feature {
                    geometry: clipped,
                    properties: feature.properties.clone(),
                });
            }
        }

        let after = kept.len();
        info!(
            "Clipped {} features: {} (removed {})",
            layer.name(),
            after,
            before - after
        );

        Ok(ClippedLayer {
            layer: layer.with_features(kept),
            before,
            after,
        })
    }

    /// The part of `geometry` inside the boundary, or `None` if nothing is left
    pub fn clip_geometry(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
        if let (Some(extent), Some(bbox)) = (self.extent, geometry.bounding_rect()) {
            if !extent.intersects(&bbox) {
                return None;
            }
        }
        if self.contains(geometry) {
            return Some(geometry.clone());
        }

        match geometry {
            Geometry::Point(p) => self.boundary.intersects(p).then(|| geometry.clone()),
            Geometry::MultiPoint(mp) => {
                let points: Vec<_> = mp
                    .iter()
                    .filter(|p| self.boundary.intersects(*p))
                    .copied()
                    .collect();
                (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(points)))
            }
            Geometry::GeometryCollection(gc) => {
                let parts: Vec<_> = gc.iter().filter_map(|g| self.clip_geometry(g)).collect();
                (!parts.is_empty())
                    .then(|| Geometry::GeometryCollection(GeometryCollection(parts)))
            }
            _ => self.clip_shape(geometry),
        }
    }

    /// Clip a line or area feature with snapping
    fn clip_shape(&self, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
        let tolerance = self.tolerance(geometry);
        let own = VertexIndex::new(geometry.coords_iter());
        let snap = |c: Coord<f64>| {
            let ours = own.nearest(c, tolerance);
            let theirs = self.vertices.nearest(c, tolerance);
            match (ours, theirs) {
                (Some((v, d)), Some((w, e))) => if e < d { w } else { v },
                (Some((v, _)), None) | (None, Some((v, _))) => v,
                (None, None) => c,
            }
        };

        let clipped = match geometry {
            Geometry::Line(l) => self.clip_lines(
                MultiLineString::new(vec![LineString::new(vec![l.start, l.end])]),
                true,
                snap,
            ),
            Geometry::LineString(ls) => {
                self.clip_lines(MultiLineString::new(vec![ls.clone()]), true, snap)
            }
            Geometry::MultiLineString(mls) => self.clip_lines(mls.clone(), false, snap),
            Geometry::Polygon(p) => {
                self.clip_areas(MultiPolygon::new(vec![p.clone()]), true, snap)
            }
            Geometry::MultiPolygon(mp) => self.clip_areas(mp.clone(), false, snap),
            Geometry::Rect(r) => {
                self.clip_areas(MultiPolygon::new(vec![r.to_polygon()]), true, snap)
            }
            Geometry::Triangle(t) => {
                self.clip_areas(MultiPolygon::new(vec![t.to_polygon()]), true, snap)
            }
            _ => return None,
        }?;

        if clipped.hausdorff_distance(geometry) <= tolerance {
            Some(geometry.clone())
        } else {
            Some(clipped)
        }
    }

    fn tolerance(&self, geometry: &Geometry<f64>) -> f64 {
        let side = |r: Rect<f64>| r.width().max(r.height());
        let extent = self.extent.map_or(0.0, side);
        let own = geometry.bounding_rect().map_or(0.0, side);
        SNAP_TOLERANCE * extent.max(own)
    }

    fn contains(&self, geometry: &Geometry<f64>) -> bool {
        let b = self.boundary;
        match geometry {
            Geometry::Point(g) => b.contains(g),
            Geometry::MultiPoint(g) => b.contains(g),
            Geometry::Line(g) => b.contains(&LineString::new(vec![g.start, g.end])),
            Geometry::LineString(g) => b.contains(g),
            Geometry::MultiLineString(g) => b.contains(g),
            Geometry::Polygon(g) => b.contains(g),
            Geometry::MultiPolygon(g) => b.contains(g),
            Geometry::Rect(g) => b.contains(&g.to_polygon()),
            Geometry::Triangle(g) => b.contains(&g.to_polygon()),
            Geometry::GeometryCollection(_) => false,
        }
    }

    fn clip_lines(
        &self,
        lines: MultiLineString<f64>,
        single: bool,
        snap: impl Fn(Coord<f64>) -> Coord<f64> + Copy,
    ) -> Option<Geometry<f64>> {
        let mut parts: Vec<LineString<f64>> = self
            .boundary
            .clip(&lines, false)
            .0
            .into_iter()
            .map(|ls| ls.map_coords(snap).remove_repeated_points())
            .filter(|ls| ls.lines().any(|l| l.start != l.end))
            .collect();
        match parts.len() {
            0 => None,
            1 if single => Some(Geometry::LineString(parts.remove(0))),
            _ => Some(Geometry::MultiLineString(MultiLineString::new(parts))),
        }
    }

    fn clip_areas(
        &self,
        areas: MultiPolygon<f64>,
        single: bool,
        snap: impl Fn(Coord<f64>) -> Coord<f64> + Copy,
    ) -> Option<Geometry<f64>> {
        let mut parts: Vec<Polygon<f64>> = self
            .boundary
            .intersection(&areas)
            .0
            .into_iter()
            .map(|p| p.map_coords(snap).remove_repeated_points())
            .filter(|p| p.exterior().0.len() >= 4 && p.unsigned_area() > 0.0)
            .collect();
        match parts.len() {
            0 => None,
            1 if single => Some(Geometry::Polygon(parts.remove(0))),
            _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
        }
    }
}

fn degenerate_reason(geometry: &Geometry<f64>) -> Option<&'static str> {
    let short_line = |ls: &LineString<f64>| ls.0.len() < 2;
    let short_ring = |p: &Polygon<f64>| p.exterior().0.len() < 4;
    match geometry {
        Geometry::LineString(ls) if short_line(ls) => Some("line with fewer than 2 points"),
        Geometry::MultiLineString(mls) if mls.0.iter().any(short_line) => {
            Some("line with fewer than 2 points")
        }
        Geometry::Polygon(p) if short_ring(p) => Some("ring with fewer than 3 points"),
        Geometry::MultiPolygon(mp) if mp.0.iter().any(short_ring) => {
            Some("ring with fewer than 3 points")
        }
        Geometry::GeometryCollection(gc) => gc.iter().find_map(degenerate_reason),
        _ => None,
    }
}
