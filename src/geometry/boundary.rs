//! Boundary construction
//!
//! Turns a hand-drawn coordinate ring into a valid boundary polygon and the
//! slightly larger query polygon used when fetching features.

use std::fs;
use std::path::Path;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Line, LineString, Polygon};
use tracing::{info, warn};

use super::buffer::{buffer_polygon, largest_part, zero_buffer, BufferParams};
use super::error::GeometryError;
use crate::geojson::boundary_ring_from_str;

/// A validated boundary and its buffered query region
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    polygon: Polygon<f64>,
    buffered: Polygon<f64>,
    repaired: bool,
}

impl Boundary {
    /// The exact boundary, used for clipping
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// The boundary grown by the buffer distance, used for fetching
    pub fn buffered(&self) -> &Polygon<f64> {
        &self.buffered
    }

    /// Whether the input ring was invalid and had to be repaired
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }
}

/// Builds a [`Boundary`] from a raw coordinate ring
#[derive(Debug, Clone, Default)]
pub struct BoundaryBuilder {
    params: BufferParams,
}

impl BoundaryBuilder {
    /// Create a builder with the default 0.001 degree buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the buffer distance of the query polygon
    pub fn with_buffer_distance(mut self, distance: f64) -> Self {
        self.params.distance = distance;
        self
    }

    /// Set the number of segments used to round buffer corners
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.params.segments = segments;
        self
    }

    pub fn buffer_distance(&self) -> f64 {
        self.params.distance
    }

    /// Build the boundary from (longitude, latitude) coordinates
    ///
    /// The ring may or may not repeat its first point at the end. An invalid
    /// ring is repaired with a zero-distance buffer and a warning is logged,
    /// since the repair can change the shape.
    pub fn build(&self, ring: &[Coord<f64>]) -> Result<Boundary, GeometryError> {
        let distance = self.params.distance;
        if !distance.is_finite() || distance < 0.0 {
            return Err(GeometryError::InvalidBufferDistance(distance));
        }
        if let Some(index) = ring.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate { index });
        }

        let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
        for c in ring {
            if coords.last() != Some(c) {
                coords.push(*c);
            }
        }
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }

        let distinct = count_distinct(&coords);
        if distinct < 3 {
            return Err(GeometryError::TooFewPoints { found: distinct });
        }

        let polygon = Polygon::new(LineString::new(coords), vec![]);
        let (polygon, repaired) = if is_valid(&polygon) {
            (polygon, false)
        } else {
            warn!("Invalid boundary polygon, repairing with a zero-distance buffer; the shape may change");
            let parts = zero_buffer(&polygon);
            if parts.0.len() > 1 {
                warn!(
                    "Repaired boundary has {} parts, keeping the largest and dropping {}",
                    parts.0.len(),
                    parts.0.len() - 1
                );
            }
            let largest = largest_part(parts).ok_or(GeometryError::EmptyAfterRepair)?;
            (largest, true)
        };

        let buffered =
            largest_part(buffer_polygon(&polygon, &self.params)).unwrap_or_else(|| polygon.clone());

        Ok(Boundary {
            polygon,
            buffered,
            repaired,
        })
    }

    /// Build the boundary from a GeoJSON document
    pub fn build_from_geojson(&self, text: &str) -> Result<Boundary, GeometryError> {
        let ring = boundary_ring_from_str(text)?;
        info!("Loaded polygon with {} points", ring.len());
        self.build(&ring)
    }

    /// Build the boundary from a GeoJSON file
    pub fn build_from_file(&self, path: &Path) -> Result<Boundary, GeometryError> {
        let text = fs::read_to_string(path).map_err(|source| GeometryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.build_from_geojson(&text)
    }
}

fn count_distinct(coords: &[Coord<f64>]) -> usize {
    let mut sorted = coords.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    sorted.len()
}

/// A polygon is valid when its exterior ring encloses area and no two of
/// its edges cross or overlap.
fn is_valid(polygon: &Polygon<f64>) -> bool {
    polygon.signed_area() != 0.0 && is_simple_ring(polygon.exterior())
}

fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(segments[i], segments[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::Collinear { intersection })
                    if adjacent && intersection.start == intersection.end => {}
                Some(_) => return false,
            }
        }
    }
    true
}
