//! Buffer operations
//!
//! Outward buffering of polygons as the union of the polygon with a
//! rectangle around every edge and a circle around every vertex, plus the
//! zero-distance buffer used to repair invalid rings.

use std::f64::consts::PI;

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Parameters for buffer operations
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer distance in coordinate units (degrees for WGS84 layers)
    pub distance: f64,
    /// Number of segments used to approximate vertex circles
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 0.001,
            segments: 16,
        }
    }
}

/// Circle of radius `params.distance` around `center`
pub fn buffer_point(center: Coord<f64>, params: &BufferParams) -> Polygon<f64> {
    let n = params.segments.max(4);
    let r = params.distance.abs();

    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push((center.x + r * angle.cos(), center.y + r * angle.sin()));
    }
    coords.push(coords[0]);

    Polygon::new(LineString::from(coords), vec![])
}

/// Rectangle of half-width `distance` around the segment a-b
fn buffer_segment(a: Coord<f64>, b: Coord<f64>, distance: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return None;
    }
    let nx = -dy / len * distance;
    let ny = dx / len * distance;

    Some(Polygon::new(
        LineString::from(vec![
            (a.x + nx, a.y + ny),
            (b.x + nx, b.y + ny),
            (b.x - nx, b.y - ny),
            (a.x - nx, a.y - ny),
            (a.x + nx, a.y + ny),
        ]),
        vec![],
    ))
}

/// Expand a polygon outward by `params.distance`
///
/// A zero distance returns the polygon unchanged.
pub fn buffer_polygon(polygon: &Polygon<f64>, params: &BufferParams) -> MultiPolygon<f64> {
    let mut result = MultiPolygon::new(vec![polygon.clone()]);
    if params.distance == 0.0 {
        return result;
    }

    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
    for ring in rings {
        for line in ring.lines() {
            if let Some(quad) = buffer_segment(line.start, line.end, params.distance) {
                result = result.union(&quad);
            }
            result = result.union(&buffer_point(line.start, params));
        }
    }
    result
}

/// Zero-distance buffer: rebuild the polygon from its own union
///
/// Resolves self-intersections. The result may have several parts (a
/// figure-eight ring splits in two) or none (a collinear ring).
pub fn zero_buffer(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    let subject = MultiPolygon::new(vec![polygon.clone()]);
    let parts = subject.union(&MultiPolygon::<f64>::new(vec![]));
    MultiPolygon::new(
        parts
            .into_iter()
            .filter(|p| p.unsigned_area() > 0.0)
            .collect(),
    )
}

/// The part with the largest area
pub fn largest_part(parts: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    parts.into_iter().max_by(|a, b| {
        a.unsigned_area()
            .partial_cmp(&b.unsigned_area())
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Contains};

    fn unit_square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn test_buffer_point_circle() {
        let params = BufferParams {
            distance: 10.0,
            segments: 64,
        };
        let circle = buffer_point(Coord { x: 0.0, y: 0.0 }, &params);
        let expected = PI * 100.0;
        let error = (circle.unsigned_area() - expected).abs() / expected;
        assert!(error < 0.01, "circle area error {:.2}%", error * 100.0);
        assert_eq!(circle.exterior().0.len(), 65);
    }

    #[test]
    fn test_buffer_polygon_grows() {
        let square = unit_square();
        let params = BufferParams {
            distance: 0.1,
            segments: 16,
        };
        let buffered = largest_part(buffer_polygon(&square, &params)).unwrap();
        // 1 + perimeter * d + pi * d^2, slightly less for the polygonal corners
        let expected = 1.0 + 4.0 * 0.1 + PI * 0.01;
        assert!((buffered.unsigned_area() - expected).abs() < 0.005);
        assert!(buffered.contains(&square));
    }

    #[test]
    fn test_buffer_zero_distance_is_identity() {
        let square = unit_square();
        let params = BufferParams {
            distance: 0.0,
            segments: 16,
        };
        let buffered = buffer_polygon(&square, &params);
        assert_eq!(buffered.0, vec![square]);
    }

    #[test]
    fn test_zero_buffer_splits_figure_eight() {
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0)];
        let repaired = zero_buffer(&bowtie);
        assert_eq!(repaired.0.len(), 2);
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_buffer_collinear_is_empty() {
        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        assert!(zero_buffer(&flat).0.is_empty());
    }

    #[test]
    fn test_largest_part() {
        let small = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)];
        let big = polygon![(x: 5.0, y: 5.0), (x: 9.0, y: 5.0), (x: 5.0, y: 9.0)];
        let picked = largest_part(MultiPolygon::new(vec![small, big.clone()])).unwrap();
        assert_eq!(picked, big);
        assert!(largest_part(MultiPolygon::new(vec![])).is_none());
    }
}
