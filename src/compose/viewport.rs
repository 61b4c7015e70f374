//! Mapping from geographic coordinates to the canvas

use geo::Coord;

use super::types::CanvasPoint;

/// Geographic extent of the drawn shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn from_coord(c: Coord<f64>) -> Self {
        Self {
            min_x: c.x,
            min_y: c.y,
            max_x: c.x,
            max_y: c.y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Expand this extent to include a coordinate
    pub fn expand_to_include(&self, c: Coord<f64>) -> Extent {
        Extent {
            min_x: self.min_x.min(c.x),
            min_y: self.min_y.min(c.y),
            max_x: self.max_x.max(c.x),
            max_y: self.max_y.max(c.y),
        }
    }

    /// Smallest extent containing every coordinate, `None` when empty
    pub fn of(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Extent> {
        coords.into_iter().fold(None, |acc, c| match acc {
            None => Some(Extent::from_coord(c)),
            Some(e) => Some(e.expand_to_include(c)),
        })
    }
}

/// Equal-aspect projection of an extent onto a square canvas
///
/// The longer side of the extent fills the canvas and the shorter one is
/// centred. The y axis is flipped so that north is up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    origin: Coord<f64>,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    side: f64,
}

impl Viewport {
    pub fn fit(extent: Option<Extent>, side: f64) -> Self {
        let Some(extent) = extent else {
            return Self {
                origin: Coord { x: 0.0, y: 0.0 },
                scale: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
                side,
            };
        };

        let (w, h) = (extent.width(), extent.height());
        let longest = w.max(h);
        let scale = if longest > 0.0 { side / longest } else { 1.0 };

        Self {
            origin: Coord {
                x: extent.min_x,
                y: extent.min_y,
            },
            scale,
            offset_x: (side - w * scale) / 2.0,
            offset_y: (side - h * scale) / 2.0,
            side,
        }
    }

    /// Canvas points per coordinate unit
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn project(&self, c: Coord<f64>) -> CanvasPoint {
        let x = self.offset_x + (c.x - self.origin.x) * self.scale;
        let y = self.offset_y + (c.y - self.origin.y) * self.scale;
        CanvasPoint::new(x, self.side - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn close(a: CanvasPoint, x: f64, y: f64) -> bool {
        (a.x - x).abs() < 1e-9 && (a.y - y).abs() < 1e-9
    }

    #[test]
    fn test_square_extent_fills_canvas() {
        let extent = Extent::of([coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }]);
        let viewport = Viewport::fit(extent, 100.0);
        assert!(close(viewport.project(coord! { x: 0.0, y: 0.0 }), 0.0, 100.0));
        assert!(close(viewport.project(coord! { x: 1.0, y: 1.0 }), 100.0, 0.0));
    }

    #[test]
    fn test_wide_extent_centred_vertically() {
        let extent = Extent::of([coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 1.0 }]);
        let viewport = Viewport::fit(extent, 100.0);
        assert_eq!(viewport.scale(), 50.0);
        assert!(close(viewport.project(coord! { x: 0.0, y: 0.0 }), 0.0, 75.0));
        assert!(close(viewport.project(coord! { x: 2.0, y: 1.0 }), 100.0, 25.0));
    }

    #[test]
    fn test_degenerate_extent_centred() {
        let extent = Extent::of([coord! { x: 5.0, y: 5.0 }]);
        let viewport = Viewport::fit(extent, 100.0);
        assert!(close(viewport.project(coord! { x: 5.0, y: 5.0 }), 50.0, 50.0));
    }

    #[test]
    fn test_empty_extent() {
        assert_eq!(Extent::of(Vec::new()), None);
    }
}
