//! SVG generation from composed maps

use crate::compose::{CanvasPoint, CanvasShape, DrawLayer, MapArtifact, Paint, StrokeStyle, TextLabel};

use super::SvgConfig;

/// Line spacing of multi-line labels, as a multiple of the font size
const LINE_HEIGHT: f64 = 1.2;
/// Depth of the text box below the last baseline, as a multiple of the font size
const DESCENT: f64 = 0.25;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            elements: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> String {
        self.config.class_prefix.clone().unwrap_or_default()
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    /// Add the full-canvas background rectangle
    pub fn add_background(&mut self, side: f64, color: &str) {
        self.elements.push(format!(
            r#"{}<rect class="{}background" x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            self.indent_str(),
            self.prefix(),
            side,
            side,
            escape_xml(color)
        ));
    }

    /// Add a filled area; holes use the even-odd rule
    pub fn add_area(&mut self, rings: &[Vec<CanvasPoint>], paint: &Paint) {
        let d = rings
            .iter()
            .filter(|ring| !ring.is_empty())
            .map(|ring| format!("{} Z", path_to_d(ring)))
            .collect::<Vec<_>>()
            .join(" ");
        if d.is_empty() {
            return;
        }

        let fill = paint.fill.as_deref().unwrap_or("none");
        self.elements.push(format!(
            r#"{}<path class="{}area" d="{}" fill="{}" fill-rule="evenodd"{}/>"#,
            self.indent_str(),
            self.prefix(),
            d,
            escape_xml(fill),
            format_stroke(paint.area_stroke())
        ));
    }

    /// Add a stroked polyline
    pub fn add_line(&mut self, points: &[CanvasPoint], stroke: &StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        self.elements.push(format!(
            r#"{}<path class="{}line" d="{}" fill="none"{}/>"#,
            self.indent_str(),
            self.prefix(),
            path_to_d(points),
            format_stroke(Some(stroke))
        ));
    }

    /// Add a label whose text box has its bottom-left corner at the anchor,
    /// one tspan per line
    pub fn add_label(&mut self, label: &TextLabel) {
        if label.lines.is_empty() {
            return;
        }
        let step = label.font_size * LINE_HEIGHT;
        let last_baseline = label.y - label.font_size * DESCENT;
        let first_y = last_baseline - step * (label.lines.len() - 1) as f64;
        let tspans = label
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                format!(
                    r#"<tspan x="{}" y="{}">{}</tspan>"#,
                    label.x,
                    first_y + step * i as f64,
                    escape_xml(line)
                )
            })
            .collect::<String>();

        self.elements.push(format!(
            r#"{}<text class="{}label" font-family="{}" font-size="{}" fill="{}" text-anchor="start">{}</text>"#,
            self.indent_str(),
            self.prefix(),
            escape_xml(&self.config.font_family),
            label.font_size,
            escape_xml(&label.color),
            tspans
        ));
    }

    /// Add a group element for one draw layer
    pub fn start_group(&mut self, id: &str) {
        let prefix = self.prefix();
        self.elements.push(format!(
            r#"{}<g id="{}{}" class="{}layer">"#,
            self.indent_str(),
            prefix,
            escape_xml(id),
            prefix
        ));
        self.indent += 1;
    }

    /// Close a group element
    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Build the final SVG string
    ///
    /// The physical size is given in centimetres and the viewBox in points,
    /// so one user unit is one point.
    pub fn build(self, side: f64, size_cm: f64) -> String {
        let nl = self.newline();
        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}cm" height="{}cm" viewBox="0 0 {} {}">"#,
            size_cm, size_cm, side, side
        ));
        svg.push_str(nl);

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Render a MapArtifact to an SVG string
pub fn render_svg(artifact: &MapArtifact, config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());

    builder.add_background(artifact.side, &artifact.background);
    for layer in &artifact.layers {
        render_layer(layer, &mut builder);
    }
    if let Some(label) = &artifact.label {
        builder.add_label(label);
    }

    builder.build(artifact.side, artifact.size_cm)
}

fn render_layer(layer: &DrawLayer, builder: &mut SvgBuilder) {
    builder.start_group(&layer.id);
    for shape in &layer.shapes {
        match shape {
            CanvasShape::Area(rings) => builder.add_area(rings, &layer.paint),
            CanvasShape::Line(points) => {
                if let Some(stroke) = &layer.paint.stroke {
                    builder.add_line(points, stroke);
                }
            }
        }
    }
    builder.end_group();
}

fn format_stroke(stroke: Option<&StrokeStyle>) -> String {
    match stroke {
        Some(s) => format!(
            r#" stroke="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round""#,
            escape_xml(&s.color),
            s.width
        ),
        None => r#" stroke="none""#.to_string(),
    }
}

/// Convert a path of points to an SVG path d attribute
fn path_to_d(path: &[CanvasPoint]) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut d = format!("M{} {}", path[0].x, path[0].y);
    for point in &path[1..] {
        d.push_str(&format!(" L{} {}", point.x, point.y));
    }
    d
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
