//! Artifact export
//!
//! Writes a composed map to `{output_root}/{id}/{id}_map.{ext}` in every
//! requested format. The PDF and PNG are converted from the same SVG
//! document, so all formats encode the same canvas.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use resvg::usvg::fontdb;
use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compose::MapArtifact;
use crate::renderer::{render_svg, SvgConfig};

pub const DEFAULT_DPI: u32 = 300;

/// Errors raised while writing artifacts
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}' (expected svg, pdf or png)")]
    UnsupportedFormat(String),

    #[error("invalid dataset id '{0}'")]
    InvalidDatasetId(String),

    #[error("raster resolution must be positive, got {0} dpi")]
    InvalidDpi(u32),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse rendered SVG: {0}")]
    Svg(#[from] usvg::Error),

    #[error("cannot allocate a {0}x{0} pixel raster")]
    Raster(u32),

    #[error("failed to encode PNG: {0}")]
    Encode(String),

    #[error("failed to convert to PDF: {0}")]
    Pdf(String),
}

/// Output file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Svg,
    Pdf,
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }

    pub fn defaults() -> Vec<ExportFormat> {
        vec![ExportFormat::Svg, ExportFormat::Pdf, ExportFormat::Png]
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Raster side in pixels for a physical side and resolution
pub fn raster_side_px(size_cm: f64, dpi: u32) -> u32 {
    (size_cm / 2.54 * f64::from(dpi)).round() as u32
}

/// Fonts used to lay out label text
///
/// System fonts are loaded and the generic `sans-serif` family is pointed at
/// an installed face when its default (Arial) is missing, so text is never
/// dropped silently.
pub fn font_database() -> fontdb::Database {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    };
    if db.query(&query).is_none() {
        let family = db
            .faces()
            .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .min_by_key(|name| !name.contains("Sans"));
        match family {
            Some(name) => {
                debug!("Using {} as the sans-serif family", name);
                db.set_sans_serif_family(name);
            }
            None => warn!("No fonts found, labels will be missing from PDF and PNG output"),
        }
    }
    db
}

/// Process-wide font database, loaded on first use
pub fn system_fonts() -> &'static Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS.get_or_init(|| Arc::new(font_database()))
}

/// Parse a rendered SVG document for conversion
pub fn parse_svg(svg: &str, fonts: &Arc<fontdb::Database>) -> Result<usvg::Tree, ExportError> {
    let opt = usvg::Options {
        fontdb: Arc::clone(fonts),
        ..Default::default()
    };
    Ok(usvg::Tree::from_str(svg, &opt)?)
}

/// Rasterize a parsed document to a square PNG of `side_px` pixels
pub fn render_png(tree: &usvg::Tree, side_px: u32) -> Result<Vec<u8>, ExportError> {
    let mut pixmap = tiny_skia::Pixmap::new(side_px, side_px).ok_or(ExportError::Raster(side_px))?;

    let scale = side_px as f32 / tree.size().width();
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap
        .encode_png()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

/// Convert a parsed document to a single-page PDF of the same physical size
pub fn render_pdf(tree: &usvg::Tree) -> Result<Vec<u8>, ExportError> {
    // usvg sizes the tree in CSS pixels
    let mut page = svg2pdf::PageOptions::default();
    page.dpi = 96.0;
    svg2pdf::to_pdf(tree, svg2pdf::ConversionOptions::default(), page)
        .map_err(|e| ExportError::Pdf(e.to_string()))
}

/// Writes composed maps to disk
#[derive(Debug, Clone)]
pub struct ArtifactExporter {
    output_root: PathBuf,
    formats: Vec<ExportFormat>,
    dpi: u32,
    svg: SvgConfig,
}

impl ArtifactExporter {
    /// Exporter writing SVG, PDF and PNG at 300 dpi
    pub fn new(output_root: impl AsRef<Path>) -> Self {
        Self {
            output_root: output_root.as_ref().to_path_buf(),
            formats: ExportFormat::defaults(),
            dpi: DEFAULT_DPI,
            svg: SvgConfig::default(),
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = ExportFormat>) -> Self {
        self.formats.clear();
        for format in formats {
            if !self.formats.contains(&format) {
                self.formats.push(format);
            }
        }
        self
    }

    /// Set the raster resolution
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_svg_config(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// The parsed document, parsed on first use
    fn tree<'t>(&self, cache: &'t mut Option<usvg::Tree>, svg: &str) -> Result<&'t usvg::Tree, ExportError> {
        let tree = match cache.take() {
            Some(tree) => tree,
            None => parse_svg(svg, system_fonts())?,
        };
        Ok(cache.insert(tree))
    }

    pub fn output_path(&self, dataset_id: &str, format: ExportFormat) -> PathBuf {
        self.output_root
            .join(dataset_id)
            .join(format!("{dataset_id}_map.{}", format.extension()))
    }

    /// Write one file per format and return their paths
    pub fn export(&self, artifact: &MapArtifact, dataset_id: &str) -> Result<Vec<PathBuf>, ExportError> {
        if dataset_id.is_empty()
            || dataset_id == "."
            || dataset_id == ".."
            || dataset_id.contains(['/', '\\', '\0'])
        {
            return Err(ExportError::InvalidDatasetId(dataset_id.to_string()));
        }
        if self.dpi == 0 {
            return Err(ExportError::InvalidDpi(self.dpi));
        }

        let dir = self.output_root.join(dataset_id);
        fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
            path: dir.clone(),
            source,
        })?;

        let svg = render_svg(artifact, &self.svg);
        let mut tree = None;
        let mut written = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            let path = self.output_path(dataset_id, *format);
            let bytes = match format {
                ExportFormat::Svg => svg.clone().into_bytes(),
                ExportFormat::Pdf => render_pdf(self.tree(&mut tree, &svg)?)?,
                ExportFormat::Png => {
                    let side = raster_side_px(artifact.size_cm, self.dpi);
                    debug!("Rasterizing {}x{} px at {} dpi", side, side, self.dpi);
                    render_png(self.tree(&mut tree, &svg)?, side)?
                }
            };
            fs::write(&path, bytes).map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Saved {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::TextLabel;

    fn labelled(size_cm: f64, text: &str) -> MapArtifact {
        let mut artifact = MapArtifact::blank(size_cm, "#ffffff");
        artifact.label = Some(TextLabel {
            lines: vec![text.to_string()],
            x: artifact.side * 0.03,
            y: artifact.side * 0.97,
            font_size: 14.0,
            color: "#000000".to_string(),
        });
        artifact
    }

    /// The numbers of the first `/MediaBox` entry
    fn media_box(pdf: &[u8]) -> Vec<f64> {
        let text = String::from_utf8_lossy(pdf);
        let key = text.find("/MediaBox").expect("page has a media box");
        let start = key + text[key..].find('[').unwrap() + 1;
        let end = start + text[start..].find(']').unwrap();
        text[start..end]
            .split_whitespace()
            .map(|n| n.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_raster_side() {
        assert_eq!(raster_side_px(24.0, 300), 2835);
        assert_eq!(raster_side_px(24.0, 600), 5669);
        assert_eq!(raster_side_px(2.54, 100), 100);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("svg".parse::<ExportFormat>().unwrap(), ExportFormat::Svg);
        assert_eq!(" PNG ".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            "tiff".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(f)) if f == "tiff"
        ));
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
    }

    #[test]
    fn test_output_path() {
        let exporter = ArtifactExporter::new("/maps");
        assert_eq!(
            exporter.output_path("Test", ExportFormat::Svg),
            PathBuf::from("/maps/Test/Test_map.svg")
        );
    }

    #[test]
    fn test_formats_deduplicated() {
        let exporter = ArtifactExporter::new("/maps").with_formats([
            ExportFormat::Png,
            ExportFormat::Png,
            ExportFormat::Svg,
        ]);
        assert_eq!(exporter.formats(), &[ExportFormat::Png, ExportFormat::Svg]);
    }

    #[test]
    fn test_export_writes_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ArtifactExporter::new(dir.path()).with_dpi(50);
        let artifact = MapArtifact::blank(2.54, "#ffffff");

        let paths = exporter.export(&artifact, "Test").unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Test_map.svg", "Test_map.pdf", "Test_map.png"]);

        let png = std::fs::read(&paths[2]).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        // IHDR width and height
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 50);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 50);

        let pdf = std::fs::read(&paths[1]).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_pdf_page_matches_physical_size() {
        let artifact = MapArtifact::blank(24.0, "#ffffff");
        let svg = render_svg(&artifact, &SvgConfig::default());
        let pdf = render_pdf(&parse_svg(&svg, system_fonts()).unwrap()).unwrap();

        let points = 24.0 / 2.54 * 72.0;
        let media = media_box(&pdf);
        assert_eq!(media.len(), 4);
        assert!((media[2] - media[0] - points).abs() < 0.01, "got {:?}", media);
        assert!((media[3] - media[1] - points).abs() < 0.01, "got {:?}", media);
    }

    #[test]
    fn test_label_reaches_raster() {
        let fonts = system_fonts();
        let rasterize = |artifact: &MapArtifact| {
            let svg = render_svg(artifact, &SvgConfig::default());
            render_png(&parse_svg(&svg, fonts).unwrap(), 300).unwrap()
        };

        let with_label = rasterize(&labelled(2.54, "Test"));
        let without_label = rasterize(&MapArtifact::blank(2.54, "#ffffff"));
        assert_ne!(with_label, without_label);
    }

    #[test]
    fn test_sans_serif_resolves_when_fonts_exist() {
        let fonts = system_fonts();
        if fonts.len() == 0 {
            return;
        }
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            ..Default::default()
        };
        assert!(fonts.query(&query).is_some());
    }

    #[test]
    fn test_export_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = MapArtifact::blank(1.0, "#ffffff");
        assert!(matches!(
            ArtifactExporter::new(dir.path()).export(&artifact, "a/b"),
            Err(ExportError::InvalidDatasetId(_))
        ));
        assert!(matches!(
            ArtifactExporter::new(dir.path()).with_dpi(0).export(&artifact, "Test"),
            Err(ExportError::InvalidDpi(0))
        ));
    }
}
