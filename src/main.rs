//! place-map CLI
//!
//! Usage:
//!   place-map styles [--theme-file <FILE>]
//!   place-map prepare --boundary <FILE> --id <ID> [OPTIONS]
//!   place-map render --id <ID> [--style <NAME>] [OPTIONS]
//!   place-map run --boundary <FILE> --id <ID> [OPTIONS]
//!
//! Every subcommand accepts `--config <FILE>`; flags override the file.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use place_map::{
    prepare_from_config, render_from_config, run, ExportFormat, MapConfig, PipelineWarning,
    StyleCatalog,
};

#[derive(Parser)]
#[command(name = "place-map")]
#[command(about = "Print-ready maps of a place from its boundary polygon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available color styles
    Styles {
        /// Extra themes file (TOML format)
        #[arg(long)]
        theme_file: Option<PathBuf>,
    },
    /// Fetch and clip features for a boundary and save the dataset
    Prepare(Overrides),
    /// Render a saved dataset
    Render(Overrides),
    /// Prepare then render
    Run(Overrides),
}

#[derive(Args)]
struct Overrides {
    /// Run configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset identifier
    #[arg(long)]
    id: Option<String>,

    /// Boundary polygon file (GeoJSON)
    #[arg(short, long)]
    boundary: Option<PathBuf>,

    /// Directory of `{category}.geojson` feature files
    #[arg(long)]
    features: Option<PathBuf>,

    /// Place name shown on the map (defaults to the id)
    #[arg(long)]
    place: Option<String>,

    /// Region shown under the place name
    #[arg(long)]
    region: Option<String>,

    /// Color style
    #[arg(short, long)]
    style: Option<String>,

    /// Extra themes file (TOML format)
    #[arg(long)]
    theme_file: Option<PathBuf>,

    /// Map side in centimetres
    #[arg(long)]
    size: Option<f64>,

    /// Line thickness multiplier
    #[arg(short, long)]
    thickness: Option<f64>,

    /// Raster resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Output formats, comma separated (svg, pdf, png)
    #[arg(long, value_delimiter = ',', value_parser = parse_format)]
    formats: Vec<ExportFormat>,

    /// Layer store directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Map output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl Overrides {
    fn into_config(self) -> MapConfig {
        let mut config = match &self.config {
            Some(path) => load_config(path),
            None => MapConfig::default(),
        };

        if let Some(id) = self.id {
            config.dataset.id = id;
        }
        if self.place.is_some() {
            config.dataset.place = self.place;
        }
        if self.region.is_some() {
            config.dataset.region = self.region;
        }
        if self.boundary.is_some() {
            config.boundary.file = self.boundary;
        }
        if let Some(dir) = self.features {
            config.features.directory = dir;
        }
        if let Some(style) = self.style {
            config.render.style = style;
        }
        if self.theme_file.is_some() {
            config.render.theme_file = self.theme_file;
        }
        if let Some(size) = self.size {
            config.render.size_cm = size;
        }
        if let Some(thickness) = self.thickness {
            config.render.thickness = thickness;
        }
        if let Some(dpi) = self.dpi {
            config.render.dpi = dpi;
        }
        if !self.formats.is_empty() {
            config.render.formats = self.formats;
        }
        if let Some(dir) = self.data_dir {
            config.paths.data_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.paths.output_dir = dir;
        }

        if let Err(e) = config.validate() {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        config
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Styles { theme_file } => {
            let catalog = match &theme_file {
                Some(path) => StyleCatalog::with_file(path),
                None => Ok(StyleCatalog::builtin().clone()),
            };
            match catalog {
                Ok(catalog) => print!("{}", catalog.describe()),
                Err(e) => fail(e),
            }
        }
        Command::Prepare(overrides) => {
            let config = overrides.into_config();
            match prepare_from_config(&config) {
                Ok(prepared) => {
                    print_warnings(&prepared.warnings);
                    let names: Vec<&str> = prepared.dataset.layer_names().collect();
                    println!(
                        "Saved dataset '{}' with layers: {}",
                        prepared.dataset.id,
                        names.join(", ")
                    );
                }
                Err(e) => fail(e),
            }
        }
        Command::Render(overrides) => {
            let config = overrides.into_config();
            match render_from_config(&config) {
                Ok(output) => {
                    print_warnings(&output.warnings);
                    print_paths(&output.paths);
                }
                Err(e) => fail(e),
            }
        }
        Command::Run(overrides) => {
            let config = overrides.into_config();
            match run(&config) {
                Ok(output) => {
                    print_warnings(&output.warnings);
                    print_paths(&output.paths);
                }
                Err(e) => fail(e),
            }
        }
    }
}

fn load_config(path: &Path) -> MapConfig {
    match MapConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: place_map::ExportError| e.to_string())
}

fn print_warnings(warnings: &[PipelineWarning]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn print_paths(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    process::exit(1);
}
