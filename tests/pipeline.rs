//! End-to-end tests: boundary file to exported map files

use std::fs;
use std::path::Path;

use geo::{line_string, Polygon};
use place_map::compose::ids;
use place_map::layer::{BOUNDARY, STREETS, WATER};
use place_map::{
    prepare_dataset, run, BoundaryBuilder, ExportFormat, Feature, FeatureLayer, FeatureProvider,
    FeatureQuery, FetchError, LayerStore, MapConfig, PipelineWarning,
};

const UNIT_SQUARE: &str = r#"{
  "type": "Polygon",
  "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]
}"#;

fn write_config(dir: &Path) -> MapConfig {
    fs::write(dir.join("boundary.geojson"), UNIT_SQUARE).unwrap();
    fs::create_dir_all(dir.join("features")).unwrap();

    let toml = format!(
        r#"
[dataset]
id = "Test"

[boundary]
file = "{root}/boundary.geojson"

[features]
directory = "{root}/features"

[render]
size_cm = 2.54
dpi = 100

[paths]
data_dir = "{root}/data"
output_dir = "{root}/maps"
"#,
        root = dir.display()
    );
    MapConfig::from_str(&toml).unwrap()
}

fn png_dimensions(path: &Path) -> (u32, u32) {
    let png = fs::read(path).unwrap();
    assert_eq!(&png[1..4], b"PNG");
    (
        u32::from_be_bytes([png[16], png[17], png[18], png[19]]),
        u32::from_be_bytes([png[20], png[21], png[22], png[23]]),
    )
}

#[test]
fn test_unit_square_without_features() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = run(&config).unwrap();
    assert!(output.warnings.is_empty());

    let maps = dir.path().join("maps").join("Test");
    assert_eq!(
        output.paths,
        vec![
            maps.join("Test_map.svg"),
            maps.join("Test_map.pdf"),
            maps.join("Test_map.png")
        ]
    );
    assert_eq!(png_dimensions(&output.paths[2]), (100, 100));
    assert!(fs::read(&output.paths[1]).unwrap().starts_with(b"%PDF-"));

    // only the boundary ground and the label are drawn
    assert_eq!(output.artifact.layer_ids(), vec![ids::BOUNDARY]);
    let label = output.artifact.label.as_ref().unwrap();
    assert_eq!(label.lines, vec!["Test".to_string()]);

    let svg = fs::read_to_string(&output.paths[0]).unwrap();
    assert!(svg.contains(r#"width="2.54cm" height="2.54cm""#));
    assert!(svg.contains(">Test</tspan>"));
    assert!(!svg.contains("map-line"));

    let store = LayerStore::new(dir.path().join("data"));
    assert_eq!(store.layer_names("Test").unwrap(), vec![BOUNDARY.to_string()]);
}

#[test]
fn test_features_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_config(dir.path());
    config.render.formats = vec![ExportFormat::Svg];

    fs::write(
        dir.path().join("features").join("streets.geojson"),
        r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"highway": "motorway"},
     "geometry": {"type": "LineString", "coordinates": [[-1, 0.5], [2, 0.5]]}},
    {"type": "Feature", "properties": {"highway": "residential"},
     "geometry": {"type": "LineString", "coordinates": [[0.5, -1], [0.5, 2]]}},
    {"type": "Feature", "properties": {"highway": "primary"},
     "geometry": {"type": "LineString", "coordinates": [[5, 5], [6, 6]]}},
    {"type": "Feature", "properties": {"building": "yes"},
     "geometry": {"type": "LineString", "coordinates": [[0.2, 0.2], [0.3, 0.3]]}}
  ]
}"#,
    )
    .unwrap();

    let output = run(&config).unwrap();
    assert_eq!(
        output.artifact.layer_ids(),
        vec![ids::BOUNDARY, ids::STREETS_MINOR, ids::STREETS_MAJOR]
    );

    let streets = LayerStore::new(dir.path().join("data"))
        .load_layer("Test", STREETS)
        .unwrap();
    assert_eq!(streets.len(), 2);
}

#[test]
fn test_malformed_category_is_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_config(dir.path());
    config.render.formats = vec![ExportFormat::Svg];
    fs::write(dir.path().join("features").join("water.geojson"), "{ not json").unwrap();

    let output = run(&config).unwrap();
    assert!(matches!(
        output.warnings.as_slice(),
        [PipelineWarning::FetchFailed { category, .. }] if category == WATER
    ));
    assert_eq!(output.paths.len(), 1);
}

#[test]
fn test_missing_boundary_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_config(dir.path());
    config.boundary.file = Some(dir.path().join("nowhere.geojson"));
    assert!(run(&config).is_err());
}

/// Returns a street layer with a broken feature, fails for everything else
struct FlakyProvider;

impl FeatureProvider for FlakyProvider {
    fn fetch(&self, _region: &Polygon<f64>, query: &FeatureQuery) -> Result<FeatureLayer, FetchError> {
        if query.category != STREETS {
            return Err(FetchError::Unavailable {
                category: query.category.clone(),
                reason: "HTTP 504".to_string(),
            });
        }
        Ok(FeatureLayer::from_features(
            STREETS,
            vec![
                Feature::new(geo::line_string![(x: 0.1, y: 0.1), (x: 0.9, y: 0.9)])
                    .with_property("highway", "residential"),
                Feature::new(geo::line_string![(x: 0.1, y: 0.9), (x: f64::INFINITY, y: 0.1)])
                    .with_property("highway", "residential"),
            ],
        ))
    }
}

#[test]
fn test_degraded_prepare_still_produces_dataset() {
    let boundary = BoundaryBuilder::new()
        .build_from_geojson(UNIT_SQUARE)
        .unwrap();
    let queries = place_map::default_queries();
    let prepared = prepare_dataset("Test", &boundary, &FlakyProvider, &queries);

    let fetch_failures = prepared
        .warnings
        .iter()
        .filter(|w| matches!(w, PipelineWarning::FetchFailed { .. }))
        .count();
    assert_eq!(fetch_failures, 2);
    assert!(prepared
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::ClipFallback { layer, .. } if layer == STREETS)));

    let names: Vec<&str> = prepared.dataset.layer_names().collect();
    assert_eq!(names, vec![BOUNDARY, STREETS]);
    assert_eq!(prepared.dataset.layer(STREETS).unwrap().len(), 2);
}
