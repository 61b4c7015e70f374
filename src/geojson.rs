//! GeoJSON reading and writing
//!
//! Converts between `geo` geometries, [`Feature`]s and [`FeatureLayer`]s and
//! their GeoJSON representation. Layers are written as FeatureCollections
//! with three foreign members (`name`, `crs`, `columns`) so that a layer
//! survives a write/read cycle with its schema and CRS intact.

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{json, Map, Value};

use crate::error::GeoJsonError;
use crate::layer::{AttributeValue, Crs, Feature, FeatureLayer};

/// Serialize a geometry to a GeoJSON geometry object
///
/// `Line`, `Rect` and `Triangle` have no GeoJSON counterpart and are written
/// as `LineString` and `Polygon`.
pub fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": position(p.0) }),
        Geometry::Line(l) => json!({
            "type": "LineString",
            "coordinates": [position(l.start), position(l.end)],
        }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": positions(ls) }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": rings(p) }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.0.iter().map(|p| position(p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.0.iter().map(positions).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(rings).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.0.iter().map(geometry_to_value).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry_to_value(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_to_value(&Geometry::Polygon(t.to_polygon())),
    }
}

fn position(c: Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn positions(ls: &LineString<f64>) -> Vec<Value> {
    ls.0.iter().copied().map(position).collect()
}

fn rings(p: &Polygon<f64>) -> Vec<Vec<Value>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(positions)
        .collect()
}

/// Parse a GeoJSON geometry object
pub fn geometry_from_value(value: &Value) -> Result<Geometry<f64>, GeoJsonError> {
    let obj = value
        .as_object()
        .ok_or_else(|| GeoJsonError::invalid("geometry", "expected an object"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GeoJsonError::invalid("geometry", "missing \"type\""))?;

    if kind == "GeometryCollection" {
        let members = array(obj.get("geometries"), "GeometryCollection.geometries")?;
        let geometries = members
            .iter()
            .map(geometry_from_value)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geometries)));
    }

    let coords = obj.get("coordinates");
    let context = format!("{kind}.coordinates");
    match kind {
        "Point" => Ok(Geometry::Point(Point::from(parse_position(
            coords.unwrap_or(&Value::Null),
            &context,
        )?))),
        "MultiPoint" => {
            let points = parse_positions(coords, &context)?
                .into_iter()
                .map(Point::from)
                .collect::<Vec<_>>();
            Ok(Geometry::MultiPoint(MultiPoint::new(points)))
        }
        "LineString" => Ok(Geometry::LineString(LineString::new(parse_positions(
            coords, &context,
        )?))),
        "MultiLineString" => {
            let lines = array(coords, &context)?
                .iter()
                .map(|line| parse_positions(Some(line), &context).map(LineString::new))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
        }
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords, &context)?)),
        "MultiPolygon" => {
            let polygons = array(coords, &context)?
                .iter()
                .map(|poly| parse_polygon(Some(poly), &context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        other => Err(GeoJsonError::UnsupportedGeometry(other.to_string())),
    }
}

fn array<'a>(value: Option<&'a Value>, context: &str) -> Result<&'a Vec<Value>, GeoJsonError> {
    value
        .and_then(Value::as_array)
        .ok_or_else(|| GeoJsonError::invalid(context, "expected an array"))
}

fn parse_position(value: &Value, context: &str) -> Result<Coord<f64>, GeoJsonError> {
    let pair = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| GeoJsonError::invalid(context, "expected a [x, y] position"))?;
    let x = pair[0]
        .as_f64()
        .ok_or_else(|| GeoJsonError::invalid(context, "x is not a number"))?;
    let y = pair[1]
        .as_f64()
        .ok_or_else(|| GeoJsonError::invalid(context, "y is not a number"))?;
    Ok(Coord { x, y })
}

fn parse_positions(value: Option<&Value>, context: &str) -> Result<Vec<Coord<f64>>, GeoJsonError> {
    array(value, context)?
        .iter()
        .map(|p| parse_position(p, context))
        .collect()
}

fn parse_polygon(value: Option<&Value>, context: &str) -> Result<Polygon<f64>, GeoJsonError> {
    let mut rings = array(value, context)?
        .iter()
        .map(|ring| parse_positions(Some(ring), context).map(LineString::new));
    let exterior = rings
        .next()
        .ok_or_else(|| GeoJsonError::invalid(context, "polygon has no rings"))??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn attribute_to_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Int(i) => json!(i),
        AttributeValue::Float(f) => json!(f),
        AttributeValue::String(s) => Value::String(s.clone()),
    }
}

/// Nested arrays and objects are kept as their JSON text.
fn attribute_from_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

/// Serialize a feature to a GeoJSON Feature object
pub fn feature_to_value(feature: &Feature) -> Value {
    let properties: Map<String, Value> = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_value(v)))
        .collect();
    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": geometry_to_value(&feature.geometry),
    })
}

/// Parse a GeoJSON Feature object
///
/// Returns `Ok(None)` for features with a null geometry.
pub fn feature_from_value(value: &Value) -> Result<Option<Feature>, GeoJsonError> {
    let geometry = match value.get("geometry") {
        None | Some(Value::Null) => return Ok(None),
        Some(g) => geometry_from_value(g)?,
    };
    let mut feature = Feature::new(geometry);
    if let Some(props) = value.get("properties").and_then(Value::as_object) {
        for (key, v) in props {
            feature.set_property(key.clone(), attribute_from_value(v));
        }
    }
    Ok(Some(feature))
}

/// Serialize a layer to a FeatureCollection with `name`, `crs` and `columns`
pub fn layer_to_value(layer: &FeatureLayer) -> Value {
    json!({
        "type": "FeatureCollection",
        "name": layer.name(),
        "crs": { "type": "name", "properties": { "name": layer.crs().code() } },
        "columns": layer.columns(),
        "features": layer.iter().map(feature_to_value).collect::<Vec<_>>(),
    })
}

/// Parse a FeatureCollection into a layer
///
/// The `name` member takes precedence over `default_name`. A missing `crs`
/// member means WGS84, as in RFC 7946.
pub fn layer_from_value(default_name: &str, value: &Value) -> Result<FeatureLayer, GeoJsonError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(default_name);

    if let Some(code) = value.pointer("/crs/properties/name").and_then(Value::as_str) {
        if Crs::from_code(code).is_none() {
            return Err(GeoJsonError::invalid(
                "crs",
                format!("unsupported coordinate reference system '{code}'"),
            ));
        }
    }

    let mut layer = FeatureLayer::new(name);
    if let Some(columns) = value.get("columns").and_then(Value::as_array) {
        for column in columns.iter().filter_map(Value::as_str) {
            layer = layer.with_column(column);
        }
    }

    for (index, raw) in array(value.get("features"), "features")?.iter().enumerate() {
        match feature_from_value(raw)? {
            Some(feature) => layer.push(feature),
            None => tracing::debug!("Skipping feature {} of {} without geometry", index, name),
        }
    }
    Ok(layer)
}

/// Parse FeatureCollection text into a layer
pub fn layer_from_str(default_name: &str, text: &str) -> Result<FeatureLayer, GeoJsonError> {
    let value: Value = serde_json::from_str(text)?;
    layer_from_value(default_name, &value)
}

/// Extract the outer ring of the first polygon in a boundary document
///
/// Accepts a FeatureCollection (first feature is used), a single Feature or a
/// bare Polygon geometry.
pub fn boundary_ring_from_str(text: &str) -> Result<Vec<Coord<f64>>, GeoJsonError> {
    let value: Value = serde_json::from_str(text)?;
    let geometry = match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => value
            .get("features")
            .and_then(Value::as_array)
            .and_then(|features| features.first())
            .and_then(|feature| feature.get("geometry")),
        Some("Feature") => value.get("geometry"),
        _ => Some(&value),
    };

    match geometry.filter(|g| !g.is_null()).map(geometry_from_value) {
        Some(Ok(Geometry::Polygon(polygon))) => Ok(polygon.exterior().0.clone()),
        Some(Err(e)) => Err(e),
        _ => Err(GeoJsonError::NoPolygon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_point_roundtrip_exact() {
        let geom = Geometry::Point(point!(x: 51.389_123_456_789_01, y: 35.689_987_654_321_02));
        let text = geometry_to_value(&geom).to_string();
        let parsed = geometry_from_value(&serde_json::from_str(&text).unwrap()).unwrap();
        assert_eq!(parsed, geom);
    }

    #[test]
    fn test_polygon_with_hole() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 1.0]]
            ]
        });
        match geometry_from_value(&value).unwrap() {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_geometry() {
        let value = json!({ "type": "Circle", "coordinates": [0.0, 0.0] });
        assert!(matches!(
            geometry_from_value(&value),
            Err(GeoJsonError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn test_bad_position() {
        let value = json!({ "type": "Point", "coordinates": ["a", 1.0] });
        assert!(matches!(
            geometry_from_value(&value),
            Err(GeoJsonError::Invalid { .. })
        ));
    }

    #[test]
    fn test_attribute_types_survive() {
        let feature = Feature::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)])
            .with_property("highway", "primary")
            .with_property("lanes", 2_i64)
            .with_property("width", 7.0)
            .with_property("oneway", true)
            .with_property("ref", AttributeValue::Null);
        let parsed = feature_from_value(&feature_to_value(&feature)).unwrap().unwrap();
        assert_eq!(parsed, feature);
    }

    #[test]
    fn test_nested_property_kept_as_text() {
        let value = json!({
            "type": "Feature",
            "properties": { "highway": ["primary", "secondary"] },
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
        });
        let feature = feature_from_value(&value).unwrap().unwrap();
        assert_eq!(feature.tag("highway"), Some(r#"["primary","secondary"]"#));
    }

    #[test]
    fn test_null_geometry_skipped() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"natural": "water"}, "geometry": null},
            {"type": "Feature", "properties": {"natural": "water"},
             "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}}
        ]}"#;
        let layer = layer_from_str("water", text).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.name(), "water");
    }

    #[test]
    fn test_layer_columns_preserved() {
        let layer = FeatureLayer::from_features(
            "water",
            vec![Feature::new(point!(x: 0.0, y: 0.0)).with_property("natural", "water")],
        )
        .with_column("waterway");
        let parsed = layer_from_value("ignored", &layer_to_value(&layer)).unwrap();
        assert_eq!(parsed, layer);
    }

    #[test]
    fn test_layer_rejects_projected_crs() {
        let text = r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:3857"}},
            "features": []}"#;
        assert!(layer_from_str("streets", text).is_err());
    }

    #[test]
    fn test_boundary_from_feature_collection() {
        let text = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Polygon",
                "coordinates": [[[0, 0], [0, 1], [1, 1], [1, 0], [0, 0]]]}
        }]}"#;
        let ring = boundary_ring_from_str(text).unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[1], Coord { x: 0.0, y: 1.0 });
    }

    #[test]
    fn test_boundary_requires_polygon() {
        let text = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Point", "coordinates": [0, 0]}
        }]}"#;
        assert!(matches!(
            boundary_ring_from_str(text),
            Err(GeoJsonError::NoPolygon)
        ));
        assert!(matches!(
            boundary_ring_from_str(r#"{"type": "FeatureCollection", "features": []}"#),
            Err(GeoJsonError::NoPolygon)
        ));
    }

    #[test]
    fn test_boundary_from_bare_polygon() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 1.0, y: 2.0)];
        let text = geometry_to_value(&Geometry::Polygon(poly.clone())).to_string();
        assert_eq!(boundary_ring_from_str(&text).unwrap(), poly.exterior().0);
    }
}
