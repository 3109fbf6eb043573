//! Minimal GeoJSON reader for polygon regions.
//!
//! Parsed through `serde_json::Value` so that FeatureCollections, single
//! Features and bare geometries are all accepted.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;

use super::{RegionError, RegionGeometry, RegionResult};

/// CRS assumed when a document carries no `crs` member.
const DEFAULT_GEOJSON_EPSG: u32 = 4326;

/// Parse GeoJSON text into regions.
///
/// Feature names come from the `name` or `id` property, falling back to
/// `{source_name}#{index}`. A numeric `buffer_radius` property overrides the
/// pipeline's default radius for that region.
pub fn parse_geojson(text: &str, source_name: &str) -> RegionResult<Vec<RegionGeometry>> {
    let parse_err = |reason: String| RegionError::Parse {
        source_name: source_name.to_string(),
        reason,
    };

    let root: Value = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;
    let epsg = document_epsg(&root).map_err(parse_err)?;

    let features: Vec<&Value> = match type_of(&root) {
        Some("FeatureCollection") => root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| parse_err("FeatureCollection without features array".to_string()))?
            .iter()
            .collect(),
        Some("Feature") => vec![&root],
        Some(_) => {
            // Bare geometry
            let geometry = parse_geometry(&root).map_err(|e| with_source(e, source_name))?;
            return Ok(vec![RegionGeometry::new(
                format!("{}#0", source_name),
                geometry,
                epsg,
            )]);
        }
        None => return Err(parse_err("missing \"type\" member".to_string())),
    };

    let mut regions = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let geometry = feature
            .get("geometry")
            .filter(|g| !g.is_null())
            .ok_or_else(|| parse_err(format!("feature {} has no geometry", index)))?;
        let geometry = parse_geometry(geometry).map_err(|e| with_source(e, source_name))?;

        let properties = feature.get("properties");
        let name = properties
            .and_then(|p| p.get("name").or_else(|| p.get("id")))
            .and_then(value_to_name)
            .unwrap_or_else(|| format!("{}#{}", source_name, index));

        let mut region = RegionGeometry::new(name, geometry, epsg);
        if let Some(radius) = properties
            .and_then(|p| p.get("buffer_radius"))
            .and_then(Value::as_f64)
        {
            region = region.with_buffer_radius(radius);
        }
        regions.push(region);
    }

    Ok(regions)
}

fn type_of(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

fn value_to_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn with_source(err: RegionError, source_name: &str) -> RegionError {
    match err {
        RegionError::Parse { reason, .. } => RegionError::Parse {
            source_name: source_name.to_string(),
            reason,
        },
        other => other,
    }
}

/// EPSG code from the legacy `crs` member, if present.
fn document_epsg(root: &Value) -> Result<u32, String> {
    let Some(name) = root
        .get("crs")
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(Value::as_str)
    else {
        return Ok(DEFAULT_GEOJSON_EPSG);
    };

    parse_crs_name(name).ok_or_else(|| format!("unrecognised CRS name '{}'", name))
}

/// Accepts `EPSG:32642`, `urn:ogc:def:crs:EPSG::32642` and the OGC CRS84 alias.
fn parse_crs_name(name: &str) -> Option<u32> {
    if name.ends_with("CRS84") {
        return Some(DEFAULT_GEOJSON_EPSG);
    }
    let upper = name.to_ascii_uppercase();
    let idx = upper.rfind("EPSG:")?;
    upper[idx + 5..].trim_start_matches(':').parse().ok()
}

fn parse_geometry(value: &Value) -> RegionResult<MultiPolygon<f64>> {
    let coordinates = || {
        value
            .get("coordinates")
            .ok_or_else(|| geometry_err("geometry without coordinates"))
    };

    match type_of(value) {
        Some("Polygon") => Ok(MultiPolygon::new(vec![parse_polygon(coordinates()?)?])),
        Some("MultiPolygon") => {
            let polygons = coordinates()?
                .as_array()
                .ok_or_else(|| geometry_err("MultiPolygon coordinates must be an array"))?
                .iter()
                .map(parse_polygon)
                .collect::<RegionResult<Vec<_>>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        Some(other) => Err(RegionError::UnsupportedGeometry(other.to_string())),
        None => Err(geometry_err("geometry without type")),
    }
}

fn parse_polygon(value: &Value) -> RegionResult<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| geometry_err("polygon coordinates must be an array of rings"))?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = rings
        .next()
        .ok_or_else(|| geometry_err("polygon without exterior ring"))??;
    let interiors = rings.collect::<RegionResult<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(value: &Value) -> RegionResult<LineString<f64>> {
    let positions = value
        .as_array()
        .ok_or_else(|| geometry_err("ring must be an array of positions"))?;

    positions
        .iter()
        .map(|position| {
            let xy = position.as_array().filter(|p| p.len() >= 2);
            match xy.map(|p| (p[0].as_f64(), p[1].as_f64())) {
                Some((Some(x), Some(y))) => Ok(Coord { x, y }),
                _ => Err(geometry_err("position must hold two numbers")),
            }
        })
        .collect::<RegionResult<Vec<_>>>()
        .map(LineString::new)
}

fn geometry_err(reason: &str) -> RegionError {
    RegionError::Parse {
        source_name: String::new(),
        reason: reason.to_string(),
    }
}
