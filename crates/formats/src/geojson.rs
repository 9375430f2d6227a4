use serde_json::{Map, Value};

use crate::ingest::IngestError;

/// A tolerant view over one GeoJSON feature with Point geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature<'a> {
    pub id: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Optional third coordinate.
    pub z: Option<f64>,
    pub properties: &'a Map<String, Value>,
}

/// Feature values of a FeatureCollection, or of a bare feature array.
pub fn feature_values(root: &Value) -> Result<&[Value], IngestError> {
    match root {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => {
            if let Some(ty) = obj.get("type").and_then(|v| v.as_str())
                && ty != "FeatureCollection"
            {
                return Err(IngestError::NotACollection);
            }
            obj.get("features")
                .and_then(|v| v.as_array())
                .map(|v| v.as_slice())
                .ok_or(IngestError::NotACollection)
        }
        _ => Err(IngestError::NotACollection),
    }
}

/// Reads a Point feature; `None` for anything else or for non-numeric
/// coordinates.
pub fn point_feature(value: &Value) -> Option<PointFeature<'_>> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    let obj = value.as_object()?;
    let geometry = obj.get("geometry")?.as_object()?;
    if let Some(ty) = geometry.get("type").and_then(|v| v.as_str())
        && ty != "Point"
    {
        return None;
    }
    let coords = geometry.get("coordinates")?.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    let z = coords.get(2).and_then(|v| v.as_f64());

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = match obj.get("properties").and_then(|v| v.as_object()) {
        Some(p) => p,
        None => EMPTY.get_or_init(Map::new),
    };

    Some(PointFeature {
        id,
        lon,
        lat,
        z,
        properties,
    })
}
