//! GeoJSON import of open-data toilet exports.
//!
//! Accepts a `FeatureCollection` of `Point` features. Feature properties are
//! read with the same keys as [`CreateToiletRequest`]; unknown properties are
//! ignored. Features without a usable point are skipped.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::country::CountryCode;
use crate::error::{Error, Result};
use crate::geometry_sync::validate_create;
use crate::models::CreateToiletRequest;

/// Values applied to imported records that do not carry them.
#[derive(Debug, Clone, Default)]
pub struct ImportDefaults {
    pub city: Option<String>,
    pub country_code: Option<CountryCode>,
}

/// Parsed import: records ready for bulk insert plus the number skipped.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub records: Vec<CreateToiletRequest>,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: JsonValue,
}

impl Geometry {
    /// `(lng, lat)` of a Point geometry.
    fn point(&self) -> Option<(f64, f64)> {
        if self.kind != "Point" {
            return None;
        }
        let coords = self.coordinates.as_array()?;
        let lng = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        Some((lng, lat))
    }
}

/// Parse a GeoJSON `FeatureCollection` into create requests.
pub fn parse_feature_collection(input: &str, defaults: &ImportDefaults) -> Result<ParsedImport> {
    let collection: FeatureCollection = serde_json::from_str(input)?;
    if collection.kind != "FeatureCollection" {
        return Err(Error::Serialization(format!(
            "Expected a FeatureCollection, found '{}'",
            collection.kind
        )));
    }

    let mut parsed = ParsedImport::default();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let feature_id = feature
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("#{}", index));

        let Some((lng, lat)) = feature.geometry.as_ref().and_then(Geometry::point) else {
            warn!(
                subsystem = "import",
                component = "geojson",
                feature = %feature_id,
                "Skipping feature without point coordinates"
            );
            parsed.skipped += 1;
            continue;
        };

        // Source-system ids are not UUIDs; imported records get fresh ones.
        let mut record: CreateToiletRequest = match feature.properties {
            Some(JsonValue::Object(mut props)) => {
                props.remove("id");
                serde_json::from_value(JsonValue::Object(props)).map_err(|e| {
                    Error::Serialization(format!("Feature {}: {}", feature_id, e))
                })?
            }
            _ => CreateToiletRequest::default(),
        };
        record.lat = Some(lat);
        record.lng = Some(lng);
        if record.city.is_none() {
            record.city = defaults.city.clone();
        }
        if record.country_code.is_none() {
            record.country_code = defaults.country_code;
        }

        if let Err(e) = validate_create(&record) {
            warn!(
                subsystem = "import",
                component = "geojson",
                feature = %feature_id,
                error = %e,
                "Skipping feature with out-of-range coordinates"
            );
            parsed.skipped += 1;
            continue;
        }

        parsed.records.push(record);
    }

    Ok(parsed)
}
