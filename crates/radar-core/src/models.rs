//! Toilet records, write requests, search parameters, and result rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::country::CountryCode;
use crate::defaults;
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, GeoPoint};

// =============================================================================
// RECORDS
// =============================================================================

/// A stored toilet location.
///
/// `geom` is derived from `lat`/`lng` by the geometry sync hook on every
/// write; write requests carry no geometry field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToiletLocation {
    pub id: Uuid,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accessible: Option<bool>,
    pub open_hours: Option<String>,
    pub address: Option<String>,
    pub rating: Option<i32>,
    pub is_free: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<CountryCode>,
    pub geom: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

/// Request for creating a toilet. A missing `id` is generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateToiletRequest {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accessible: Option<bool>,
    pub open_hours: Option<String>,
    pub address: Option<String>,
    pub rating: Option<i32>,
    pub is_free: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<CountryCode>,
}

impl CreateToiletRequest {
    /// Request with only a coordinate pair set.
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_country(mut self, country_code: CountryCode) -> Self {
        self.country_code = Some(country_code);
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

/// Partial update. The outer `Option` is "field supplied", the inner one is
/// the new (possibly null) value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateToiletRequest {
    #[serde(deserialize_with = "supplied")]
    pub name: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub lat: Option<Option<f64>>,
    #[serde(deserialize_with = "supplied")]
    pub lng: Option<Option<f64>>,
    #[serde(deserialize_with = "supplied")]
    pub accessible: Option<Option<bool>>,
    #[serde(deserialize_with = "supplied")]
    pub open_hours: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub address: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub rating: Option<Option<i32>>,
    #[serde(deserialize_with = "supplied")]
    pub is_free: Option<Option<bool>>,
    #[serde(rename = "type", deserialize_with = "supplied")]
    pub kind: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub status: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub notes: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub city: Option<Option<String>>,
    #[serde(deserialize_with = "supplied")]
    pub country_code: Option<Option<CountryCode>>,
}

impl UpdateToiletRequest {
    /// Whether the update supplies either coordinate field.
    pub fn touches_coordinates(&self) -> bool {
        self.lat.is_some() || self.lng.is_some()
    }
}

/// Present keys (including explicit `null`) become `Some(..)`.
fn supplied<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// RESULT ROWS
// =============================================================================

/// Compact row returned by viewport and deterministic searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToiletSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accessible: Option<bool>,
    pub open_hours: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ToiletLocation> for ToiletSummary {
    fn from(t: &ToiletLocation) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            lat: t.lat,
            lng: t.lng,
            accessible: t.accessible,
            open_hours: t.open_hours.clone(),
            address: t.address.clone(),
            created_at: t.created_at,
        }
    }
}

/// Row returned by nearest-neighbor search, annotated with distance in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyToilet {
    pub id: Uuid,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub accessible: Option<bool>,
    pub is_free: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub city: Option<String>,
    pub open_hours: Option<String>,
    pub distance: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl NearbyToilet {
    pub fn from_location(t: &ToiletLocation, distance: Option<f64>) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            lat: t.lat,
            lng: t.lng,
            address: t.address.clone(),
            accessible: t.accessible,
            is_free: t.is_free,
            kind: t.kind.clone(),
            status: t.status.clone(),
            notes: t.notes.clone(),
            city: t.city.clone(),
            open_hours: t.open_hours.clone(),
            distance,
            created_at: t.created_at,
        }
    }
}

// =============================================================================
// SEARCH PARAMETERS
// =============================================================================

fn validate_limit(limit: i64) -> Result<()> {
    if limit < 0 {
        return Err(Error::InvalidInput(format!(
            "Result limit must not be negative, got {}",
            limit
        )));
    }
    Ok(())
}

/// Parameters for `find_nearest`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestToiletsParams {
    pub user_lat: f64,
    pub user_lng: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
    #[serde(default = "default_nearest_limit")]
    pub result_limit: i64,
}

fn default_radius() -> f64 {
    defaults::NEAREST_RADIUS_METERS
}

fn default_nearest_limit() -> i64 {
    defaults::NEAREST_LIMIT
}

impl NearestToiletsParams {
    pub fn new(user_lat: f64, user_lng: f64) -> Self {
        Self {
            user_lat,
            user_lng,
            radius_meters: defaults::NEAREST_RADIUS_METERS,
            result_limit: defaults::NEAREST_LIMIT,
        }
    }

    pub fn with_radius(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn with_limit(mut self, result_limit: i64) -> Self {
        self.result_limit = result_limit;
        self
    }

    /// Validate and return the query point.
    pub fn validate(&self) -> Result<GeoPoint> {
        let point = GeoPoint::new(self.user_lat, self.user_lng)?;
        if !self.radius_meters.is_finite() || self.radius_meters < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Search radius must be a non-negative number of meters, got {}",
                self.radius_meters
            )));
        }
        validate_limit(self.result_limit)?;
        Ok(point)
    }
}

/// Parameters for `find_in_view`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToiletsInViewParams {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
    #[serde(default = "default_viewport_limit")]
    pub max_results: i64,
}

fn default_viewport_limit() -> i64 {
    defaults::VIEWPORT_LIMIT
}

impl ToiletsInViewParams {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
            max_results: defaults::VIEWPORT_LIMIT,
        }
    }

    pub fn with_limit(mut self, max_results: i64) -> Self {
        self.max_results = max_results;
        self
    }

    /// Validate and return the viewport.
    pub fn validate(&self) -> Result<BoundingBox> {
        let bounds = BoundingBox::new(self.min_lat, self.min_lng, self.max_lat, self.max_lng)?;
        validate_limit(self.max_results)?;
        Ok(bounds)
    }
}

/// Parameters for `find_deterministic`.
///
/// The user location is accepted for logging only; it never affects ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToiletsDeterministicParams {
    pub center_lat: f64,
    pub center_lng: f64,
    #[serde(default)]
    pub user_lat: Option<f64>,
    #[serde(default)]
    pub user_lng: Option<f64>,
    #[serde(default = "default_zoomed_in")]
    pub is_zoomed_in: bool,
    #[serde(default = "default_deterministic_limit")]
    pub result_limit: i64,
}

fn default_zoomed_in() -> bool {
    true
}

fn default_deterministic_limit() -> i64 {
    defaults::DETERMINISTIC_LIMIT
}

impl ToiletsDeterministicParams {
    pub fn new(center_lat: f64, center_lng: f64) -> Self {
        Self {
            center_lat,
            center_lng,
            user_lat: None,
            user_lng: None,
            is_zoomed_in: true,
            result_limit: defaults::DETERMINISTIC_LIMIT,
        }
    }

    pub fn with_user_location(mut self, lat: f64, lng: f64) -> Self {
        self.user_lat = Some(lat);
        self.user_lng = Some(lng);
        self
    }

    pub fn zoomed_in(mut self, is_zoomed_in: bool) -> Self {
        self.is_zoomed_in = is_zoomed_in;
        self
    }

    pub fn with_limit(mut self, result_limit: i64) -> Self {
        self.result_limit = result_limit;
        self
    }

    /// Validate and return the map center.
    pub fn validate(&self) -> Result<GeoPoint> {
        let center = GeoPoint::new(self.center_lat, self.center_lng).map_err(|_| {
            Error::InvalidInput(format!(
                "Invalid map center coordinates provided: {}, {}",
                self.center_lat, self.center_lng
            ))
        })?;
        validate_limit(self.result_limit)?;
        Ok(center)
    }
}

/// Paging for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_page_limit() -> i64 {
    defaults::PAGE_LIMIT
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: defaults::PAGE_LIMIT,
            offset: defaults::PAGE_OFFSET,
        }
    }
}

impl ListParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn validate(&self) -> Result<()> {
        validate_limit(self.limit)?;
        if self.offset < 0 {
            return Err(Error::InvalidInput(format!(
                "Offset must not be negative, got {}",
                self.offset
            )));
        }
        Ok(())
    }
}
