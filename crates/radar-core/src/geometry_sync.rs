//! Write-path hook that keeps `geom` consistent with `lat`/`lng`.
//!
//! Every store calls into this module synchronously while building the row
//! it is about to write, so geometry is never written separately from the
//! coordinates it was derived from.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::geo::{validate_lat, validate_lng, GeoPoint};
use crate::models::{CreateToiletRequest, ToiletLocation, UpdateToiletRequest};

/// Geometry for a coordinate pair: `point(lng, lat)`, or `None` unless both
/// coordinates are present.
pub fn derive_geometry(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    }
}

/// Range-check whichever coordinates are present.
pub fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<()> {
    if let Some(lat) = lat {
        validate_lat(lat)?;
    }
    if let Some(lng) = lng {
        validate_lng(lng)?;
    }
    Ok(())
}

/// Validate a create request before it reaches the store.
pub fn validate_create(req: &CreateToiletRequest) -> Result<()> {
    validate_coordinates(req.lat, req.lng)
}

/// Validate an update request before it reaches the store.
pub fn validate_update(req: &UpdateToiletRequest) -> Result<()> {
    validate_coordinates(req.lat.flatten(), req.lng.flatten())
}

/// Build the record a create request describes, with geometry derived.
pub fn materialize(req: CreateToiletRequest, created_at: DateTime<Utc>) -> Result<ToiletLocation> {
    validate_create(&req)?;
    Ok(ToiletLocation {
        id: req.id.unwrap_or_else(Uuid::new_v4),
        geom: derive_geometry(req.lat, req.lng),
        name: req.name,
        lat: req.lat,
        lng: req.lng,
        accessible: req.accessible,
        open_hours: req.open_hours,
        address: req.address,
        rating: req.rating,
        is_free: req.is_free,
        kind: req.kind,
        status: req.status,
        notes: req.notes,
        city: req.city,
        country_code: req.country_code,
        created_at,
    })
}

/// Apply a partial update in place.
///
/// Only supplied fields change. When either coordinate is supplied the
/// geometry is recomputed from the resulting pair (and cleared if either
/// ended up null); otherwise it is left as is. `id` and `created_at` never
/// change. Returns whether the geometry was resynchronized.
pub fn apply_update(current: &mut ToiletLocation, update: UpdateToiletRequest) -> Result<bool> {
    validate_update(&update)?;
    let resync = update.touches_coordinates();

    macro_rules! assign {
        ($($field:ident),+ $(,)?) => {
            $(if let Some(value) = update.$field {
                current.$field = value;
            })+
        };
    }
    assign!(
        name,
        lat,
        lng,
        accessible,
        open_hours,
        address,
        rating,
        is_free,
        kind,
        status,
        notes,
        city,
        country_code,
    );

    if resync {
        current.geom = derive_geometry(current.lat, current.lng);
    }
    Ok(resync)
}
