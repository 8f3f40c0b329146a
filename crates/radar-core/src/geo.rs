//! Point and bounding-box primitives in WGS 84 (SRID 4326).
//!
//! Coordinates are decimal degrees. Distances are great-circle distances in
//! meters over a sphere of [`EARTH_RADIUS_METERS`].

use serde::{Deserialize, Serialize};

use crate::defaults::EARTH_RADIUS_METERS;
use crate::error::{Error, Result};

/// Valid latitude range, inclusive.
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);

/// Valid longitude range, inclusive.
pub const LNG_RANGE: (f64, f64) = (-180.0, 180.0);

/// Check a single latitude value.
pub fn validate_lat(lat: f64) -> Result<()> {
    if lat.is_finite() && (LAT_RANGE.0..=LAT_RANGE.1).contains(&lat) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Latitude {} is outside [-90, 90]",
            lat
        )))
    }
}

/// Check a single longitude value.
pub fn validate_lng(lng: f64) -> Result<()> {
    if lng.is_finite() && (LNG_RANGE.0..=LNG_RANGE.1).contains(&lng) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Longitude {} is outside [-180, 180]",
            lng
        )))
    }
}

/// A geographic point. Also the derived `geom` value of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Create a validated point.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        validate_lat(lat)?;
        validate_lng(lng)?;
        Ok(Self { lat, lng })
    }

    /// Great-circle (haversine) distance to `other`, in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }

    /// Planar `[x, y]` coordinates as stored by the spatial index.
    pub fn to_xy(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// An axis-aligned viewport in latitude/longitude space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Create a well-formed box: finite values and `min <= max` on each axis.
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Result<Self> {
        let values = [min_lat, min_lng, max_lat, max_lng];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Viewport bounds must be finite: ({}, {}) - ({}, {})",
                min_lat, min_lng, max_lat, max_lng
            )));
        }
        if min_lat > max_lat || min_lng > max_lng {
            return Err(Error::InvalidInput(format!(
                "Viewport is inverted: min ({}, {}) exceeds max ({}, {})",
                min_lat, min_lng, max_lat, max_lng
            )));
        }
        Ok(Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        })
    }

    /// Box enclosing every point within `radius_m` of `center`.
    ///
    /// Over-approximates: callers filter candidates by exact distance. Near
    /// the poles or the antimeridian the longitude span widens to the full
    /// range.
    pub fn around(center: &GeoPoint, radius_m: f64) -> Self {
        let d_lat = (radius_m / EARTH_RADIUS_METERS).to_degrees();
        let min_lat = (center.lat - d_lat).max(LAT_RANGE.0);
        let max_lat = (center.lat + d_lat).min(LAT_RANGE.1);

        let widest_lat = center.lat.abs() + d_lat;
        let (min_lng, max_lng) = if widest_lat >= 90.0 {
            LNG_RANGE
        } else {
            let d_lng = d_lat / widest_lat.to_radians().cos();
            let (lo, hi) = (center.lng - d_lng, center.lng + d_lng);
            if lo < LNG_RANGE.0 || hi > LNG_RANGE.1 {
                LNG_RANGE
            } else {
                (lo, hi)
            }
        };

        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Envelope test, edges inclusive.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    /// Lower corner as planar `[x, y]`.
    pub fn min_xy(&self) -> [f64; 2] {
        [self.min_lng, self.min_lat]
    }

    /// Upper corner as planar `[x, y]`.
    pub fn max_xy(&self) -> [f64; 2] {
        [self.max_lng, self.max_lat]
    }
}
