//! Centralized default constants for the toilet radar.
//!
//! Every crate references these instead of defining its own magic numbers.

// =============================================================================
// NEAREST-NEIGHBOR SEARCH
// =============================================================================

/// Default search radius for `find_nearest`, in meters.
pub const NEAREST_RADIUS_METERS: f64 = 20_000.0;

/// Default result cap for `find_nearest`.
pub const NEAREST_LIMIT: i64 = 3;

// =============================================================================
// VIEWPORT SEARCH
// =============================================================================

/// Default result cap for `find_in_view`.
pub const VIEWPORT_LIMIT: i64 = 4_000;

// =============================================================================
// DETERMINISTIC FETCH
// =============================================================================

/// Default result cap for `find_deterministic`.
pub const DETERMINISTIC_LIMIT: i64 = 1_000;

/// Number of nearest located records consulted for country inference.
pub const COUNTRY_INFERENCE_K: usize = 5;

// =============================================================================
// CRUD / IMPORT
// =============================================================================

/// Default page size for `list` and `list_by_country`.
pub const PAGE_LIMIT: i64 = 1_000;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

/// Records inserted per transaction when importing GeoJSON.
pub const IMPORT_BATCH_SIZE: usize = 100;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Spatial reference identifier of every stored geometry (WGS 84).
pub const SRID: i32 = 4326;

/// Mean earth radius in meters (IUGG), used for great-circle distance.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;
