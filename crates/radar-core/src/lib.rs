//! # radar-core
//!
//! Core types, traits, and query planning for the toilet radar.
//!
//! This crate provides the record and parameter types, the geometry sync
//! hook, country inference for deterministic fetches, and the
//! [`ToiletStore`] trait that storage backends implement.

pub mod country;
pub mod defaults;
pub mod deterministic;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod geometry_sync;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use country::CountryCode;
pub use deterministic::{
    infer_country, plan_fetch, CountryInference, FetchPlan, FetchStrategy, COUNTRY_INFERENCE_K,
};
pub use error::{Error, Result};
pub use geo::{BoundingBox, GeoPoint};
pub use geojson::{parse_feature_collection, ImportDefaults, ParsedImport};
pub use models::*;
pub use traits::*;
