//! # radar-search
//!
//! Query service for the toilet radar.
//!
//! [`ToiletService`] sits on any [`radar_core::ToiletStore`] and provides:
//! - Nearest-neighbor search within a radius
//! - Viewport (bounding-box) search
//! - Deterministic, zoom-aware map fetches with country inference
//! - Validated CRUD and batched GeoJSON import
//!
//! ## Example
//!
//! ```ignore
//! use radar_search::{ToiletService, ToiletsDeterministicParams};
//! use radar_db::{Database, DatabaseConfig};
//!
//! let db = Database::from_config(&DatabaseConfig::from_env()?).await?;
//! let service = ToiletService::new(db.toilets.clone());
//!
//! let toilets = service
//!     .find_deterministic(&ToiletsDeterministicParams::new(46.52, 6.63).zoomed_in(false))
//!     .await?;
//! ```

pub mod service;

// Re-export core types
pub use radar_core::*;

pub use service::{ImportReport, ServiceConfig, ToiletService, DEFAULT_TIMEOUT_SECS};
