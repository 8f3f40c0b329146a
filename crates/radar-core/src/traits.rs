//! Store handle abstraction the query engine depends on.
//!
//! Every method is one atomic unit: it runs in its own transaction (or under
//! one lock acquisition) and either returns a complete result or an error,
//! never a partial row set. Implementations call [`crate::geometry_sync`] on
//! every coordinate-touching write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::country::CountryCode;
use crate::deterministic::FetchPlan;
use crate::error::Result;
use crate::geo::{BoundingBox, GeoPoint};
use crate::models::*;

/// Result of a deterministic fetch, with the plan that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicFetch {
    pub plan: FetchPlan,
    pub toilets: Vec<ToiletSummary>,
}

/// Repository for toilet records and the spatial queries over them.
#[async_trait]
pub trait ToiletStore: Send + Sync {
    /// Insert a record, deriving its geometry.
    async fn insert(&self, req: CreateToiletRequest) -> Result<ToiletLocation>;

    /// Insert many records in a single transaction; all or nothing.
    async fn insert_bulk(&self, reqs: Vec<CreateToiletRequest>) -> Result<Vec<ToiletLocation>>;

    /// Get a record by id.
    async fn get(&self, id: Uuid) -> Result<Option<ToiletLocation>>;

    /// Apply a partial update. `None` if the record does not exist.
    async fn update(&self, id: Uuid, req: UpdateToiletRequest) -> Result<Option<ToiletLocation>>;

    /// Hard delete. `false` if the record did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Page through all records ordered by id.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ToiletLocation>>;

    /// Records with the given country code, ordered by id.
    async fn list_by_country(&self, country: CountryCode, limit: i64)
        -> Result<Vec<ToiletLocation>>;

    /// Total number of records.
    async fn count(&self) -> Result<i64>;

    /// Records within `radius_meters` (geodesic) of `center`, nearest first,
    /// at most `limit`.
    async fn nearest_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        limit: i64,
    ) -> Result<Vec<NearbyToilet>>;

    /// Records whose geometry intersects `bounds`, unordered, at most `limit`.
    async fn within_bounds(&self, bounds: BoundingBox, limit: i64) -> Result<Vec<ToiletSummary>>;

    /// Country inference and the zoom-dependent fetch, on one snapshot.
    async fn fetch_deterministic(
        &self,
        center: GeoPoint,
        is_zoomed_in: bool,
        limit: i64,
    ) -> Result<DeterministicFetch>;
}
