//! In-process toilet store backed by the R-tree index.
//!
//! Records live in an id-ordered map next to a [`SpatialIndex`] of their
//! geometries. Both sit behind one async read/write lock: writers update the
//! map and the index together, and readers never see one without the other.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use radar_core::geometry_sync::{
    apply_update, derive_geometry, materialize, validate_coordinates,
};
use radar_core::{
    plan_fetch, BoundingBox, CountryCode, CreateToiletRequest, DeterministicFetch, Error,
    FetchStrategy, GeoPoint, NearbyToilet, Result, ToiletLocation, ToiletStore, ToiletSummary,
    UpdateToiletRequest, COUNTRY_INFERENCE_K,
};

use crate::spatial_index::{IndexedToilet, SpatialIndex};

#[derive(Default)]
struct Inner {
    records: BTreeMap<Uuid, ToiletLocation>,
    index: SpatialIndex,
}

impl Inner {
    fn put(&mut self, record: ToiletLocation) {
        if let Some(point) = record.geom {
            self.index.insert(record.id, point);
        }
        self.records.insert(record.id, record);
    }

    fn country_of(&self, id: &Uuid) -> Option<CountryCode> {
        self.records.get(id).and_then(|r| r.country_code)
    }
}

/// Convert a caller-supplied cap to a count, rejecting negatives.
fn cap(limit: i64, what: &str) -> Result<usize> {
    usize::try_from(limit)
        .map_err(|_| Error::InvalidInput(format!("{} must be non-negative, got {}", what, limit)))
}

/// [`ToiletStore`] kept entirely in memory.
#[derive(Default)]
pub struct MemoryToiletStore {
    inner: RwLock<Inner>,
}

impl MemoryToiletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `records`, indexed in one bulk load.
    ///
    /// Geometry is derived again from each record's coordinates; a supplied
    /// `geom` is ignored. Out-of-range coordinates and repeated ids are
    /// rejected.
    pub fn from_records(records: Vec<ToiletLocation>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for mut record in records {
            validate_coordinates(record.lat, record.lng)?;
            record.geom = derive_geometry(record.lat, record.lng);
            if let Some(existing) = map.insert(record.id, record) {
                return Err(Error::InvalidInput(format!(
                    "Toilet {} appears more than once",
                    existing.id
                )));
            }
        }
        let entries = map
            .values()
            .filter_map(|r| r.geom.map(|point| IndexedToilet { id: r.id, point }))
            .collect();
        Ok(Self {
            inner: RwLock::new(Inner {
                records: map,
                index: SpatialIndex::bulk_load(entries),
            }),
        })
    }
}

#[async_trait]
impl ToiletStore for MemoryToiletStore {
    async fn insert(&self, req: CreateToiletRequest) -> Result<ToiletLocation> {
        let record = materialize(req, Utc::now())?;
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&record.id) {
            return Err(Error::InvalidInput(format!(
                "Toilet {} already exists",
                record.id
            )));
        }
        inner.put(record.clone());
        debug!(
            subsystem = "index",
            component = "memory_store",
            op = "insert",
            toilet_id = %record.id,
            located = record.geom.is_some(),
            "Inserted toilet"
        );
        Ok(record)
    }

    async fn insert_bulk(&self, reqs: Vec<CreateToiletRequest>) -> Result<Vec<ToiletLocation>> {
        let now = Utc::now();
        let records = reqs
            .into_iter()
            .map(|req| materialize(req, now))
            .collect::<Result<Vec<_>>>()?;

        let mut inner = self.inner.write().await;
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if inner.records.contains_key(&record.id) || !seen.insert(record.id) {
                return Err(Error::InvalidInput(format!(
                    "Toilet {} already exists",
                    record.id
                )));
            }
        }
        for record in &records {
            inner.put(record.clone());
        }
        debug!(
            subsystem = "index",
            component = "memory_store",
            op = "insert_bulk",
            result_count = records.len(),
            "Inserted toilets"
        );
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ToiletLocation>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, req: UpdateToiletRequest) -> Result<Option<ToiletLocation>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let Some(current) = inner.records.get(&id) else {
            return Ok(None);
        };

        // Work on a copy so a rejected update leaves the stored record intact.
        let mut updated = current.clone();
        let previous = updated.geom;
        let resynced = apply_update(&mut updated, req)?;

        if resynced {
            if let Some(point) = previous {
                inner.index.remove(id, point);
            }
            if let Some(point) = updated.geom {
                inner.index.insert(id, point);
            }
        }
        inner.records.insert(id, updated.clone());
        debug!(
            subsystem = "index",
            component = "memory_store",
            op = "update",
            toilet_id = %id,
            resynced,
            "Updated toilet"
        );
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.records.remove(&id) else {
            return Ok(false);
        };
        if let Some(point) = record.geom {
            inner.index.remove(id, point);
        }
        Ok(true)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ToiletLocation>> {
        let limit = cap(limit, "limit")?;
        let offset = cap(offset, "offset")?;
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_country(
        &self,
        country: CountryCode,
        limit: i64,
    ) -> Result<Vec<ToiletLocation>> {
        let limit = cap(limit, "limit")?;
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .values()
            .filter(|r| r.country_code == Some(country))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        let len = self.inner.read().await.records.len();
        i64::try_from(len).map_err(|e| Error::Internal(e.to_string()))
    }

    async fn nearest_within(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        limit: i64,
    ) -> Result<Vec<NearbyToilet>> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Radius must be a non-negative number of meters, got {}",
                radius_meters
            )));
        }
        let limit = cap(limit, "result_limit")?;

        let inner = self.inner.read().await;
        let results: Vec<NearbyToilet> = inner
            .index
            .within_radius(&center, radius_meters)
            .into_iter()
            .filter_map(|(entry, distance)| {
                inner
                    .records
                    .get(&entry.id)
                    .map(|r| NearbyToilet::from_location(r, Some(distance)))
            })
            .take(limit)
            .collect();
        Ok(results)
    }

    async fn within_bounds(&self, bounds: BoundingBox, limit: i64) -> Result<Vec<ToiletSummary>> {
        let limit = cap(limit, "max_results")?;
        let inner = self.inner.read().await;
        Ok(inner
            .index
            .in_bounds(&bounds, limit)
            .iter()
            .filter_map(|entry| inner.records.get(&entry.id).map(ToiletSummary::from))
            .collect())
    }

    async fn fetch_deterministic(
        &self,
        center: GeoPoint,
        is_zoomed_in: bool,
        limit: i64,
    ) -> Result<DeterministicFetch> {
        let max = cap(limit, "result_limit")?;
        let inner = self.inner.read().await;

        let nearest_codes: Vec<CountryCode> = inner
            .index
            .nearest_matching(&center, COUNTRY_INFERENCE_K, |e| {
                inner.country_of(&e.id).is_some()
            })
            .iter()
            .filter_map(|e| inner.country_of(&e.id))
            .collect();

        let plan = plan_fetch(&nearest_codes, center, is_zoomed_in, limit);
        let country = plan.country();
        if plan.inference.is_fallback() {
            warn!(
                subsystem = "index",
                component = "memory_store",
                op = "fetch_deterministic",
                country_code = %country,
                inference_fallback = true,
                "No located toilets with a country near center, using fallback country"
            );
        } else {
            debug!(
                subsystem = "index",
                component = "memory_store",
                op = "fetch_deterministic",
                country_code = %country,
                candidates = nearest_codes.len(),
                "Inferred country"
            );
        }

        let toilets: Vec<ToiletSummary> = match plan.strategy {
            FetchStrategy::ByDistance => inner
                .index
                .nearest_matching(&center, max, |e| {
                    inner.country_of(&e.id) == Some(country)
                })
                .iter()
                .filter_map(|e| inner.records.get(&e.id).map(ToiletSummary::from))
                .collect(),
            FetchStrategy::ById => inner
                .records
                .values()
                .filter(|r| r.geom.is_some() && r.country_code == Some(country))
                .take(max)
                .map(ToiletSummary::from)
                .collect(),
        };

        debug!(
            subsystem = "index",
            component = "memory_store",
            op = "fetch_deterministic",
            strategy = plan.strategy.as_str(),
            result_count = toilets.len(),
            "Deterministic fetch complete"
        );
        Ok(DeterministicFetch { plan, toilets })
    }
}
