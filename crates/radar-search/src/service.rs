//! Query service over a [`ToiletStore`].
//!
//! Every operation validates its parameters before touching the store, runs
//! the store call under the configured timeout, and returns either the whole
//! result or an error. A timed-out call is cancelled (dropping any open
//! transaction, which rolls it back) and reported as `StoreUnavailable`.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use radar_core::defaults::IMPORT_BATCH_SIZE;
use radar_core::geometry_sync::{validate_create, validate_update};
use radar_core::{
    parse_feature_collection, CountryCode, CreateToiletRequest, DeterministicFetch, Error,
    ImportDefaults, ListParams, NearbyToilet, NearestToiletsParams, Result, ToiletLocation, ToiletStore,
    ToiletSummary, ToiletsDeterministicParams, ToiletsInViewParams, UpdateToiletRequest,
};

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Upper bound on a single store call.
    pub timeout: Duration,
    /// Records per bulk insert during imports.
    pub import_batch_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            import_batch_size: IMPORT_BATCH_SIZE,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the import batch size. Zero is treated as one.
    pub fn import_batch_size(mut self, size: usize) -> Self {
        self.import_batch_size = size.max(1);
        self
    }
}

/// Outcome of a GeoJSON import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records written.
    pub inserted: usize,
    /// Features skipped for missing or invalid coordinates.
    pub skipped: usize,
    /// Bulk inserts issued.
    pub batches: usize,
}

fn check_non_negative(value: i64, what: &str) -> Result<()> {
    if value < 0 {
        return Err(Error::InvalidInput(format!(
            "{} must be non-negative, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Toilet query service.
pub struct ToiletService<S> {
    store: S,
    config: ServiceConfig,
}

impl<S: ToiletStore> ToiletService<S> {
    /// Service with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.config.timeout.as_millis() as u64;
                error!(
                    subsystem = "search",
                    component = "toilet_service",
                    op,
                    timeout_ms,
                    "Store call timed out"
                );
                Err(Error::StoreUnavailable(format!(
                    "{} timed out after {} ms",
                    op, timeout_ms
                )))
            }
        }
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Toilets within a radius of the user, nearest first.
    #[instrument(skip(self, params), fields(
        subsystem = "search",
        component = "toilet_service",
        op = "find_nearest",
        user_lat = params.user_lat,
        user_lng = params.user_lng,
        radius_m = params.radius_meters,
        limit = params.result_limit,
    ))]
    pub async fn find_nearest(&self, params: &NearestToiletsParams) -> Result<Vec<NearbyToilet>> {
        let center = params.validate()?;
        let start = Instant::now();

        let results = self
            .bounded(
                "find_nearest",
                self.store
                    .nearest_within(center, params.radius_meters, params.result_limit),
            )
            .await?;

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Nearest search complete"
        );
        Ok(results)
    }

    /// Toilets inside a map viewport, unordered.
    #[instrument(skip(self, params), fields(
        subsystem = "search",
        component = "toilet_service",
        op = "find_in_view",
        min_lat = params.min_lat,
        min_lng = params.min_lng,
        max_lat = params.max_lat,
        max_lng = params.max_lng,
        limit = params.max_results,
    ))]
    pub async fn find_in_view(&self, params: &ToiletsInViewParams) -> Result<Vec<ToiletSummary>> {
        let bounds = params.validate()?;
        let start = Instant::now();

        let results = self
            .bounded(
                "find_in_view",
                self.store.within_bounds(bounds, params.max_results),
            )
            .await?;

        debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Viewport search complete"
        );
        Ok(results)
    }

    /// Deterministic, zoom-aware fetch around a map center.
    pub async fn find_deterministic(
        &self,
        params: &ToiletsDeterministicParams,
    ) -> Result<Vec<ToiletSummary>> {
        Ok(self.find_deterministic_with_plan(params).await?.toilets)
    }

    /// Deterministic fetch, also returning the inferred country and strategy.
    ///
    /// The user location is logged but never affects ordering.
    #[instrument(skip(self, params), fields(
        subsystem = "search",
        component = "toilet_service",
        op = "find_deterministic",
        center_lat = params.center_lat,
        center_lng = params.center_lng,
        user_lat = params.user_lat,
        user_lng = params.user_lng,
        zoomed_in = params.is_zoomed_in,
        limit = params.result_limit,
    ))]
    pub async fn find_deterministic_with_plan(
        &self,
        params: &ToiletsDeterministicParams,
    ) -> Result<DeterministicFetch> {
        let center = params.validate()?;
        let start = Instant::now();

        let fetch = self
            .bounded(
                "find_deterministic",
                self.store
                    .fetch_deterministic(center, params.is_zoomed_in, params.result_limit),
            )
            .await?;

        debug!(
            country_code = %fetch.plan.country(),
            inference_fallback = fetch.plan.inference.is_fallback(),
            strategy = fetch.plan.strategy.as_str(),
            result_count = fetch.toilets.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Deterministic fetch complete"
        );
        Ok(fetch)
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    pub async fn create(&self, req: CreateToiletRequest) -> Result<ToiletLocation> {
        validate_create(&req)?;
        self.bounded("create", self.store.insert(req)).await
    }

    /// Insert many records; all or nothing.
    pub async fn bulk_create(&self, reqs: Vec<CreateToiletRequest>) -> Result<Vec<ToiletLocation>> {
        for req in &reqs {
            validate_create(req)?;
        }
        if reqs.is_empty() {
            return Ok(Vec::new());
        }
        self.bounded("bulk_create", self.store.insert_bulk(reqs)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ToiletLocation>> {
        self.bounded("get", self.store.get(id)).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateToiletRequest,
    ) -> Result<Option<ToiletLocation>> {
        validate_update(&req)?;
        self.bounded("update", self.store.update(id, req)).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.bounded("delete", self.store.delete(id)).await
    }

    /// Page through records ordered by id.
    pub async fn list(&self, params: &ListParams) -> Result<Vec<ToiletLocation>> {
        params.validate()?;
        self.bounded("list", self.store.list(params.limit, params.offset))
            .await
    }

    pub async fn list_by_country(
        &self,
        country: CountryCode,
        limit: i64,
    ) -> Result<Vec<ToiletLocation>> {
        check_non_negative(limit, "limit")?;
        self.bounded("list_by_country", self.store.list_by_country(country, limit))
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        self.bounded("count", self.store.count()).await
    }

    // =========================================================================
    // IMPORT
    // =========================================================================

    /// Import a GeoJSON `FeatureCollection`.
    ///
    /// The whole payload is parsed first, so a malformed document writes
    /// nothing. Records are then inserted in batches; each batch is atomic,
    /// and batches committed before a failing one stay committed.
    #[instrument(skip(self, input, defaults), fields(
        subsystem = "search",
        component = "toilet_service",
        op = "import_geojson",
    ))]
    pub async fn import_geojson(
        &self,
        input: &str,
        defaults: &ImportDefaults,
    ) -> Result<ImportReport> {
        let start = Instant::now();
        let parsed = parse_feature_collection(input, defaults)?;
        let mut report = ImportReport {
            skipped: parsed.skipped,
            ..Default::default()
        };

        for batch in parsed.records.chunks(self.config.import_batch_size) {
            match self
                .bounded("import_geojson", self.store.insert_bulk(batch.to_vec()))
                .await
            {
                Ok(inserted) => {
                    report.inserted += inserted.len();
                    report.batches += 1;
                    debug!(
                        batch = report.batches,
                        result_count = inserted.len(),
                        "Imported batch"
                    );
                }
                Err(e) => {
                    error!(
                        inserted = report.inserted,
                        batches = report.batches,
                        error = %e,
                        "Import batch failed"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            batches = report.batches,
            duration_ms = start.elapsed().as_millis() as u64,
            "GeoJSON import complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.import_batch_size, 100);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        assert_eq!(ServiceConfig::new().import_batch_size(0).import_batch_size, 1);
    }

    #[test]
    fn test_check_non_negative() {
        assert!(check_non_negative(0, "limit").is_ok());
        assert!(check_non_negative(-3, "offset").unwrap_err().is_invalid_input());
    }
}
