//! Toilet repository on PostgreSQL + PostGIS.
//!
//! Every operation runs in its own transaction with `statement_timeout` set,
//! and `search_path` set when the repository is scoped to a schema other than
//! `public`. Geometry is written from [`radar_core::geometry_sync`] in the
//! same statement as the coordinates it was derived from.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use radar_core::defaults::SRID;
use radar_core::geometry_sync::{apply_update, materialize, validate_update};
use radar_core::{
    plan_fetch, BoundingBox, CountryCode, CreateToiletRequest, DeterministicFetch, Error,
    FetchStrategy, GeoPoint, NearbyToilet, Result, ToiletLocation, ToiletStore, ToiletSummary,
    UpdateToiletRequest, COUNTRY_INFERENCE_K,
};

use crate::config::{DEFAULT_SCHEMA, DEFAULT_STATEMENT_TIMEOUT_MS};
use crate::schema_validation::validate_schema_name;

/// Columns selected for a full record. Geometry is read back as its
/// coordinates so no PostGIS type mapping is needed.
const TOILET_COLUMNS: &str = "id, name, lat, lng, accessible, open_hours, address, rating, \
     is_free, type, status, notes, city, country_code, created_at, \
     ST_Y(geom) AS geom_lat, ST_X(geom) AS geom_lng";

const SUMMARY_COLUMNS: &str = "id, name, lat, lng, accessible, open_hours, address, created_at";

/// Point expression in the table SRID for parameters `$lat`/`$lng`.
fn point_expr(lat: usize, lng: usize) -> String {
    format!("ST_SetSRID(ST_MakePoint(${}, ${}), {})", lng, lat, SRID)
}

/// Geometry expression for parameters `$lat`/`$lng` holding the derived point.
fn geom_expr(lat: usize, lng: usize) -> String {
    format!(
        "CASE WHEN ${lat}::float8 IS NULL OR ${lng}::float8 IS NULL THEN NULL \
         ELSE {point} END",
        lat = lat,
        lng = lng,
        point = point_expr(lat, lng)
    )
}

/// Radius query over `$1` lat, `$2` lng, `$3` meters, `$4` limit.
///
/// The `ST_DWithin` predicate is on `geom::geography` so that it can use the
/// `idx_toilet_location_geog` expression index.
pub fn nearest_sql() -> String {
    let center = point_expr(1, 2);
    format!(
        "SELECT {columns}, \
         ST_Distance(geom::geography, {center}::geography) AS distance \
         FROM toilet_location \
         WHERE geom IS NOT NULL \
           AND ST_DWithin(geom::geography, {center}::geography, $3) \
         ORDER BY distance, geom <-> {center} \
         LIMIT $4",
        columns = TOILET_COLUMNS,
        center = center
    )
}

fn row_to_location(row: &PgRow) -> Result<ToiletLocation> {
    let geom_lat: Option<f64> = row.try_get("geom_lat")?;
    let geom_lng: Option<f64> = row.try_get("geom_lng")?;
    Ok(ToiletLocation {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        accessible: row.try_get("accessible")?,
        open_hours: row.try_get("open_hours")?,
        address: row.try_get("address")?,
        rating: row.try_get("rating")?,
        is_free: row.try_get("is_free")?,
        kind: row.try_get("type")?,
        status: row.try_get("status")?,
        notes: row.try_get("notes")?,
        city: row.try_get("city")?,
        country_code: row.try_get("country_code")?,
        created_at: row.try_get("created_at")?,
        geom: match (geom_lat, geom_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
    })
}

fn row_to_summary(row: &PgRow) -> Result<ToiletSummary> {
    Ok(ToiletSummary {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        accessible: row.try_get("accessible")?,
        open_hours: row.try_get("open_hours")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}

fn check_limit(limit: i64, what: &str) -> Result<()> {
    if limit < 0 {
        return Err(Error::InvalidInput(format!(
            "{} must be non-negative, got {}",
            what, limit
        )));
    }
    Ok(())
}

/// PostgreSQL toilet repository.
#[derive(Clone)]
pub struct PgToiletRepository {
    pool: Pool<Postgres>,
    schema: String,
    statement_timeout: Duration,
}

impl PgToiletRepository {
    /// Repository on the `public` schema with the default statement timeout.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            schema: DEFAULT_SCHEMA.to_string(),
            statement_timeout: Duration::from_millis(DEFAULT_STATEMENT_TIMEOUT_MS),
        }
    }

    /// Repository scoped to `schema`, with `statement_timeout` applied to
    /// every transaction.
    pub fn scoped(
        pool: Pool<Postgres>,
        schema: impl Into<String>,
        statement_timeout: Duration,
    ) -> Result<Self> {
        let schema = schema.into();
        validate_schema_name(&schema)?;
        Ok(Self {
            pool,
            schema,
            statement_timeout,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Begin a transaction with timeout and search_path applied.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.begin_scoped(false).await
    }

    /// Begin a read-only transaction whose statements share one snapshot.
    pub async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>> {
        self.begin_scoped(true).await
    }

    async fn begin_scoped(&self, snapshot: bool) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;

        if snapshot {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;
        }

        let timeout_ms = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout_ms))
            .execute(&mut *tx)
            .await?;

        if self.schema != DEFAULT_SCHEMA {
            // Identifier validated in `scoped`.
            sqlx::query(&format!("SET LOCAL search_path TO {}, public", self.schema))
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }

    /// Insert a materialized record within an existing transaction.
    ///
    /// `created_at` is assigned by the database.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &ToiletLocation,
    ) -> Result<ToiletLocation> {
        let sql = format!(
            "INSERT INTO toilet_location \
             (id, name, lat, lng, accessible, open_hours, address, rating, is_free, \
              type, status, notes, city, country_code, geom) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, {}) \
             RETURNING {}",
            geom_expr(15, 16),
            TOILET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(record.lat)
            .bind(record.lng)
            .bind(record.accessible)
            .bind(&record.open_hours)
            .bind(&record.address)
            .bind(record.rating)
            .bind(record.is_free)
            .bind(&record.kind)
            .bind(&record.status)
            .bind(&record.notes)
            .bind(&record.city)
            .bind(record.country_code)
            .bind(record.geom.map(|p| p.lat))
            .bind(record.geom.map(|p| p.lng))
            .fetch_one(&mut **tx)
            .await?;
        row_to_location(&row)
    }

    /// Fetch and lock a record for a read-modify-write.
    pub async fn get_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<ToiletLocation>> {
        let sql = format!(
            "SELECT {} FROM toilet_location WHERE id = $1 FOR UPDATE",
            TOILET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        row.as_ref().map(row_to_location).transpose()
    }

    /// Write every mutable column of `record` within an existing transaction.
    pub async fn write_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &ToiletLocation,
    ) -> Result<ToiletLocation> {
        let sql = format!(
            "UPDATE toilet_location SET \
             name = $2, lat = $3, lng = $4, accessible = $5, open_hours = $6, \
             address = $7, rating = $8, is_free = $9, type = $10, status = $11, \
             notes = $12, city = $13, country_code = $14, geom = {} \
             WHERE id = $1 RETURNING {}",
            geom_expr(15, 16),
            TOILET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.name)
            .bind(record.lat)
            .bind(record.lng)
            .bind(record.accessible)
            .bind(&record.open_hours)
            .bind(&record.address)
            .bind(record.rating)
            .bind(record.is_free)
            .bind(&record.kind)
            .bind(&record.status)
            .bind(&record.notes)
            .bind(&record.city)
            .bind(record.country_code)
            .bind(record.geom.map(|p| p.lat))
            .bind(record.geom.map(|p| p.lng))
            .fetch_one(&mut **tx)
            .await?;
        row_to_location(&row)
    }

    /// Country codes of the located records nearest `center`, in index
    /// traversal order.
    pub async fn nearest_countries_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        center: GeoPoint,
    ) -> Result<Vec<CountryCode>> {
        let sql = format!(
            "SELECT country_code FROM toilet_location \
             WHERE geom IS NOT NULL AND country_code IS NOT NULL \
             ORDER BY geom <-> {} \
             LIMIT $3",
            point_expr(1, 2)
        );
        let codes: Vec<CountryCode> = sqlx::query_scalar(&sql)
        .bind(center.lat)
        .bind(center.lng)
        .bind(COUNTRY_INFERENCE_K as i64)
        .fetch_all(&mut **tx)
        .await?;
        Ok(codes)
    }
}

#[async_trait]
impl ToiletStore for PgToiletRepository {
    async fn insert(&self, req: CreateToiletRequest) -> Result<ToiletLocation> {
        let record = materialize(req, Utc::now())?;
        let mut tx = self.begin().await?;
        let inserted = self.insert_tx(&mut tx, &record).await?;
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "toilets",
            op = "insert",
            toilet_id = %inserted.id,
            located = inserted.geom.is_some(),
            "Inserted toilet"
        );
        Ok(inserted)
    }

    async fn insert_bulk(&self, reqs: Vec<CreateToiletRequest>) -> Result<Vec<ToiletLocation>> {
        let now = Utc::now();
        let records = reqs
            .into_iter()
            .map(|req| materialize(req, now))
            .collect::<Result<Vec<_>>>()?;

        // Dropping the transaction on error rolls back every row.
        let mut tx = self.begin().await?;
        let mut inserted = Vec::with_capacity(records.len());
        for record in &records {
            inserted.push(self.insert_tx(&mut tx, record).await?);
        }
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "toilets",
            op = "insert_bulk",
            result_count = inserted.len(),
            "Inserted toilets"
        );
        Ok(inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ToiletLocation>> {
        let sql = format!("SELECT {} FROM toilet_location WHERE id = $1", TOILET_COLUMNS);
        let mut tx = self.begin().await?;
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        row.as_ref().map(row_to_location).transpose()
    }

    async fn update(&self, id: Uuid, req: UpdateToiletRequest) -> Result<Option<ToiletLocation>> {
        validate_update(&req)?;

        let mut tx = self.begin().await?;
        let Some(mut current) = self.get_for_update_tx(&mut tx, id).await? else {
            return Ok(None);
        };
        let resynced = apply_update(&mut current, req)?;
        let updated = self.write_tx(&mut tx, &current).await?;
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "toilets",
            op = "update",
            toilet_id = %id,
            resynced,
            "Updated toilet"
        );
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.begin().await?;
        let result = sqlx::query("DELETE FROM toilet_location WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ToiletLocation>> {
        check_limit(limit, "limit")?;
        check_limit(offset, "offset")?;
        let sql = format!(
            "SELECT {} FROM toilet_location ORDER BY id LIMIT $1 OFFSET $2",
            TOILET_COLUMNS
        );
        let mut tx = self.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        rows.iter().map(row_to_location).collect()
    }

    async fn list_by_country(
        &self,
        country: CountryCode,
        limit: i64,
    ) -> Result<Vec<ToiletLocation>> {
        check_limit(limit, "limit")?;
        let sql = format!(
            "SELECT {} FROM toilet_location WHERE country_code = $1 ORDER BY id LIMIT $2",
            TOILET_COLUMNS
        );
        let mut tx = self.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(country)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        rows.iter().map(row_to_location).collect()
    }

    async fn count(&self) -> Result<i64> {
        let mut tx = self.begin().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM toilet_location")
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(count)
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
        check_limit(limit, "result_limit")?;

        let sql = nearest_sql();
        let mut tx = self.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(center.lat)
            .bind(center.lng)
            .bind(radius_meters)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.iter()
            .map(|row| {
                let location = row_to_location(row)?;
                let distance: Option<f64> = row.try_get("distance")?;
                Ok(NearbyToilet::from_location(&location, distance))
            })
            .collect()
    }

    async fn within_bounds(&self, bounds: BoundingBox, limit: i64) -> Result<Vec<ToiletSummary>> {
        check_limit(limit, "max_results")?;
        let sql = format!(
            "SELECT {} FROM toilet_location \
             WHERE geom && ST_MakeEnvelope($1, $2, $3, $4, {}) \
             LIMIT $5",
            SUMMARY_COLUMNS, SRID
        );
        let mut tx = self.begin().await?;
        let rows = sqlx::query(&sql)
            .bind(bounds.min_lng)
            .bind(bounds.min_lat)
            .bind(bounds.max_lng)
            .bind(bounds.max_lat)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn fetch_deterministic(
        &self,
        center: GeoPoint,
        is_zoomed_in: bool,
        limit: i64,
    ) -> Result<DeterministicFetch> {
        check_limit(limit, "result_limit")?;

        // Inference and fetch must see the same data.
        let mut tx = self.begin_snapshot().await?;

        let nearest_codes = self.nearest_countries_tx(&mut tx, center).await?;
        let plan = plan_fetch(&nearest_codes, center, is_zoomed_in, limit);
        let country = plan.country();
        if plan.inference.is_fallback() {
            warn!(
                subsystem = "database",
                component = "toilets",
                op = "fetch_deterministic",
                country_code = %country,
                inference_fallback = true,
                "Could not infer country from map center, using fallback country"
            );
        } else {
            debug!(
                subsystem = "database",
                component = "toilets",
                op = "fetch_deterministic",
                country_code = %country,
                candidates = nearest_codes.len(),
                "Inferred country from map center"
            );
        }

        let rows = match plan.strategy {
            FetchStrategy::ByDistance => {
                let sql = format!(
                    "SELECT {} FROM toilet_location \
                     WHERE geom IS NOT NULL AND country_code = $1 \
                     ORDER BY geom <-> {} \
                     LIMIT $4",
                    SUMMARY_COLUMNS,
                    point_expr(2, 3)
                );
                sqlx::query(&sql)
                    .bind(country)
                    .bind(center.lat)
                    .bind(center.lng)
                    .bind(limit)
                    .fetch_all(&mut *tx)
                    .await?
            }
            FetchStrategy::ById => {
                let sql = format!(
                    "SELECT {} FROM toilet_location \
                     WHERE geom IS NOT NULL AND country_code = $1 \
                     ORDER BY id \
                     LIMIT $2",
                    SUMMARY_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(country)
                    .bind(limit)
                    .fetch_all(&mut *tx)
                    .await?
            }
        };
        tx.commit().await?;

        let toilets = rows.iter().map(row_to_summary).collect::<Result<Vec<_>>>()?;
        debug!(
            subsystem = "database",
            component = "toilets",
            op = "fetch_deterministic",
            strategy = plan.strategy.as_str(),
            result_count = toilets.len(),
            "Deterministic fetch complete"
        );
        Ok(DeterministicFetch { plan, toilets })
    }
}
