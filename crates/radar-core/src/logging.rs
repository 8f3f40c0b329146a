//! Structured logging field names shared by every radar crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), imports |
//! | DEBUG | Decision points, query plans, config choices |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "database", "index", "search", "import"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "toilets", "service", "rtree"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "find_nearest", "find_in_view", "find_deterministic"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Toilet UUID being operated on.
pub const TOILET_ID: &str = "toilet_id";

/// Country code inferred or filtered on.
pub const COUNTRY_CODE: &str = "country_code";

// ─── Query fields ──────────────────────────────────────────────────────────

/// Search radius in meters.
pub const RADIUS_METERS: &str = "radius_m";

/// Result cap requested by the caller.
pub const RESULT_LIMIT: &str = "limit";

/// Ordering strategy of a deterministic fetch ("by_distance", "by_id").
pub const STRATEGY: &str = "strategy";

/// Whether the inferred country came from the fallback path.
pub const INFERENCE_FALLBACK: &str = "inference_fallback";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Database schema a transaction is scoped to.
pub const DB_SCHEMA: &str = "db_schema";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
