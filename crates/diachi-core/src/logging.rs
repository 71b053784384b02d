//! Structured logging schema and field name constants for diachi.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, store load), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (n-grams, potentials) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one parse request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "engine", "store", "db", "geocode"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "token_index", "pool", "goong"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "parse", "load", "geocode"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Raw address text being parsed (truncate before logging at INFO+).
pub const ADDRESS: &str = "address";

/// Caller-supplied province hint (normalized).
pub const PROVINCE_HINT: &str = "province_hint";

/// Caller-supplied district hint (normalized).
pub const DISTRICT_HINT: &str = "district_hint";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items produced by a stage (rows, potentials, candidates).
pub const RESULT_COUNT: &str = "result_count";

/// Number of hierarchy rows loaded into the reference store.
pub const ROW_COUNT: &str = "row_count";

/// Number of distinct tokens in an index.
pub const TOKEN_COUNT: &str = "token_count";

// ─── Pipeline fields ───────────────────────────────────────────────────────

/// Pipeline phase name ("preprocess", "extract", "assemble", "rank",
/// "postprocess").
pub const PHASE: &str = "phase";

/// Final confidence of the chosen candidate.
pub const CONFIDENCE: &str = "confidence";

/// Match type of the chosen candidate.
pub const MATCH_TYPE: &str = "match_type";

/// Quality flag of the emitted result.
pub const QUALITY_FLAG: &str = "quality_flag";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Database table affected.
pub const DB_TABLE: &str = "db_table";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
