use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Literal prefix the generated Apex emits before the result JSON payload.
/// The payload's opening brace follows the colon with nothing in between.
pub const RESULT_MARKER: &str = "BENCH_RESULT:";

/// Input for code generation. Validated before use; immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct CodeSpec {
    pub name: String,
    pub user_code: String,
    pub setup: String,
    pub teardown: String,
    pub iterations: u32,
    pub warmup: u32,
    pub track_heap: bool,
    pub track_db: bool,
}

/// One benchmark run's measurements, decoded from the marker payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub name: String,
    pub iterations: u32,
    pub avg_wall_ms: f64,
    pub avg_cpu_ms: f64,
    pub min_wall_ms: f64,
    pub max_wall_ms: f64,
    pub min_cpu_ms: f64,
    pub max_cpu_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heap_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_heap_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heap_kb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dml_statements: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soql_queries: Option<i64>,
}

/// Statistics over multiple runs of one benchmark.
///
/// `warmup` is not part of a `RunResult`; the aggregator leaves it at 0 and
/// the caller overwrites it from the spec.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub name: String,
    pub runs: usize,
    pub iterations: u32,
    pub warmup: u32,
    pub avg_cpu_ms: f64,
    pub std_dev_cpu_ms: f64,
    pub min_cpu_ms: f64,
    pub max_cpu_ms: f64,
    pub avg_wall_ms: f64,
    pub std_dev_wall_ms: f64,
    pub min_wall_ms: f64,
    pub max_wall_ms: f64,
    #[serde(rename = "raw", skip_serializing_if = "Vec::is_empty")]
    pub raw_results: Vec<RunResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Table,
}
