use anyhow::Result;

use crate::errors::BenchError;
use crate::types::{AggregatedResult, RunResult};

/// Combine per-run results into summary statistics.
///
/// Mean and standard deviation are computed over each run's *average* values;
/// min and max are taken over each run's own min and max. Name and iteration
/// count come from the first result.
pub fn aggregate(results: &[RunResult]) -> Result<AggregatedResult> {
    let first = results.first().ok_or(BenchError::EmptyResults)?;

    let cpu_avgs: Vec<f64> = results.iter().map(|r| r.avg_cpu_ms).collect();
    let wall_avgs: Vec<f64> = results.iter().map(|r| r.avg_wall_ms).collect();

    Ok(AggregatedResult {
        name: first.name.clone(),
        runs: results.len(),
        iterations: first.iterations,
        warmup: 0,
        avg_cpu_ms: mean(&cpu_avgs),
        std_dev_cpu_ms: std_dev(&cpu_avgs),
        min_cpu_ms: fold_min(results.iter().map(|r| r.min_cpu_ms)),
        max_cpu_ms: fold_max(results.iter().map(|r| r.max_cpu_ms)),
        avg_wall_ms: mean(&wall_avgs),
        std_dev_wall_ms: std_dev(&wall_avgs),
        min_wall_ms: fold_min(results.iter().map(|r| r.min_wall_ms)),
        max_wall_ms: fold_max(results.iter().map(|r| r.max_wall_ms)),
        raw_results: results.to_vec(),
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N, not N-1).
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn fold_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn fold_max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}
