use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::BenchError;
use crate::executor::ApexRunner;
use crate::generator;
use crate::parser;
use crate::stats;
use crate::types::{AggregatedResult, CodeSpec};

/// Knobs shared by every benchmark in an invocation. Built once from the
/// command line (and suite config) and passed down; no global state.
#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub iterations: u32,
    pub warmup: u32,
    pub runs: usize,
    pub parallel: usize,
    pub track_heap: bool,
    pub track_db: bool,
    pub org: String,
}

/// Where a benchmark's code comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchSource {
    Inline(String),
    File(PathBuf),
}

/// One entry of a comparison: a name plus its unresolved source.
#[derive(Debug, Clone)]
pub struct CompareEntry {
    pub name: String,
    pub source: BenchSource,
    pub setup: String,
    pub teardown: String,
}

/// Split a `--bench` argument on its first colon into name and source.
pub fn parse_bench_arg(arg: &str) -> Result<CompareEntry> {
    let Some((name, source)) = arg.split_once(':') else {
        return Err(BenchError::InvalidBenchArg {
            arg: arg.to_string(),
        }
        .into());
    };

    Ok(CompareEntry {
        name: name.trim().to_string(),
        source: classify_source(source.trim()),
        setup: String::new(),
        teardown: String::new(),
    })
}

/// A source ending in `.apex` or naming an existing file is read from disk;
/// anything else is inline code. A short snippet that happens to match an
/// existing filename is treated as a file.
pub fn classify_source(source: &str) -> BenchSource {
    if source.ends_with(".apex") || Path::new(source).is_file() {
        BenchSource::File(PathBuf::from(source))
    } else {
        BenchSource::Inline(source.to_string())
    }
}

pub fn load_source(source: &BenchSource) -> Result<String> {
    match source {
        BenchSource::Inline(code) => Ok(code.clone()),
        BenchSource::File(path) => {
            std::fs::read_to_string(path).map_err(|err| {
                BenchError::FileRead {
                    path: path.clone(),
                    source: err,
                }
                .into()
            })
        }
    }
}

pub fn build_spec(
    name: &str,
    user_code: &str,
    setup: &str,
    teardown: &str,
    opts: &BenchOptions,
) -> CodeSpec {
    CodeSpec {
        name: name.to_string(),
        user_code: user_code.trim().to_string(),
        setup: setup.to_string(),
        teardown: teardown.to_string(),
        iterations: opts.iterations,
        warmup: opts.warmup,
        track_heap: opts.track_heap,
        track_db: opts.track_db,
    }
}

/// The full pipeline for one benchmark: generate, execute (single or
/// parallel), parse every output, aggregate, stamp the warmup count.
pub fn run_benchmark(
    runner: &impl ApexRunner,
    spec: &CodeSpec,
    opts: &BenchOptions,
) -> Result<AggregatedResult> {
    let apex_code = generator::generate(spec)
        .with_context(|| format!("failed to generate code for {}", spec.name))?;

    let outputs = if opts.runs == 1 {
        vec![
            runner
                .run(&apex_code, &opts.org)
                .with_context(|| format!("execution failed for {}", spec.name))?,
        ]
    } else {
        runner
            .run_parallel(&apex_code, opts.runs, opts.parallel, &opts.org)
            .with_context(|| format!("execution failed for {}", spec.name))?
    };

    let results = parser::parse_all(&outputs)
        .with_context(|| format!("failed to parse results for {}", spec.name))?;

    let mut aggregated = stats::aggregate(&results)?;
    aggregated.warmup = spec.warmup;
    Ok(aggregated)
}

/// Run every comparison entry through the pipeline, in order, with progress
/// on stderr. The first failing entry aborts the comparison.
pub fn compare_benchmarks(
    runner: &impl ApexRunner,
    entries: &[CompareEntry],
    opts: &BenchOptions,
) -> Result<Vec<AggregatedResult>> {
    let mut aggregated = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        eprintln!(
            "\n[{}/{}] Running benchmark: {}",
            i + 1,
            entries.len(),
            entry.name
        );

        let user_code = load_source(&entry.source)?;
        let spec = build_spec(&entry.name, &user_code, &entry.setup, &entry.teardown, opts);
        let result = run_benchmark(runner, &spec, opts)?;

        eprintln!("  Completed: avg CPU {:.3} ms", result.avg_cpu_ms);
        aggregated.push(result);
    }

    Ok(aggregated)
}
