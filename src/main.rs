use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use apexbench::bench::{self, BenchOptions, CompareEntry};
use apexbench::config;
use apexbench::errors::BenchError;
use apexbench::executor::{self, SfCli};
use apexbench::reporter;
use apexbench::types::OutputFormat;

#[derive(Parser)]
#[command(
    name = "apexbench",
    version,
    about = "Benchmark Salesforce Apex code snippets without deployment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single benchmark
    Run(RunArgs),
    /// Compare multiple benchmarks side-by-side
    Compare(CompareArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Inline Apex code to benchmark
    #[arg(long)]
    code: Option<String>,

    /// Path to an Apex code file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Benchmark name
    #[arg(long, default_value = "Benchmark")]
    name: String,

    /// Number of measurement iterations
    #[arg(long, default_value_t = 100)]
    iterations: u32,

    /// Number of warmup iterations
    #[arg(long, default_value_t = 10)]
    warmup: u32,

    /// Number of complete runs for aggregation
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Maximum concurrent executions
    #[arg(long, default_value_t = 1)]
    parallel: usize,

    /// Enable heap usage tracking
    #[arg(long)]
    track_heap: bool,

    /// Enable DML/SOQL tracking
    #[arg(long)]
    track_db: bool,

    /// Target Salesforce org (uses the default org if not specified)
    #[arg(long, default_value = "")]
    org: String,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Args)]
struct CompareArgs {
    /// Benchmark to compare, as "Name:code" or "Name:path/to/file.apex" (repeatable)
    #[arg(long = "bench")]
    bench: Vec<String>,

    /// Benchmark suite file (TOML); its entries follow the --bench entries
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of measurement iterations
    #[arg(long)]
    iterations: Option<u32>,

    /// Number of warmup iterations
    #[arg(long)]
    warmup: Option<u32>,

    /// Number of complete runs for aggregation
    #[arg(long)]
    runs: Option<usize>,

    /// Maximum concurrent executions
    #[arg(long)]
    parallel: Option<usize>,

    /// Enable heap usage tracking
    #[arg(long)]
    track_heap: bool,

    /// Enable DML/SOQL tracking
    #[arg(long)]
    track_db: bool,

    /// Target Salesforce org (uses the default org if not specified)
    #[arg(long)]
    org: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    output: Option<OutputFormat>,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Compare(args) => compare_command(args),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

/// Resolve the org and verify the environment, printing a note when the
/// ambient default org is used.
fn prepare_org(specified: &str) -> Result<String> {
    executor::check_cli()?;
    let org = executor::resolve_org(specified)?;
    if specified.is_empty() {
        eprintln!("Using default org: {org}");
    }
    executor::check_org_auth(&org)?;
    Ok(org)
}

fn run_command(args: RunArgs) -> Result<()> {
    let user_code = match (&args.code, &args.file) {
        (Some(_), Some(_)) => anyhow::bail!("cannot provide both --code and --file"),
        (None, None) => anyhow::bail!("must provide either --code or --file"),
        (Some(code), None) => code.clone(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|err| BenchError::FileRead {
                path: path.clone(),
                source: err,
            })?
        }
    };

    let org = prepare_org(&args.org)?;

    let opts = BenchOptions {
        iterations: args.iterations,
        warmup: args.warmup,
        runs: args.runs,
        parallel: args.parallel,
        track_heap: args.track_heap,
        track_db: args.track_db,
        org,
    };
    let spec = bench::build_spec(&args.name, &user_code, "", "", &opts);

    if opts.runs == 1 {
        eprintln!("Executing benchmark (1 run)...");
    } else {
        eprintln!(
            "Executing benchmark ({} runs, {} parallel)...",
            opts.runs, opts.parallel
        );
    }

    let aggregated = bench::run_benchmark(&SfCli::new(), &spec, &opts)?;

    eprintln!();
    let mut stdout = io::stdout().lock();
    match args.output {
        OutputFormat::Json => reporter::write_json(&aggregated, &mut stdout),
        OutputFormat::Table => reporter::write_table(&aggregated, &mut stdout),
    }
}

fn compare_command(args: CompareArgs) -> Result<()> {
    let mut entries: Vec<CompareEntry> = args
        .bench
        .iter()
        .map(|arg| bench::parse_bench_arg(arg))
        .collect::<Result<_>>()?;

    let suite = args.config.as_deref().map(config::load).transpose()?;
    if let Some(suite) = &suite {
        entries.extend(suite.entries.iter().cloned());
    }

    if entries.len() < 2 {
        anyhow::bail!("must provide at least 2 benchmarks to compare");
    }

    let defaults = suite.map(|s| s.defaults).unwrap_or_default();

    let org_flag = args.org.or(defaults.org).unwrap_or_default();
    let org = prepare_org(&org_flag)?;

    let opts = BenchOptions {
        iterations: args.iterations.or(defaults.iterations).unwrap_or(100),
        warmup: args.warmup.or(defaults.warmup).unwrap_or(10),
        runs: args.runs.or(defaults.runs).unwrap_or(1),
        parallel: args.parallel.or(defaults.parallel).unwrap_or(1),
        track_heap: args.track_heap || defaults.track_heap.unwrap_or(false),
        track_db: args.track_db || defaults.track_db.unwrap_or(false),
        org,
    };
    let output = args
        .output
        .or(defaults.output)
        .unwrap_or(OutputFormat::Table);

    let results = bench::compare_benchmarks(&SfCli::new(), &entries, &opts)?;

    eprintln!();
    let mut stdout = io::stdout().lock();
    match output {
        OutputFormat::Json => reporter::write_json(&results, &mut stdout),
        OutputFormat::Table => reporter::write_comparison(&results, &mut stdout),
    }
}
