use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("benchmark code cannot be empty")]
    EmptyCode,

    #[error("benchmark name cannot be empty")]
    EmptyName,

    #[error("iterations must be positive, got {got}")]
    InvalidIterations { got: u32 },

    #[error("runs must be positive, got {got}")]
    InvalidRuns { got: usize },

    #[error(
        "sf CLI not found or not working: {detail}\nPlease install the Salesforce CLI: https://developer.salesforce.com/tools/salesforcecli"
    )]
    CliUnavailable { detail: String },

    #[error("no default org configured. Run: sf org login web")]
    NoDefaultOrg,

    #[error("org \"{org}\" is not connected (status: {status})")]
    OrgNotConnected { org: String, status: String },

    #[error("apex compile failed: {problem}")]
    CompileFailed { problem: String },

    #[error("apex runtime exception: {message}")]
    RuntimeException { message: String },

    #[error("sf apex run failed ({detail})\nOutput: {output}")]
    ExecutionFailed { detail: String, output: String },

    #[error("execution errors:\n{summary}")]
    ParallelFailures { summary: String },

    #[error("could not find valid BENCH_RESULT JSON in output.\n\nOutput:\n{output}")]
    MarkerNotFound { output: String },

    #[error("failed to parse some results:\n{summary}")]
    ParseFailures { summary: String },

    #[error("cannot aggregate empty results")]
    EmptyResults,

    #[error("no results to display")]
    EmptyComparison,

    #[error("invalid benchmark format {arg:?}, expected \"Name:code\" or \"Name:file\"")]
    InvalidBenchArg { arg: String },

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("benchmark {name:?} in {path} must set exactly one of code or file")]
    ConfigBenchSource { name: String, path: PathBuf },
}
