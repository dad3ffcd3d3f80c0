use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::bench::{BenchSource, CompareEntry};
use crate::errors::BenchError;
use crate::types::OutputFormat;

/// Shared settings a suite file may declare. Each applies only where the
/// command line is silent; the usual flag defaults fill whatever remains.
#[derive(Debug, Clone, Default)]
pub struct SuiteDefaults {
    pub iterations: Option<u32>,
    pub warmup: Option<u32>,
    pub runs: Option<usize>,
    pub parallel: Option<usize>,
    pub track_heap: Option<bool>,
    pub track_db: Option<bool>,
    pub org: Option<String>,
    pub output: Option<OutputFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuite {
    iterations: Option<u32>,
    warmup: Option<u32>,
    runs: Option<usize>,
    parallel: Option<usize>,
    track_heap: Option<bool>,
    track_db: Option<bool>,
    org: Option<String>,
    output: Option<OutputFormat>,
    #[serde(default)]
    benchmarks: Vec<RawBenchmark>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBenchmark {
    name: String,
    code: Option<String>,
    file: Option<String>,
    #[serde(default)]
    setup: String,
    #[serde(default)]
    teardown: String,
}

/// A parsed and validated benchmark suite file.
#[derive(Debug, Clone)]
pub struct Suite {
    pub defaults: SuiteDefaults,
    pub entries: Vec<CompareEntry>,
}

/// Load a TOML suite file for `compare --config`. Every benchmark entry must
/// carry exactly one of `code` or `file`.
pub fn load(path: &Path) -> Result<Suite> {
    let text = std::fs::read_to_string(path).map_err(|err| BenchError::ConfigRead {
        path: path.to_path_buf(),
        source: err,
    })?;

    let raw: RawSuite = toml::from_str(&text).map_err(|err| BenchError::ConfigParse {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;

    let mut entries = Vec::with_capacity(raw.benchmarks.len());
    for bench in raw.benchmarks {
        let source = match (bench.code, bench.file) {
            (Some(code), None) => BenchSource::Inline(code),
            (None, Some(file)) => BenchSource::File(PathBuf::from(file)),
            _ => {
                return Err(BenchError::ConfigBenchSource {
                    name: bench.name,
                    path: path.to_path_buf(),
                }
                .into());
            }
        };
        entries.push(CompareEntry {
            name: bench.name,
            source,
            setup: bench.setup,
            teardown: bench.teardown,
        });
    }

    Ok(Suite {
        defaults: SuiteDefaults {
            iterations: raw.iterations,
            warmup: raw.warmup,
            runs: raw.runs,
            parallel: raw.parallel,
            track_heap: raw.track_heap,
            track_db: raw.track_db,
            org: raw.org,
            output: raw.output,
        },
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_suite(content: &str) -> (assert_fs::TempDir, PathBuf) {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("suite.toml");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn full_suite_parses() {
        let (_tmp, path) = write_suite(
            r#"
iterations = 200
warmup = 20
runs = 3
parallel = 2
track_heap = true
track_db = false
org = "dev-org"
output = "json"

[[benchmarks]]
name = "ListAdd"
code = "List<Integer> xs = new List<Integer>(); xs.add(1);"
setup = "Integer seed = 42;"

[[benchmarks]]
name = "FromFile"
file = "snippets/loop.apex"
"#,
        );
        let suite = load(&path).unwrap();
        assert_eq!(suite.defaults.iterations, Some(200));
        assert_eq!(suite.defaults.warmup, Some(20));
        assert_eq!(suite.defaults.runs, Some(3));
        assert_eq!(suite.defaults.parallel, Some(2));
        assert_eq!(suite.defaults.track_heap, Some(true));
        assert_eq!(suite.defaults.track_db, Some(false));
        assert_eq!(suite.defaults.org.as_deref(), Some("dev-org"));
        assert_eq!(suite.defaults.output, Some(OutputFormat::Json));

        assert_eq!(suite.entries.len(), 2);
        assert_eq!(suite.entries[0].name, "ListAdd");
        assert_eq!(suite.entries[0].setup, "Integer seed = 42;");
        assert!(matches!(suite.entries[0].source, BenchSource::Inline(_)));
        assert_eq!(
            suite.entries[1].source,
            BenchSource::File(PathBuf::from("snippets/loop.apex"))
        );
    }

    #[test]
    fn minimal_suite_leaves_defaults_unset() {
        let (_tmp, path) = write_suite(
            r#"
[[benchmarks]]
name = "A"
code = "Integer a = 1;"
"#,
        );
        let suite = load(&path).unwrap();
        assert_eq!(suite.defaults.iterations, None);
        assert_eq!(suite.defaults.output, None);
        assert_eq!(suite.entries.len(), 1);
        assert_eq!(suite.entries[0].setup, "");
        assert_eq!(suite.entries[0].teardown, "");
    }

    #[test]
    fn benchmark_with_both_code_and_file_is_rejected() {
        let (_tmp, path) = write_suite(
            r#"
[[benchmarks]]
name = "Broken"
code = "Integer a = 1;"
file = "a.apex"
"#,
        );
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("exactly one of code or file"));
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn benchmark_with_neither_code_nor_file_is_rejected() {
        let (_tmp, path) = write_suite(
            r#"
[[benchmarks]]
name = "Empty"
"#,
        );
        assert!(load(&path).is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let (_tmp, path) = write_suite("iterationss = 100\n");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load(Path::new("/nope/absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn invalid_output_value_is_rejected() {
        let (_tmp, path) = write_suite("output = \"csv\"\n");
        assert!(load(&path).is_err());
    }
}
