use std::io::Write as _;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::errors::BenchError;

/// Runs generated Apex against an org. The trait is the seam that lets the
/// command pipeline run against a scripted fake in tests.
pub trait ApexRunner: Sync {
    /// Execute the code once and return the raw log output.
    fn run(&self, apex_code: &str, org: &str) -> Result<String>;

    /// Execute the same code `runs` times with at most `max_concurrent`
    /// invocations in flight (`0` is treated as `1`).
    ///
    /// Results are ordered by run index, not completion order. Every run is
    /// allowed to finish before failures are reported; the error lists each
    /// failing run with its 1-based number.
    fn run_parallel(
        &self,
        apex_code: &str,
        runs: usize,
        max_concurrent: usize,
        org: &str,
    ) -> Result<Vec<String>> {
        if runs == 0 {
            return Err(BenchError::InvalidRuns { got: 0 }.into());
        }
        let workers = max_concurrent.max(1).min(runs);

        let mut slots: Vec<Option<Result<String>>> = Vec::with_capacity(runs);
        slots.resize_with(runs, || None);

        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        // Fixed worker gate: `workers` threads pull run indices from a shared
        // counter, so at most `workers` subprocesses are in flight. Each
        // outcome lands in its own slot, keyed by run index.
        thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                s.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= runs {
                            break;
                        }
                        let outcome = self.run(apex_code, org);
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);
            for (index, outcome) in rx {
                slots[index] = Some(outcome);
            }
        });

        let mut results = Vec::with_capacity(runs);
        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(output)) => results.push(output),
                Some(Err(err)) => failures.push(format!("run {}: {err:#}", index + 1)),
                None => failures.push(format!("run {}: no output produced", index + 1)),
            }
        }
        if !failures.is_empty() {
            return Err(BenchError::ParallelFailures {
                summary: failures.join("\n"),
            }
            .into());
        }
        Ok(results)
    }
}

/// JSON envelope `sf` prints with `--json`.
#[derive(Debug, Deserialize)]
struct SfEnvelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApexRunOutcome {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    compiled: bool,
    compile_problem: Option<String>,
    exception_message: Option<String>,
    logs: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigEntry {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgDisplay {
    connected_status: Option<String>,
}

/// Production runner backed by the Salesforce CLI.
pub struct SfCli;

impl SfCli {
    pub fn new() -> Self {
        SfCli
    }
}

impl Default for SfCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ApexRunner for SfCli {
    fn run(&self, apex_code: &str, org: &str) -> Result<String> {
        // The temp file is removed on drop, on success and failure alike.
        let mut file = tempfile::Builder::new()
            .prefix("apexbench-")
            .suffix(".apex")
            .tempfile()
            .context("failed to create temp file")?;
        file.write_all(apex_code.as_bytes())
            .context("failed to write temp file")?;
        file.flush().context("failed to write temp file")?;

        let mut cmd = Command::new("sf");
        cmd.args(["apex", "run", "--file"])
            .arg(file.path())
            .arg("--json");
        if !org.is_empty() {
            cmd.args(["--target-org", org]);
        }
        let output = cmd.output().context("failed to run sf apex run")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{stdout}{stderr}");

        // With --json the envelope carries the failure detail regardless of
        // exit status: a compile problem and a runtime exception are distinct
        // failures, and the log text only exists on success.
        if let Ok(envelope) = serde_json::from_str::<SfEnvelope<ApexRunOutcome>>(stdout.trim())
            && let Some(outcome) = envelope.result
        {
            if !outcome.compiled {
                return Err(BenchError::CompileFailed {
                    problem: outcome
                        .compile_problem
                        .unwrap_or_else(|| "unknown compile problem".to_string()),
                }
                .into());
            }
            if !outcome.success {
                return Err(BenchError::RuntimeException {
                    message: outcome
                        .exception_message
                        .unwrap_or_else(|| "unknown exception".to_string()),
                }
                .into());
            }
            return Ok(outcome.logs.unwrap_or(combined));
        }

        if !output.status.success() {
            return Err(BenchError::ExecutionFailed {
                detail: output.status.to_string(),
                output: combined,
            }
            .into());
        }

        Ok(combined)
    }
}

/// Verify the Salesforce CLI is installed and answering.
pub fn check_cli() -> Result<()> {
    let output = Command::new("sf")
        .arg("--version")
        .output()
        .map_err(|err| BenchError::CliUnavailable {
            detail: err.to_string(),
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() || !text.contains("@salesforce/cli") {
        return Err(BenchError::CliUnavailable {
            detail: format!("unexpected version output: {}", text.trim()),
        }
        .into());
    }
    Ok(())
}

/// Read the configured default org from `sf config get target-org`.
pub fn default_org() -> Result<String> {
    let output = Command::new("sf")
        .args(["config", "get", "target-org", "--json"])
        .output()
        .context("failed to get default org")?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let envelope: SfEnvelope<Vec<ConfigEntry>> = serde_json::from_str(stdout.trim())
        .map_err(|err| anyhow::anyhow!("failed to parse config output: {err}"))?;

    let value = envelope
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|entry| entry.value)
        .unwrap_or_default();

    if value.is_empty() || value == "null" {
        return Err(BenchError::NoDefaultOrg.into());
    }
    Ok(value)
}

/// The specified org when non-empty, the configured default otherwise.
pub fn resolve_org(specified: &str) -> Result<String> {
    if !specified.is_empty() {
        return Ok(specified.to_string());
    }
    default_org().context("no org specified and could not get default org")
}

/// Verify the org is reachable and authenticated. Only an explicit
/// `connectedStatus` of "Connected" passes; a missing result counts as
/// not connected.
pub fn check_org_auth(org: &str) -> Result<()> {
    let mut cmd = Command::new("sf");
    cmd.args(["org", "display", "--json"]);
    if !org.is_empty() {
        cmd.args(["--target-org", org]);
    }
    let output = cmd.output().context("failed to run sf org display")?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let status = serde_json::from_str::<SfEnvelope<OrgDisplay>>(stdout.trim())
        .ok()
        .and_then(|envelope| envelope.result)
        .and_then(|display| display.connected_status)
        .unwrap_or_default();

    if status != "Connected" {
        return Err(BenchError::OrgNotConnected {
            org: org.to_string(),
            status: if status.is_empty() {
                "unknown".to_string()
            } else {
                status
            },
        }
        .into());
    }
    Ok(())
}
