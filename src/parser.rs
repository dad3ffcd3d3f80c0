use anyhow::Result;

use crate::errors::BenchError;
use crate::types::{RESULT_MARKER, RunResult};

/// Extract a benchmark result from raw `sf apex run` log output.
///
/// Every marker occurrence is tried in order; the first one whose payload
/// decodes as a `RunResult` wins. Occurrences with malformed payloads are
/// skipped, so stray debug lines mentioning the marker do not poison a run.
pub fn parse_result(output: &str) -> Result<RunResult> {
    let mut search = 0;
    while let Some(found) = output[search..].find(RESULT_MARKER) {
        let json_start = search + found + RESULT_MARKER.len();

        if let Some(candidate) = json_candidate(&output[json_start..])
            && let Ok(result) = serde_json::from_str::<RunResult>(candidate)
        {
            return Ok(result);
        }

        search = json_start;
    }

    Err(BenchError::MarkerNotFound {
        output: output.to_string(),
    }
    .into())
}

/// Slice the JSON object starting at the head of `text`, located by brace
/// depth. Braces inside quoted string values are not special-cased, so a
/// payload carrying a literal `{` or `}` in a string may be cut at the wrong
/// place; such a candidate fails JSON decoding and the occurrence is skipped.
fn json_candidate(text: &str) -> Option<&str> {
    let mut depth: i64 = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse one output per run. Each output is parsed independently and every
/// failure is collected; a single bad run fails the whole batch rather than
/// shrinking the result set behind the caller's back.
pub fn parse_all(outputs: &[String]) -> Result<Vec<RunResult>> {
    let mut results = Vec::with_capacity(outputs.len());
    let mut failures = Vec::new();

    for (i, output) in outputs.iter().enumerate() {
        match parse_result(output) {
            Ok(result) => results.push(result),
            Err(err) => failures.push(format!("output {}: {err}", i + 1)),
        }
    }

    if !failures.is_empty() {
        return Err(BenchError::ParseFailures {
            summary: failures.join("\n"),
        }
        .into());
    }

    Ok(results)
}
