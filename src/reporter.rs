use std::io::Write;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::errors::BenchError;
use crate::types::AggregatedResult;

/// Serialize a single aggregate or a list of them as indented JSON.
pub fn write_json<T: Serialize>(value: &T, w: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

fn fmt_ms(value: f64) -> String {
    format!("{value:.3} ms")
}

/// Column-aligned rows with a dimmed header. Colors degrade to plain text
/// when stdout is not a terminal.
fn render_rows(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();

    let header_line = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(
        &header_line
            .trim_end()
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push('\n');

    for row in rows {
        let line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// One benchmark's statistics as a formatted table.
pub fn write_table(result: &AggregatedResult, w: &mut impl Write) -> Result<()> {
    let headers = ["Name", "Avg CPU", "Min CPU", "Max CPU", "Std Dev"];
    let rows = vec![vec![
        result.name.clone(),
        fmt_ms(result.avg_cpu_ms),
        fmt_ms(result.min_cpu_ms),
        fmt_ms(result.max_cpu_ms),
        fmt_ms(result.std_dev_cpu_ms),
    ]];
    w.write_all(render_rows(&headers, &rows).as_bytes())?;
    Ok(())
}

/// Side-by-side comparison table. Each entry's average CPU time is reported
/// as a multiple of the fastest entry, which is starred at 1.00x.
pub fn write_comparison(results: &[AggregatedResult], w: &mut impl Write) -> Result<()> {
    if results.is_empty() {
        return Err(BenchError::EmptyComparison.into());
    }

    let mut fastest_idx = 0;
    let mut fastest_cpu = results[0].avg_cpu_ms;
    for (i, result) in results.iter().enumerate() {
        if result.avg_cpu_ms < fastest_cpu {
            fastest_cpu = result.avg_cpu_ms;
            fastest_idx = i;
        }
    }

    let headers = ["Name", "Avg CPU", "Min CPU", "Max CPU", "Relative"];
    let rows: Vec<Vec<String>> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let relative = if i == fastest_idx {
                "1.00x \u{2b50}".to_string()
            } else {
                format!("{:.2}x", result.avg_cpu_ms / fastest_cpu)
            };
            vec![
                result.name.clone(),
                fmt_ms(result.avg_cpu_ms),
                fmt_ms(result.min_cpu_ms),
                fmt_ms(result.max_cpu_ms),
                relative,
            ]
        })
        .collect();

    w.write_all(render_rows(&headers, &rows).as_bytes())?;
    writeln!(w, "\nFastest: {}", results[fastest_idx].name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunResult;

    fn aggregate(name: &str, avg_cpu: f64) -> AggregatedResult {
        AggregatedResult {
            name: name.to_string(),
            runs: 3,
            iterations: 100,
            warmup: 10,
            avg_cpu_ms: avg_cpu,
            std_dev_cpu_ms: 0.05,
            min_cpu_ms: avg_cpu - 0.2,
            max_cpu_ms: avg_cpu + 0.2,
            avg_wall_ms: avg_cpu * 2.0,
            std_dev_wall_ms: 0.1,
            min_wall_ms: avg_cpu * 2.0 - 0.4,
            max_wall_ms: avg_cpu * 2.0 + 0.4,
            raw_results: Vec::new(),
        }
    }

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ---- write_json ----

    #[test]
    fn json_output_is_indented_and_newline_terminated() {
        let out = render(|w| write_json(&aggregate("Bench", 1.0), w));
        assert!(out.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["name"], "Bench");
        assert_eq!(value["runs"], 3);
        assert_eq!(value["stdDevCpuMs"], 0.05);
        // raw_results is empty and skipped
        assert!(value.get("raw").is_none());
    }

    #[test]
    fn json_list_output_preserves_order() {
        let results = vec![aggregate("A", 1.0), aggregate("B", 2.0)];
        let out = render(|w| write_json(&results, w));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["name"], "A");
        assert_eq!(value[1]["name"], "B");
    }

    #[test]
    fn json_includes_raw_results_when_present() {
        let mut agg = aggregate("Bench", 1.0);
        agg.raw_results = vec![RunResult {
            name: "Bench".to_string(),
            iterations: 100,
            avg_wall_ms: 2.0,
            avg_cpu_ms: 1.0,
            min_wall_ms: 1.5,
            max_wall_ms: 2.5,
            min_cpu_ms: 0.8,
            max_cpu_ms: 1.2,
            avg_heap_kb: None,
            min_heap_kb: None,
            max_heap_kb: None,
            dml_statements: None,
            soql_queries: None,
        }];
        let out = render(|w| write_json(&agg, w));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["raw"][0]["avgCpuMs"], 1.0);
        assert!(value["raw"][0].get("avgHeapKb").is_none());
    }

    // ---- write_table ----

    #[test]
    fn table_contains_formatted_values() {
        let out = render(|w| write_table(&aggregate("Bench", 1.234), w));
        assert!(out.contains("Name"));
        assert!(out.contains("Std Dev"));
        assert!(out.contains("Bench"));
        assert!(out.contains("1.234 ms"));
        assert!(out.contains("0.050 ms"));
    }

    // ---- write_comparison ----

    #[test]
    fn comparison_marks_fastest_and_scales_the_rest() {
        let results = vec![
            aggregate("A", 1.0),
            aggregate("B", 2.0),
            aggregate("C", 1.5),
        ];
        let out = render(|w| write_comparison(&results, w));
        assert!(out.contains("1.00x \u{2b50}"));
        assert!(out.contains("2.00x"));
        assert!(out.contains("1.50x"));
        assert!(out.contains("Fastest: A"));
    }

    #[test]
    fn comparison_fastest_is_not_positional() {
        let results = vec![aggregate("Slow", 4.0), aggregate("Quick", 2.0)];
        let out = render(|w| write_comparison(&results, w));
        assert!(out.contains("Fastest: Quick"));
        assert!(out.contains("2.00x"));
    }

    #[test]
    fn comparison_preserves_input_order_in_rows() {
        let results = vec![aggregate("Zed", 2.0), aggregate("Alpha", 1.0)];
        let out = render(|w| write_comparison(&results, w));
        let zed = out.find("Zed").unwrap();
        let alpha = out.find("Alpha").unwrap();
        assert!(zed < alpha);
    }

    #[test]
    fn comparison_of_nothing_fails() {
        let mut buf = Vec::new();
        let err = write_comparison(&[], &mut buf).unwrap_err();
        assert!(err.to_string().contains("no results to display"));
    }
}
