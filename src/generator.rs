use anyhow::Result;
use uuid::Uuid;

use crate::errors::BenchError;
use crate::types::{CodeSpec, RESULT_MARKER};

/// Reject a spec before any code is generated or any subprocess runs.
pub fn validate(spec: &CodeSpec) -> Result<()> {
    if spec.user_code.trim().is_empty() {
        return Err(BenchError::EmptyCode.into());
    }
    if spec.name.trim().is_empty() {
        return Err(BenchError::EmptyName.into());
    }
    if spec.iterations == 0 {
        return Err(BenchError::InvalidIterations { got: 0 }.into());
    }
    Ok(())
}

/// Produce anonymous Apex wrapping the user's code in warmup and measurement
/// loops, ending in a `System.debug` statement that emits the marker followed
/// immediately by the result JSON.
///
/// The loop counter is minted per invocation so user code that declares or
/// reads `i` never collides with it. Apart from that token the output is
/// deterministic for a given spec.
pub fn generate(spec: &CodeSpec) -> Result<String> {
    validate(spec)?;
    let loop_var = format!("i_{}", Uuid::new_v4().simple());
    Ok(render(spec, &loop_var))
}

fn render(spec: &CodeSpec, lv: &str) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("// Apex Benchmark - Generated Code\n");
    out.push_str(&format!("// Benchmark: {}\n", spec.name));
    out.push_str(&format!("// Iterations: {}\n", spec.iterations));
    out.push_str(&format!("// Warmup: {}\n\n", spec.warmup));

    if !spec.setup.trim().is_empty() {
        out.push_str("// Setup code\n");
        out.push_str(spec.setup.trim());
        out.push_str("\n\n");
    }

    out.push_str(&format!("Integer warmupIterations = {};\n", spec.warmup));
    out.push_str(&format!(
        "Integer measurementIterations = {};\n\n",
        spec.iterations
    ));

    out.push_str("// Warmup phase\n");
    out.push_str(&format!(
        "for (Integer {lv} = 0; {lv} < warmupIterations; {lv}++) {{\n    {}\n}}\n\n",
        spec.user_code
    ));

    out.push_str("// Measurement phase\n");
    out.push_str("Long totalWallTime = 0;\n");
    out.push_str("Long totalCpuTime = 0;\n");
    out.push_str("Long minWallTime = Long.MAX_VALUE;\n");
    out.push_str("Long maxWallTime = 0;\n");
    out.push_str("Integer minCpuTime = Integer.MAX_VALUE;\n");
    out.push_str("Integer maxCpuTime = 0;\n");
    if spec.track_heap {
        out.push_str("Long totalHeapUsed = 0;\n");
        out.push_str("Long minHeapUsed = Long.MAX_VALUE;\n");
        out.push_str("Long maxHeapUsed = 0;\n");
    }
    if spec.track_db {
        out.push_str("Integer dmlStatementsBefore = Limits.getDmlStatements();\n");
        out.push_str("Integer soqlQueriesBefore = Limits.getQueries();\n");
    }
    out.push('\n');

    out.push_str(&format!(
        "for (Integer {lv} = 0; {lv} < measurementIterations; {lv}++) {{\n"
    ));
    if spec.track_heap {
        out.push_str("    Long heapBefore = Limits.getHeapSize();\n");
    }
    out.push_str("    Long wallStart = System.now().getTime();\n");
    out.push_str("    Integer cpuStart = Limits.getCpuTime();\n\n");
    out.push_str(&format!("    {}\n\n", spec.user_code));
    out.push_str("    Long wallEnd = System.now().getTime();\n");
    out.push_str("    Integer cpuEnd = Limits.getCpuTime();\n");
    if spec.track_heap {
        out.push_str("    Long heapDelta = Limits.getHeapSize() - heapBefore;\n");
        out.push_str("    totalHeapUsed += heapDelta;\n");
        out.push_str("    if (heapDelta < minHeapUsed) minHeapUsed = heapDelta;\n");
        out.push_str("    if (heapDelta > maxHeapUsed) maxHeapUsed = heapDelta;\n");
    }
    out.push_str("    Long wallDelta = wallEnd - wallStart;\n");
    out.push_str("    Integer cpuDelta = cpuEnd - cpuStart;\n");
    out.push_str("    totalWallTime += wallDelta;\n");
    out.push_str("    totalCpuTime += cpuDelta;\n");
    out.push_str("    if (wallDelta < minWallTime) minWallTime = wallDelta;\n");
    out.push_str("    if (wallDelta > maxWallTime) maxWallTime = wallDelta;\n");
    out.push_str("    if (cpuDelta < minCpuTime) minCpuTime = cpuDelta;\n");
    out.push_str("    if (cpuDelta > maxCpuTime) maxCpuTime = cpuDelta;\n");
    out.push_str("}\n\n");

    if spec.track_db {
        out.push_str("Integer dmlStatementsDelta = Limits.getDmlStatements() - dmlStatementsBefore;\n");
        out.push_str("Integer soqlQueriesDelta = Limits.getQueries() - soqlQueriesBefore;\n\n");
    }

    if !spec.teardown.trim().is_empty() {
        out.push_str("// Teardown code\n");
        out.push_str(spec.teardown.trim());
        out.push_str("\n\n");
    }

    out.push_str("Decimal avgWallMs = Decimal.valueOf(totalWallTime) / measurementIterations;\n");
    out.push_str("Decimal avgCpuMs = Decimal.valueOf(totalCpuTime) / measurementIterations;\n");
    out.push_str("Decimal minWallMs = Decimal.valueOf(minWallTime);\n");
    out.push_str("Decimal maxWallMs = Decimal.valueOf(maxWallTime);\n");
    out.push_str("Decimal minCpuMs = Decimal.valueOf(minCpuTime);\n");
    out.push_str("Decimal maxCpuMs = Decimal.valueOf(maxCpuTime);\n");
    if spec.track_heap {
        out.push_str(
            "Decimal avgHeapKb = Decimal.valueOf(totalHeapUsed) / measurementIterations / 1024;\n",
        );
        out.push_str("Decimal minHeapKb = Decimal.valueOf(minHeapUsed) / 1024;\n");
        out.push_str("Decimal maxHeapKb = Decimal.valueOf(maxHeapUsed) / 1024;\n");
    }
    out.push('\n');

    out.push_str("String resultJson = '{' +\n");
    out.push_str(&format!("    '\"name\":\"{}\",' +\n", spec.name));
    out.push_str("    '\"iterations\":' + measurementIterations + ',' +\n");
    out.push_str("    '\"avgWallMs\":' + avgWallMs.format() + ',' +\n");
    out.push_str("    '\"avgCpuMs\":' + avgCpuMs.format() + ',' +\n");
    out.push_str("    '\"minWallMs\":' + minWallMs.format() + ',' +\n");
    out.push_str("    '\"maxWallMs\":' + maxWallMs.format() + ',' +\n");
    out.push_str("    '\"minCpuMs\":' + minCpuMs.format() + ',' +\n");
    out.push_str("    '\"maxCpuMs\":' + maxCpuMs.format() +\n");
    if spec.track_heap {
        out.push_str("    ',\"avgHeapKb\":' + avgHeapKb.format() +\n");
        out.push_str("    ',\"minHeapKb\":' + minHeapKb.format() +\n");
        out.push_str("    ',\"maxHeapKb\":' + maxHeapKb.format() +\n");
    }
    if spec.track_db {
        out.push_str("    ',\"dmlStatements\":' + dmlStatementsDelta +\n");
        out.push_str("    ',\"soqlQueries\":' + soqlQueriesDelta +\n");
    }
    out.push_str("    '}';\n\n");

    out.push_str(&format!("System.debug('{RESULT_MARKER}' + resultJson);\n"));

    out
}
