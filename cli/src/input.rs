use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracefold_core::{RawTrace, TracePayload};

/// Read raw traces from a JSON file, or from stdin when `path` is `-`.
pub fn read_traces(path: &Path) -> Result<Vec<RawTrace>> {
    let contents = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read traces from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {:?}", path))?
    };

    parse_traces(&contents)
}

/// Parse any supported trace payload shape.
pub fn parse_traces(contents: &str) -> Result<Vec<RawTrace>> {
    let payload: TracePayload =
        serde_json::from_str(contents).context("Failed to parse trace payload")?;
    let traces = payload.into_traces();
    tracing::debug!("Read {} raw trace(s)", traces.len());
    Ok(traces)
}
