use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracefold_core::{Span, Trace};

/// Render a normalized trace as an indented span tree with timings.
pub fn render_trace(trace: &Trace) -> String {
    let mut out = String::new();

    out.push_str(&format!("🔍 Trace {}", trace.trace_id));
    if !trace.trace_name.is_empty() {
        out.push_str(&format!("  ({})", trace.trace_name));
    }
    out.push('\n');
    out.push_str(&format!(
        "• Start: {}  • Duration: {}  • Spans: {}\n",
        format_timestamp(trace.start_time),
        format_micros(trace.duration),
        trace.spans.len()
    ));
    out.push_str(&format!("• Services: {}\n", services_summary(trace)));

    for line in tree_lines(&trace.spans) {
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// One line per span, prefixed with tree branches.
pub fn tree_lines(spans: &[Span]) -> Vec<String> {
    let last = last_child_flags(spans);
    let mut ancestors_last: Vec<bool> = Vec::new();
    let mut lines = Vec::with_capacity(spans.len());

    for (index, span) in spans.iter().enumerate() {
        ancestors_last.truncate(span.depth);

        let mut prefix = String::new();
        // Top-level spans carry no branch, so their column is skipped.
        for &is_last in ancestors_last.iter().skip(1) {
            prefix.push_str(if is_last { "    " } else { "│   " });
        }
        if span.depth > 0 {
            prefix.push_str(if last[index] { "└── " } else { "├── " });
        }

        let color = span.process.color.as_deref().unwrap_or("-");
        let warnings = if span.warnings.is_empty() {
            String::new()
        } else {
            format!(" ⚠ {}", span.warnings.len())
        };

        lines.push(format!(
            "{}{} [{} {}] +{} {}{}",
            prefix,
            span.operation_name,
            span.process.service_name,
            color,
            format_micros(span.relative_start_time),
            format_micros(span.duration),
            warnings
        ));

        ancestors_last.push(last[index]);
    }

    lines
}

/// `name (count)` pairs for the services of a trace.
pub fn services_summary(trace: &Trace) -> String {
    if trace.services.is_empty() {
        return "-".to_string();
    }
    trace
        .services
        .iter()
        .map(|s| format!("{} ({})", s.name, s.number_of_spans))
        .join(", ")
}

/// Whether each span is the last child of its parent, from a reverse scan
/// over the pre-order sequence.
fn last_child_flags(spans: &[Span]) -> Vec<bool> {
    let mut flags = vec![true; spans.len()];
    let mut sibling_below: Vec<bool> = Vec::new();

    for (index, span) in spans.iter().enumerate().rev() {
        if sibling_below.len() <= span.depth {
            sibling_below.resize(span.depth + 1, false);
        }
        flags[index] = !sibling_below[span.depth];
        sibling_below[span.depth] = true;
        sibling_below.truncate(span.depth + 1);
    }

    flags
}

/// Human readable duration from microseconds.
pub fn format_micros(micros: u64) -> String {
    if micros < 1_000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    }
}

/// RFC 3339 rendering of a microsecond Unix timestamp.
pub fn format_timestamp(micros: u64) -> String {
    i64::try_from(micros)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_micros)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| micros.to_string())
}
