use crate::span::Span;
use std::collections::HashSet;

/// Human readable trace name, `"<service>: <operation>"` of the root-most span.
///
/// Candidates are spans with no reference to another span of the same trace.
/// Among those the span with the fewest references wins, then the earliest.
/// Returns an empty string when no candidate exists.
pub fn trace_name(spans: &[Span]) -> String {
    let ids: HashSet<&str> = spans.iter().map(|s| s.span_id.as_str()).collect();

    let mut candidate: Option<&Span> = None;
    for span in spans {
        let has_internal_parent = span
            .references
            .iter()
            .any(|r| r.trace_id == span.trace_id && ids.contains(r.span_id.as_str()));
        if has_internal_parent {
            continue;
        }

        candidate = match candidate {
            Some(best)
                if (best.references.len(), best.start_time)
                    <= (span.references.len(), span.start_time) =>
            {
                Some(best)
            }
            _ => Some(span),
        };
    }

    candidate
        .map(|span| format!("{}: {}", span.process.service_name, span.operation_name))
        .unwrap_or_default()
}
