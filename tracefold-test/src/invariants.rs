use anyhow::{ensure, Result};
use std::collections::HashMap;
use tracefold_core::Trace;

/// Check the structural guarantees every normalized trace must hold.
pub fn check_invariants(trace: &Trace) -> Result<()> {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    for (index, span) in trace.spans.iter().enumerate() {
        ensure!(
            ids.insert(span.span_id.as_str(), index).is_none(),
            "duplicate span id {}",
            span.span_id
        );
        ensure!(
            span.start_time >= trace.start_time,
            "span {} starts before the trace",
            span.span_id
        );
        ensure!(
            span.relative_start_time == span.start_time - trace.start_time,
            "span {} has wrong relative start",
            span.span_id
        );
    }

    if !trace.spans.is_empty() {
        ensure!(
            trace.spans.iter().any(|s| s.relative_start_time == 0),
            "no span starts at the trace start"
        );
        ensure!(trace.spans[0].depth == 0, "first span is not top-level");
    }

    // Pre-order: a span's parent is the nearest earlier span one level up.
    // Siblings, root level included, must not go back in time.
    let mut open: Vec<usize> = Vec::new();
    let mut sibling_start: Vec<u64> = Vec::new();
    for (index, span) in trace.spans.iter().enumerate() {
        ensure!(
            span.depth <= open.len(),
            "span {} jumps from depth {} to {}",
            span.span_id,
            open.len(),
            span.depth
        );
        open.truncate(span.depth);

        if let Some(&parent) = open.last() {
            let parent = &trace.spans[parent];
            ensure!(parent.has_children, "parent {} not flagged", parent.span_id);
            if let Some(parent_id) = span.parent_span_id() {
                if ids.contains_key(parent_id) {
                    ensure!(
                        parent.span_id == parent_id,
                        "span {} placed under {} instead of {}",
                        span.span_id,
                        parent.span_id,
                        parent_id
                    );
                }
            }
        }

        let has_children = trace
            .spans
            .get(index + 1)
            .is_some_and(|next| next.depth == span.depth + 1);
        ensure!(
            span.has_children == has_children,
            "span {} has_children mismatch",
            span.span_id
        );

        sibling_start.truncate(span.depth + 1);
        match sibling_start.get_mut(span.depth) {
            Some(previous) => {
                ensure!(
                    *previous <= span.start_time,
                    "span {} starts before its previous sibling",
                    span.span_id
                );
                *previous = span.start_time;
            }
            None => sibling_start.push(span.start_time),
        }

        open.push(index);
    }

    let counted: usize = trace.services.iter().map(|s| s.number_of_spans).sum();
    ensure!(counted == trace.spans.len(), "service counts do not add up");

    Ok(())
}
