use crate::error::TraceError;
use crate::span::{
    Process, RawSpan, RawTrace, ServiceSpanCount, Span, SubsidiaryReference, Trace,
};
use crate::span_tree::build_span_tree;
use crate::tags::dedupe_tags;
use crate::trace_name::trace_name;
use std::collections::{BTreeMap, HashMap, HashSet};

const CYCLE_WARNING: &str = "Reference cycle detected; span attached at trace root";

/// Turn a raw backend trace into an ordered, annotated span tree.
///
/// Returns `Ok(None)` when the trace has no id. An unrecognized parent
/// reference type aborts with [`TraceError::UnknownReferenceType`].
pub fn normalize_trace(raw: RawTrace) -> Result<Option<Trace>, TraceError> {
    let RawTrace {
        trace_id,
        processes,
        spans,
    } = raw;

    if trace_id.is_empty() {
        tracing::warn!("Rejecting trace without a traceID ({} spans)", spans.len());
        return Ok(None);
    }
    let trace_id = trace_id.to_lowercase();

    let received = spans.len();
    let mut spans: Vec<RawSpan> = spans.into_iter().filter(|s| s.start_time != 0).collect();
    let dropped = received - spans.len();

    let extent = index_spans(&mut spans, &processes);
    let tree = build_span_tree(&spans)?;
    for &position in &tree.reattached {
        spans[position].warnings.push(CYCLE_WARNING.to_string());
    }

    // Walk order: (input position, depth, has_children). The synthetic root
    // sits at walk depth 0, so top-level spans land at depth 0.
    let mut order = Vec::with_capacity(spans.len());
    tree.root.walk(|slot, node, depth| {
        if let Some(position) = slot.index() {
            order.push((position, depth - 1, !node.children.is_empty()));
        }
    });

    let mut placed = vec![usize::MAX; spans.len()];
    for (output, &(position, _, _)) in order.iter().enumerate() {
        placed[position] = output;
    }
    let by_id: HashMap<&str, usize> = spans
        .iter()
        .enumerate()
        .rev()
        .map(|(position, span)| (span.span_id.as_str(), placed[position]))
        .collect();

    let mut normalized: Vec<Span> = order
        .iter()
        .map(|&(position, depth, has_children)| {
            let span = &spans[position];
            let deduped = dedupe_tags(&span.tags);

            let mut warnings = span.warnings.clone();
            warnings.extend(deduped.warnings);

            let mut references = span.references.clone();
            for reference in &mut references {
                reference.span_index = by_id.get(reference.span_id.as_str()).copied();
            }

            Span {
                span_id: span.span_id.clone(),
                trace_id: span.trace_id.clone(),
                process_id: span.process_id.clone(),
                operation_name: span.operation_name.clone(),
                start_time: span.start_time,
                duration: span.duration,
                logs: span.logs.clone(),
                tags: deduped.tags,
                references,
                warnings,
                process: resolve_process(&processes, &span.process_id),
                depth,
                has_children,
                relative_start_time: span.start_time - extent.start,
                subsidiarily_referenced_by: Vec::new(),
            }
        })
        .collect();

    link_subsidiary_references(&mut normalized, &trace_id);
    let services = count_services(&normalized);
    let trace_name = trace_name(&normalized);

    tracing::debug!(
        trace_id = %trace_id,
        spans = normalized.len(),
        dropped,
        services = services.len(),
        "Normalized trace"
    );

    Ok(Some(Trace {
        trace_id,
        trace_name,
        start_time: extent.start,
        end_time: extent.end,
        duration: extent.end - extent.start,
        processes,
        spans: normalized,
        services,
    }))
}

struct Extent {
    start: u64,
    end: u64,
}

/// Single pass over the kept spans: compute the trace extent, make span ids
/// unique and flag spans whose process is missing.
fn index_spans(spans: &mut [RawSpan], processes: &BTreeMap<String, Process>) -> Extent {
    let mut start = u64::MAX;
    let mut end = 0;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::with_capacity(spans.len());

    for span in spans.iter_mut() {
        start = start.min(span.start_time);
        end = end.max(span.start_time.saturating_add(span.duration));

        let original = span.span_id.clone();
        let seen = counts.entry(original.clone()).or_insert(0);
        if *seen > 0 || taken.contains(&original) {
            let mut suffix = (*seen).max(1);
            let mut renamed = format!("{original}_{suffix}");
            while taken.contains(&renamed) {
                suffix += 1;
                renamed = format!("{original}_{suffix}");
            }
            tracing::debug!("Duplicate spanID {} renamed to {}", original, renamed);
            *seen = suffix + 1;
            span.span_id = renamed;
        } else {
            *seen = 1;
        }
        taken.insert(span.span_id.clone());

        if !processes.contains_key(&span.process_id) {
            span.warnings.push(format!(
                "Process \"{}\" not found in trace processes",
                span.process_id
            ));
        }
    }

    if start == u64::MAX {
        start = 0;
    }
    Extent { start, end }
}

fn resolve_process(processes: &BTreeMap<String, Process>, process_id: &str) -> Process {
    processes.get(process_id).cloned().unwrap_or_default()
}

/// Record every non-primary reference on the span it points at, tagged with
/// the normalized trace id.
fn link_subsidiary_references(spans: &mut [Span], trace_id: &str) {
    let mut links = Vec::new();
    for (position, span) in spans.iter().enumerate() {
        for reference in span.references.iter().skip(1) {
            if let Some(target) = reference.span_index {
                links.push((
                    target,
                    SubsidiaryReference {
                        ref_type: reference.ref_type.clone(),
                        span_id: span.span_id.clone(),
                        trace_id: trace_id.to_string(),
                        span_index: position,
                    },
                ));
            }
        }
    }

    for (target, link) in links {
        spans[target].subsidiarily_referenced_by.push(link);
    }
}

/// Span count per service name, in order of first appearance.
fn count_services(spans: &[Span]) -> Vec<ServiceSpanCount> {
    let mut services: Vec<ServiceSpanCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for span in spans {
        let name = span.process.service_name.as_str();
        match positions.get(name) {
            Some(&position) => services[position].number_of_spans += 1,
            None => {
                positions.insert(name, services.len());
                services.push(ServiceSpanCount {
                    name: name.to_string(),
                    number_of_spans: 1,
                });
            }
        }
    }

    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{KeyValue, RefType, SpanReference};

    fn raw_span(id: &str, process: &str, start: u64, duration: u64) -> RawSpan {
        RawSpan {
            span_id: id.into(),
            trace_id: "abc".into(),
            process_id: process.into(),
            operation_name: format!("op-{id}"),
            start_time: start,
            duration,
            logs: Vec::new(),
            tags: Vec::new(),
            references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn child_of(mut span: RawSpan, parent: &str) -> RawSpan {
        span.references
            .push(SpanReference::new(RefType::ChildOf, parent, "abc"));
        span
    }

    fn processes() -> BTreeMap<String, Process> {
        let mut map = BTreeMap::new();
        for (id, name) in [("p1", "frontend"), ("p2", "backend")] {
            map.insert(
                id.to_string(),
                Process {
                    service_name: name.to_string(),
                    ..Default::default()
                },
            );
        }
        map
    }

    fn trace(spans: Vec<RawSpan>) -> RawTrace {
        RawTrace {
            trace_id: "ABC".into(),
            processes: processes(),
            spans,
        }
    }

    fn ids(trace: &Trace) -> Vec<&str> {
        trace.spans.iter().map(|s| s.span_id.as_str()).collect()
    }

    #[test]
    fn test_parent_and_child() {
        let raw = trace(vec![
            child_of(raw_span("b", "p2", 1200, 100), "a"),
            raw_span("a", "p1", 1000, 250),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(trace.trace_id, "abc");
        assert_eq!(ids(&trace), vec!["a", "b"]);
        assert_eq!(trace.spans[0].depth, 0);
        assert_eq!(trace.spans[1].depth, 1);
        assert!(trace.spans[0].has_children);
        assert!(!trace.spans[1].has_children);
        assert_eq!(trace.spans[0].relative_start_time, 0);
        assert_eq!(trace.spans[1].relative_start_time, 200);
        assert_eq!(trace.start_time, 1000);
        assert_eq!(trace.end_time, 1300);
        assert_eq!(trace.duration, 300);
        assert_eq!(trace.trace_name, "frontend: op-a");
        assert_eq!(trace.spans[1].references[0].span_index, Some(0));
    }

    #[test]
    fn test_empty_trace_id_is_rejected() {
        let mut raw = trace(vec![raw_span("a", "p1", 1000, 1)]);
        raw.trace_id.clear();

        assert_eq!(normalize_trace(raw), Ok(None));
    }

    #[test]
    fn test_unknown_parent_ref_type_fails() {
        let mut bad = child_of(raw_span("b", "p1", 1100, 1), "a");
        bad.references[0].ref_type = RefType::Unknown("UNKNOWN".into());
        let raw = trace(vec![raw_span("a", "p1", 1000, 1), bad]);

        assert!(matches!(
            normalize_trace(raw),
            Err(TraceError::UnknownReferenceType { .. })
        ));
    }

    #[test]
    fn test_zero_start_time_spans_are_dropped() {
        let raw = trace(vec![
            raw_span("a", "p1", 1000, 10),
            raw_span("ghost", "p1", 0, 10),
            child_of(raw_span("b", "p1", 1005, 1), "ghost"),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(ids(&trace), vec!["a", "b"]);
        assert_eq!(trace.spans[1].depth, 0);
    }

    #[test]
    fn test_duplicate_span_ids_are_renamed() {
        let raw = trace(vec![
            raw_span("a", "p1", 1000, 50),
            raw_span("a", "p1", 1010, 5),
            raw_span("a", "p1", 1020, 5),
            child_of(raw_span("c", "p2", 1030, 5), "a"),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(ids(&trace), vec!["a", "c", "a_1", "a_2"]);
        assert_eq!(trace.spans[1].depth, 1);
        assert_eq!(trace.spans[1].references[0].span_index, Some(0));
    }

    #[test]
    fn test_renamed_id_avoids_existing_ids() {
        let raw = trace(vec![
            raw_span("a", "p1", 1000, 1),
            raw_span("a_1", "p1", 1001, 1),
            raw_span("a", "p1", 1002, 1),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(ids(&trace), vec!["a", "a_1", "a_2"]);
    }

    #[test]
    fn test_siblings_sorted_by_start_time() {
        let raw = trace(vec![
            raw_span("root", "p1", 1000, 100),
            child_of(raw_span("late", "p1", 1050, 1), "root"),
            child_of(raw_span("early", "p1", 1010, 1), "root"),
            child_of(raw_span("mid", "p2", 1030, 1), "root"),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(ids(&trace), vec!["root", "early", "mid", "late"]);
        assert_eq!(trace.children(0), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_tags_become_warnings() {
        let mut span = raw_span("a", "p1", 1000, 1);
        span.tags = vec![
            KeyValue::new("component", "http"),
            KeyValue::new("component", "http"),
        ];
        span.warnings = vec!["clock skew adjusted".into()];

        let trace = normalize_trace(trace(vec![span])).unwrap().unwrap();

        assert_eq!(trace.spans[0].tags.len(), 1);
        assert_eq!(
            trace.spans[0].warnings,
            vec![
                "clock skew adjusted".to_string(),
                "Duplicate tag \"component:http\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_subsidiary_references_are_linked_on_target() {
        let mut follower = child_of(raw_span("b", "p1", 1020, 1), "a");
        follower.trace_id = "ABC".into();
        follower
            .references
            .push(SpanReference::new(RefType::FollowsFrom, "c", "abc"));
        let raw = trace(vec![
            raw_span("a", "p1", 1000, 100),
            follower,
            raw_span("c", "p2", 1010, 1),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();
        let c = trace.span("c").unwrap();

        assert_eq!(c.subsidiarily_referenced_by.len(), 1);
        let link = &c.subsidiarily_referenced_by[0];
        assert_eq!(link.span_id, "b");
        assert_eq!(link.ref_type, RefType::FollowsFrom);
        assert_eq!(link.trace_id, "abc");
        assert_eq!(trace.spans[link.span_index].span_id, "b");
        assert!(trace.span("a").unwrap().subsidiarily_referenced_by.is_empty());
    }

    #[test]
    fn test_services_counted_in_walk_order() {
        let raw = trace(vec![
            raw_span("a", "p1", 1000, 100),
            child_of(raw_span("b", "p2", 1010, 1), "a"),
            child_of(raw_span("c", "p2", 1020, 1), "a"),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(
            trace.services,
            vec![
                ServiceSpanCount {
                    name: "frontend".into(),
                    number_of_spans: 1
                },
                ServiceSpanCount {
                    name: "backend".into(),
                    number_of_spans: 2
                },
            ]
        );
    }

    #[test]
    fn test_missing_process_is_a_warning() {
        let trace = normalize_trace(trace(vec![raw_span("a", "p9", 1000, 1)]))
            .unwrap()
            .unwrap();

        assert_eq!(trace.spans[0].process, Process::default());
        assert_eq!(
            trace.spans[0].warnings,
            vec!["Process \"p9\" not found in trace processes".to_string()]
        );
    }

    #[test]
    fn test_cycles_do_not_lose_spans() {
        let raw = trace(vec![
            child_of(raw_span("a", "p1", 1000, 1), "b"),
            child_of(raw_span("b", "p1", 1001, 1), "a"),
        ]);

        let trace = normalize_trace(raw).unwrap().unwrap();

        assert_eq!(ids(&trace), vec!["a", "b"]);
        assert_eq!(trace.spans[0].warnings, vec![CYCLE_WARNING.to_string()]);
        assert_eq!(trace.spans[1].depth, 1);
    }

    #[test]
    fn test_trace_without_usable_spans() {
        let trace = normalize_trace(trace(vec![raw_span("a", "p1", 0, 1)]))
            .unwrap()
            .unwrap();

        assert!(trace.spans.is_empty());
        assert_eq!(trace.duration, 0);
        assert_eq!(trace.trace_name, "");
        assert!(trace.services.is_empty());
    }
}
