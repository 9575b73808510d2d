use crate::error::TraceError;
use crate::span::RawSpan;
use crate::tree::TreeNode;
use itertools::Itertools;
use std::collections::HashMap;

/// Value stored in each span tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanSlot {
    /// Synthetic node holding every top-level span.
    Root,
    /// Position of the span in the slice the tree was built from.
    Span(usize),
}

impl SpanSlot {
    pub fn index(self) -> Option<usize> {
        match self {
            SpanSlot::Root => None,
            SpanSlot::Span(index) => Some(index),
        }
    }
}

/// Span tree plus the spans whose parent link had to be cut to break a cycle.
#[derive(Debug)]
pub struct SpanTree {
    pub root: TreeNode<SpanSlot>,
    pub reattached: Vec<usize>,
}

/// Build the parent/child tree for a trace's spans.
///
/// A span's parent is the target of its first reference. Spans without
/// references, or whose parent is not among `spans`, hang off the root.
/// Siblings are ordered by start time, then by position in `spans`.
pub fn build_span_tree(spans: &[RawSpan]) -> Result<SpanTree, TraceError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(spans.len());
    for (position, span) in spans.iter().enumerate() {
        index.entry(span.span_id.as_str()).or_insert(position);
    }

    let mut parents = Vec::with_capacity(spans.len());
    for span in spans {
        let parent = match span.references.first() {
            Some(reference) if !reference.ref_type.is_known() => {
                return Err(TraceError::UnknownReferenceType {
                    span_id: span.span_id.clone(),
                    ref_type: reference.ref_type.to_string(),
                });
            }
            Some(reference) => index.get(reference.span_id.as_str()).copied(),
            None => None,
        };
        parents.push(parent);
    }

    let reattached = break_cycles(&mut parents);
    if !reattached.is_empty() {
        tracing::warn!(
            "Reference cycle in trace; re-attached spans at root: {}",
            reattached.iter().map(|&i| spans[i].span_id.as_str()).join(", ")
        );
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    for (position, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(position),
            None => roots.push(position),
        }
    }

    let by_start = |&position: &usize| (spans[position].start_time, position);
    roots.sort_by_key(by_start);
    for siblings in children.iter_mut().filter(|c| c.len() > 1) {
        siblings.sort_by_key(by_start);
    }

    Ok(SpanTree {
        root: assemble(roots, children),
        reattached,
    })
}

/// Cut one parent link in every cycle so all spans reach the root.
///
/// The cut is made on the cycle member that comes first in input order.
fn break_cycles(parents: &mut [Option<usize>]) -> Vec<usize> {
    const UNVISITED: u8 = 0;
    const ON_CHAIN: u8 = 1;
    const SETTLED: u8 = 2;

    let mut state = vec![UNVISITED; parents.len()];
    let mut reattached = Vec::new();
    let mut chain = Vec::new();

    for start in 0..parents.len() {
        chain.clear();
        let mut current = start;

        loop {
            match state[current] {
                SETTLED => break,
                ON_CHAIN => {
                    let cycle_start = chain.iter().position(|&c| c == current).unwrap_or(0);
                    if let Some(&first) = chain[cycle_start..].iter().min() {
                        parents[first] = None;
                        reattached.push(first);
                    }
                    break;
                }
                _ => {
                    state[current] = ON_CHAIN;
                    chain.push(current);
                    match parents[current] {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
        }

        for &settled in &chain {
            state[settled] = SETTLED;
        }
    }

    reattached.sort_unstable();
    reattached
}

/// Turn child lists into an owned tree, leaves first, without recursion.
fn assemble(roots: Vec<usize>, children: Vec<Vec<usize>>) -> TreeNode<SpanSlot> {
    let mut order = Vec::with_capacity(children.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(position) = stack.pop() {
        order.push(position);
        stack.extend(children[position].iter().rev());
    }

    let mut built: Vec<Option<TreeNode<SpanSlot>>> = Vec::new();
    built.resize_with(children.len(), || None);

    for &position in order.iter().rev() {
        let kids = children[position]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[position] = Some(TreeNode::with_children(SpanSlot::Span(position), kids));
    }

    let top = roots
        .iter()
        .filter_map(|&position| built[position].take())
        .collect();
    TreeNode::with_children(SpanSlot::Root, top)
}
