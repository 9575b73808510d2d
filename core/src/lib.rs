pub mod batch;
pub mod color;
pub mod config;
pub mod error;
pub mod normalize;
pub mod span;
pub mod span_tree;
pub mod tags;
pub mod trace_name;
pub mod tree;

pub use batch::{normalize_batch, TracePayload};
pub use color::{assign_colors, ColorPalette, ServiceColors};
pub use config::Config;
pub use error::{PaletteError, TraceError};
pub use normalize::normalize_trace;
pub use span::{
    KeyValue, Log, Process, RawSpan, RawTrace, RefType, ServiceSpanCount, Span, SpanReference,
    SubsidiaryReference, Trace,
};
pub use span_tree::{build_span_tree, SpanSlot, SpanTree};
pub use tags::{dedupe_tags, DedupedTags};
pub use trace_name::trace_name;
pub use tree::TreeNode;
