use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A key/value attribute as exported by Jaeger. Values are JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    pub value: serde_json::Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value_type: None,
            value: value.into(),
        }
    }

    /// Value rendered for humans: strings unquoted, other scalars as JSON.
    pub fn display_value(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Timestamped set of fields recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub timestamp: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<KeyValue>,
}

/// Relationship carried by a span reference.
///
/// Unrecognized values are kept verbatim so normalization can reject them
/// instead of failing during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RefType {
    ChildOf,
    FollowsFrom,
    Unknown(String),
}

impl RefType {
    pub fn as_str(&self) -> &str {
        match self {
            RefType::ChildOf => "CHILD_OF",
            RefType::FollowsFrom => "FOLLOWS_FROM",
            RefType::Unknown(other) => other,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RefType::Unknown(_))
    }
}

impl From<String> for RefType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CHILD_OF" => RefType::ChildOf,
            "FOLLOWS_FROM" => RefType::FollowsFrom,
            _ => RefType::Unknown(value),
        }
    }
}

impl From<RefType> for String {
    fn from(value: RefType) -> Self {
        match value {
            RefType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanReference {
    #[serde(rename = "refType")]
    pub ref_type: RefType,
    #[serde(rename = "spanID")]
    pub span_id: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    /// Position of the referenced span in [`Trace::spans`] once normalized,
    /// `None` when it is not part of the trace.
    #[serde(rename = "spanIndex", default, skip_serializing_if = "Option::is_none")]
    pub span_index: Option<usize>,
}

impl SpanReference {
    pub fn new(ref_type: RefType, span_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            ref_type,
            span_id: span_id.into(),
            trace_id: trace_id.into(),
            span_index: None,
        }
    }
}

/// The service that emitted a group of spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<KeyValue>,
    /// Display color, filled in by the color assigner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A span as delivered by the tracing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(rename = "spanID")]
    pub span_id: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "processID")]
    pub process_id: String,
    #[serde(rename = "operationName")]
    pub operation_name: String,
    /// Microseconds since the Unix epoch.
    #[serde(rename = "startTime")]
    pub start_time: u64,
    /// Microseconds.
    pub duration: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<Log>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<KeyValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<SpanReference>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
}

/// A trace as delivered by the tracing backend: unordered spans plus processes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrace {
    #[serde(rename = "traceID", default)]
    pub trace_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processes: BTreeMap<String, Process>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spans: Vec<RawSpan>,
}

/// Back-reference recorded on a span that another span points at through a
/// non-primary reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidiaryReference {
    #[serde(rename = "refType")]
    pub ref_type: RefType,
    /// Id of the referencing span.
    #[serde(rename = "spanID")]
    pub span_id: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    /// Position of the referencing span in [`Trace::spans`].
    #[serde(rename = "spanIndex")]
    pub span_index: usize,
}

/// A span after normalization, positioned in the trace's span tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "spanID")]
    pub span_id: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "processID")]
    pub process_id: String,
    #[serde(rename = "operationName")]
    pub operation_name: String,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    pub duration: u64,
    pub logs: Vec<Log>,
    pub tags: Vec<KeyValue>,
    pub references: Vec<SpanReference>,
    pub warnings: Vec<String>,
    pub process: Process,
    /// Nesting level; spans directly under the trace root are at depth 0.
    pub depth: usize,
    #[serde(rename = "hasChildren")]
    pub has_children: bool,
    /// `start_time` minus the trace start time.
    #[serde(rename = "relativeStartTime")]
    pub relative_start_time: u64,
    #[serde(rename = "subsidiarilyReferencedBy")]
    pub subsidiarily_referenced_by: Vec<SubsidiaryReference>,
}

impl Span {
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Id of the span this one hangs under, taken from its first reference.
    pub fn parent_span_id(&self) -> Option<&str> {
        self.references.first().map(|r| r.span_id.as_str())
    }
}

/// Number of spans a service contributed to a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpanCount {
    pub name: String,
    #[serde(rename = "numberOfSpans")]
    pub number_of_spans: usize,
}

/// A normalized trace: spans in tree pre-order plus derived summary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "traceName")]
    pub trace_name: String,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    #[serde(rename = "endTime")]
    pub end_time: u64,
    pub duration: u64,
    pub processes: BTreeMap<String, Process>,
    pub spans: Vec<Span>,
    pub services: Vec<ServiceSpanCount>,
}

impl Trace {
    pub fn span(&self, span_id: &str) -> Option<&Span> {
        self.spans.iter().find(|span| span.span_id == span_id)
    }

    /// Indices of the direct children of the span at `index`.
    ///
    /// Relies on pre-order layout: children follow their parent, one level
    /// deeper, until a span at the parent's depth or shallower appears.
    pub fn children(&self, index: usize) -> Vec<usize> {
        let Some(parent) = self.spans.get(index) else {
            return Vec::new();
        };

        self.spans[index + 1..]
            .iter()
            .enumerate()
            .take_while(|(_, span)| span.depth > parent.depth)
            .filter(|(_, span)| span.depth == parent.depth + 1)
            .map(|(offset, _)| index + 1 + offset)
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
