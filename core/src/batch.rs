use crate::color::{assign_colors, ColorPalette};
use crate::error::TraceError;
use crate::normalize::normalize_trace;
use crate::span::{RawTrace, Trace};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Trace payloads as returned by tracing backends.
///
/// The shape is picked from the top-level JSON value, then parsed strictly:
/// an object with `data` is an envelope, an array is a list of traces and any
/// other object must look like a trace (`traceID` or `spans` present).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TracePayload {
    /// Jaeger query API envelope: `{"data": [...]}`.
    Envelope { data: Vec<RawTrace> },
    Many(Vec<RawTrace>),
    Single(RawTrace),
}

#[derive(Deserialize)]
struct JaegerEnvelope {
    data: Vec<RawTrace>,
}

impl<'de> Deserialize<'de> for TracePayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let shape = match &value {
            Value::Object(map) if map.contains_key("data") => Shape::Envelope,
            Value::Object(map) if map.contains_key("traceID") || map.contains_key("spans") => {
                Shape::Single
            }
            Value::Object(_) => {
                return Err(D::Error::custom(
                    "object is neither a trace nor a {\"data\": [...]} envelope",
                ))
            }
            Value::Array(_) => Shape::Many,
            other => {
                return Err(D::Error::custom(format!(
                    "expected a trace payload object or array, found {}",
                    json_kind(other)
                )))
            }
        };

        let parsed = match shape {
            Shape::Envelope => serde_json::from_value::<JaegerEnvelope>(value)
                .map(|envelope| TracePayload::Envelope { data: envelope.data }),
            Shape::Many => serde_json::from_value(value).map(TracePayload::Many),
            Shape::Single => serde_json::from_value(value).map(TracePayload::Single),
        };

        parsed.map_err(D::Error::custom)
    }
}

enum Shape {
    Envelope,
    Many,
    Single,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl TracePayload {
    pub fn into_traces(self) -> Vec<RawTrace> {
        match self {
            TracePayload::Envelope { data } => data,
            TracePayload::Many(traces) => traces,
            TracePayload::Single(trace) => vec![trace],
        }
    }
}

/// Normalize a batch of traces shown together and color them consistently.
///
/// Traces without an id are skipped. The first fatal error aborts the batch.
pub fn normalize_batch(
    raws: impl IntoIterator<Item = RawTrace>,
    palette: &ColorPalette,
) -> Result<Vec<Trace>, TraceError> {
    let mut traces = Vec::new();
    let mut rejected = 0usize;

    for raw in raws {
        match normalize_trace(raw)? {
            Some(trace) => traces.push(trace),
            None => rejected += 1,
        }
    }

    if rejected > 0 {
        tracing::warn!("Skipped {} trace(s) without a traceID", rejected);
    }

    let colors = assign_colors(&mut traces, palette);
    tracing::debug!(
        traces = traces.len(),
        services = colors.len(),
        "Normalized trace batch"
    );

    Ok(traces)
}
