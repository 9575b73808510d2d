use serde::Serialize;
use std::collections::BTreeMap;
use tracefold_core::{KeyValue, Process, RawSpan, RawTrace, RefType, SpanReference};

/// Builder for raw traces used across the integration suites.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    trace: RawTrace,
}

impl TraceBuilder {
    pub fn new(trace_id: &str) -> Self {
        Self {
            trace: RawTrace {
                trace_id: trace_id.to_string(),
                processes: BTreeMap::new(),
                spans: Vec::new(),
            },
        }
    }

    pub fn process(mut self, process_id: &str, service_name: &str) -> Self {
        self.trace.processes.insert(
            process_id.to_string(),
            Process {
                service_name: service_name.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn span(mut self, span: SpanBuilder) -> Self {
        let mut span = span.span;
        span.trace_id = self.trace.trace_id.clone();
        for reference in &mut span.references {
            if reference.trace_id.is_empty() {
                reference.trace_id = self.trace.trace_id.clone();
            }
        }
        self.trace.spans.push(span);
        self
    }

    pub fn build(self) -> RawTrace {
        self.trace
    }
}

/// Builder for a single raw span.
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    span: RawSpan,
}

pub fn span(span_id: &str, process_id: &str, start_time: u64, duration: u64) -> SpanBuilder {
    SpanBuilder {
        span: RawSpan {
            span_id: span_id.to_string(),
            trace_id: String::new(),
            process_id: process_id.to_string(),
            operation_name: format!("op-{span_id}"),
            start_time,
            duration,
            logs: Vec::new(),
            tags: Vec::new(),
            references: Vec::new(),
            warnings: Vec::new(),
        },
    }
}

impl SpanBuilder {
    pub fn operation(mut self, name: &str) -> Self {
        self.span.operation_name = name.to_string();
        self
    }

    pub fn child_of(self, parent: &str) -> Self {
        self.reference(RefType::ChildOf, parent)
    }

    pub fn follows_from(self, span_id: &str) -> Self {
        self.reference(RefType::FollowsFrom, span_id)
    }

    pub fn reference(mut self, ref_type: RefType, span_id: &str) -> Self {
        self.span
            .references
            .push(SpanReference::new(ref_type, span_id, ""));
        self
    }

    pub fn tag(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.span.tags.push(KeyValue::new(key, value));
        self
    }
}

/// A small checkout trace with known shape.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFixture {
    pub raw: RawTrace,
    pub expected_order: Vec<&'static str>,
    pub expected_depths: Vec<usize>,
    pub expected_name: &'static str,
}

pub fn checkout_trace_fixture() -> TraceFixture {
    let raw = TraceBuilder::new("CAFEBABE00000001")
        .process("p1", "frontend")
        .process("p2", "checkout")
        .process("p3", "payments")
        .span(span("charge", "p3", 1_000_400, 300).child_of("checkout"))
        .span(
            span("root", "p1", 1_000_000, 1_000)
                .operation("POST /checkout")
                .tag("http.method", "POST")
                .tag("http.method", "POST"),
        )
        .span(span("checkout", "p2", 1_000_100, 800).child_of("root"))
        .span(span("reserve", "p2", 1_000_150, 100).child_of("checkout"))
        .span(span("audit", "p1", 1_000_950, 40).child_of("root").follows_from("charge"))
        .span(span("dropped", "p1", 0, 10).child_of("root"))
        .build();

    TraceFixture {
        raw,
        expected_order: vec!["root", "checkout", "reserve", "charge", "audit"],
        expected_depths: vec![0, 1, 2, 2, 1],
        expected_name: "frontend: POST /checkout",
    }
}

/// A wide and deep trace whose parent links are derived arithmetically.
///
/// Span `i` hangs under span `i / 3`, start times interleave so that siblings
/// arrive out of order, and every tenth span has a start time of zero.
pub fn generated_trace(span_count: usize) -> RawTrace {
    let mut builder = TraceBuilder::new("feedface")
        .process("p0", "edge")
        .process("p1", "api")
        .process("p2", "store");

    for i in 0..span_count {
        let start = if i % 10 == 9 {
            0
        } else {
            1_000_000 + ((i * 7919) % 997) as u64 * 10 + i as u64
        };
        let process = format!("p{}", i % 3);
        let mut s = span(&format!("s{i}"), &process, start, 50 + (i as u64 % 13));
        if i > 0 {
            s = s.child_of(&format!("s{}", i / 3));
        }
        builder = builder.span(s);
    }

    builder.build()
}

/// Jaeger query API response with two traces sharing a service.
pub const JAEGER_RESPONSE: &str = r##"{
  "data": [
    {
      "traceID": "0AF7651916CD43DD8448EB211C80319C",
      "spans": [
        {
          "traceID": "0AF7651916CD43DD8448EB211C80319C",
          "spanID": "b7ad6b7169203331",
          "operationName": "HTTP GET /dispatch",
          "references": [],
          "startTime": 1700000000000000,
          "duration": 693000,
          "tags": [
            { "key": "span.kind", "type": "string", "value": "server" },
            { "key": "http.status_code", "type": "int64", "value": 200 },
            { "key": "span.kind", "type": "string", "value": "server" }
          ],
          "logs": [
            { "timestamp": 1700000000000100, "fields": [{ "key": "event", "type": "string", "value": "start" }] }
          ],
          "processID": "p1",
          "warnings": null
        },
        {
          "traceID": "0AF7651916CD43DD8448EB211C80319C",
          "spanID": "00f067aa0ba902b7",
          "operationName": "SQL SELECT",
          "references": [
            { "refType": "CHILD_OF", "traceID": "0AF7651916CD43DD8448EB211C80319C", "spanID": "b7ad6b7169203331" }
          ],
          "startTime": 1700000000012000,
          "duration": 310000,
          "tags": [],
          "logs": [],
          "processID": "p2"
        }
      ],
      "processes": {
        "p1": { "serviceName": "frontend", "tags": [{ "key": "hostname", "type": "string", "value": "web-1" }] },
        "p2": { "serviceName": "mysql", "tags": [] }
      },
      "warnings": null
    },
    {
      "traceID": "5b8efff798038103d269b633813fc60c",
      "spans": [
        {
          "traceID": "5b8efff798038103d269b633813fc60c",
          "spanID": "eee19b7ec3c1b174",
          "operationName": "FindDriverIDs",
          "references": [],
          "startTime": 1700000001000000,
          "duration": 20000,
          "tags": [],
          "logs": [],
          "processID": "p1"
        }
      ],
      "processes": {
        "p1": { "serviceName": "mysql", "tags": [] }
      }
    }
  ],
  "total": 0,
  "limit": 0,
  "offset": 0,
  "errors": null
}"##;
