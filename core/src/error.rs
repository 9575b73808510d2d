/// Fatal input errors that abort normalization of a trace.
///
/// Soft data-quality problems never show up here; they are recorded in the
/// affected span's `warnings`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("unrecognized reference type {ref_type:?} on span {span_id}")]
    UnknownReferenceType { span_id: String, ref_type: String },
}

/// Problems with a user supplied color palette.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("color palette must contain at least one color")]
    Empty,
    #[error("invalid palette color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
}
