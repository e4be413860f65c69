//! PSL (Parts Structure List) Processing Module
//!
//! Reconstructs a multi-level bill of materials from a flat, level-annotated
//! PSL export. Export formats differ only in configuration, captured by
//! [`FormatVariant`].

pub mod builder;
pub mod extract;
pub mod meta;
pub mod observer;
pub mod parser;
pub mod schema;
pub mod template;
pub mod variant;

pub use builder::{HierarchyBuilder, ParseState, ParsedPsl, TreeSummary, DEFAULT_MAX_QUANTITY};
pub use extract::{extract, extract_value, Extracted, FieldSource};
pub use meta::MetaMap;
pub use observer::{ParseEvent, ParseObserver, RecordingObserver, TracingObserver};
pub use parser::{parse_reader, parse_str, PslParser};
pub use schema::{ColumnIndex, HeaderCheck, RowMap};
pub use variant::{
    Dialect, FormatVariant, IdentSpec, ParseSpec, QuantityMode, VariantDefinition,
    VariantOverride, VariantRegistry,
};
