//! Parse observers
//!
//! The builder reports notable conditions through an injected
//! [`ParseObserver`] instead of a global logger. [`TracingObserver`] forwards
//! them to `tracing`; [`RecordingObserver`] keeps them for inspection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ParseEvent {
    /// Header unusable; the parse was abandoned without a tree
    SchemaRejected {
        missing: Vec<String>,
        duplicates: Vec<String>,
    },
    /// A part gained a structure because a later row named it as parent
    StructurePromoted {
        line: u64,
        level: u32,
        ident: String,
        refdes: Option<String>,
    },
    /// Type discriminator matched neither marker; treated as a part
    UnknownItemType { line: u64, value: String },
    BlankRowSkipped { line: u64 },
    Completed { rows: usize, entities: usize },
}

pub trait ParseObserver {
    fn on_event(&mut self, event: &ParseEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ParseObserver for TracingObserver {
    fn on_event(&mut self, event: &ParseEvent) {
        match event {
            ParseEvent::SchemaRejected {
                missing,
                duplicates,
            } => {
                tracing::warn!(
                    missing = ?missing,
                    duplicates = ?duplicates,
                    "PSL header unusable, parse aborted"
                );
            }
            ParseEvent::StructurePromoted {
                line,
                level,
                ident,
                refdes,
            } => {
                tracing::warn!(
                    line,
                    level,
                    ident = %ident,
                    refdes = ?refdes,
                    "Part has children, attaching structure"
                );
            }
            ParseEvent::UnknownItemType { line, value } => {
                tracing::warn!(line, value = %value, "Unknown item type, treating as part");
            }
            ParseEvent::BlankRowSkipped { line } => {
                tracing::debug!(line, "Skipping blank row");
            }
            ParseEvent::Completed { rows, entities } => {
                tracing::info!(rows, entities, "PSL parse complete");
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<ParseEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn promotions(&self) -> impl Iterator<Item = &ParseEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, ParseEvent::StructurePromoted { .. }))
    }
}

impl ParseObserver for RecordingObserver {
    fn on_event(&mut self, event: &ParseEvent) {
        self.events.push(event.clone());
    }
}
