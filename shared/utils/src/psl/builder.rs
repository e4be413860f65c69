//! Hierarchy builder
//!
//! Reconstructs the parts tree from a PSL record stream. Rows arrive in
//! depth-first export order, each tagged with its level. The builder keeps,
//! for every level, the entities generated by the most recent row at that
//! level; those are the candidate parents for the next deeper row.
//!
//! A row with quantity `n` under `p` active parents yields `n` entities,
//! handed out in contiguous blocks of `n / p` per parent.

use csv::StringRecord;
use psl_models::{EntityId, EntityTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

use super::extract::{extract, extract_value};
use super::meta::{read_meta, MetaMap};
use super::observer::{ParseEvent, ParseObserver};
use super::schema::{check_header, ColumnIndex, HeaderCheck, RowMap};
use super::variant::{FormatVariant, QuantityMode};
use crate::error::{ExtractionTarget, PslError, PslResult};
use crate::validation::ValidationContext;

/// Default ceiling on the number of entities a single row may expand into
pub const DEFAULT_MAX_QUANTITY: usize = 10_000;

/// Builder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseState {
    /// Nothing consumed yet
    Uninitialized,
    /// Metadata block read
    MetaRead,
    /// Column header checked
    SchemaChecked,
    /// Header unusable, no tree produced
    Aborted,
    /// Consuming data rows
    BuildingRows,
    /// Input exhausted
    Done,
}

impl ParseState {
    pub fn can_transition_to(&self, target: ParseState) -> bool {
        use ParseState::*;

        matches!(
            (self, target),
            (Uninitialized, MetaRead)
                | (MetaRead, SchemaChecked)
                | (SchemaChecked, Aborted)
                | (SchemaChecked, BuildingRows)
                | (BuildingRows, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ParseState::Aborted | ParseState::Done)
    }
}

impl std::fmt::Display for ParseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::MetaRead => write!(f, "meta_read"),
            Self::SchemaChecked => write!(f, "schema_checked"),
            Self::Aborted => write!(f, "aborted"),
            Self::BuildingRows => write!(f, "building_rows"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Key of the active parent table. `Root` sits below level 0 and holds the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Root,
    Level(u32),
}

impl Slot {
    /// Slot holding the parents of rows at `level`
    pub fn parent_of(level: u32) -> Self {
        match level {
            0 => Slot::Root,
            n => Slot::Level(n - 1),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActiveParents {
    slots: BTreeMap<Slot, Vec<EntityId>>,
}

impl ActiveParents {
    pub fn seed_root(&mut self, owner: EntityId) {
        self.slots.clear();
        self.slots.insert(Slot::Root, vec![owner]);
    }

    pub fn parents_for(&self, level: u32) -> Option<&[EntityId]> {
        self.slots
            .get(&Slot::parent_of(level))
            .map(Vec::as_slice)
            .filter(|parents| !parents.is_empty())
    }

    /// Make `entities` the occupants of `level`. Deeper levels are cleared
    /// since their occupants belong to a finished subtree.
    pub fn replace(&mut self, level: u32, entities: Vec<EntityId>) {
        let _finished = self.slots.split_off(&Slot::Level(level));
        self.slots.insert(Slot::Level(level), entities);
    }
}

/// Result of a successful parse. The owner is the root of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPsl {
    pub tree: EntityTree,
    pub owner: EntityId,
    pub meta: MetaMap,
    pub rows_processed: usize,
    pub promotions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    /// Entities below the owner
    pub entities: usize,
    pub assemblies: usize,
    pub parts: usize,
    pub max_depth: usize,
    pub promotions: usize,
}

impl ParsedPsl {
    pub fn owner_ident(&self) -> &str {
        self.tree
            .get(self.owner)
            .map(|e| e.ident.as_str())
            .unwrap_or("")
    }

    pub fn summary(&self) -> TreeSummary {
        let mut summary = TreeSummary {
            entities: 0,
            assemblies: 0,
            parts: 0,
            max_depth: 0,
            promotions: self.promotions,
        };

        for (_, depth, entity) in self.tree.walk(self.owner).skip(1) {
            summary.entities += 1;
            summary.max_depth = summary.max_depth.max(depth);
            if entity.has_structure() {
                summary.assemblies += 1;
            } else {
                summary.parts += 1;
            }
        }
        summary
    }
}

/// Suffix for the `index`-th designator of an expanded row: a..z, aa, ab, ...
pub fn designator_suffix(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn designator(base: &str, qty: usize, index: usize) -> Option<String> {
    if base.is_empty() {
        None
    } else if qty > 1 {
        Some(format!("{}{}", base, designator_suffix(index)))
    } else {
        Some(base.to_string())
    }
}

/// Non-negative integer up to `u32::MAX`, also accepting integral decimals
/// such as `4.0`
fn parse_count(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(v))
            .map(|v| v as u32)
    })
}

fn field<'r>(row: &'r RowMap, name: &str) -> &'r str {
    row.get(name).map(|v| v.trim()).unwrap_or("")
}

pub struct HierarchyBuilder<'a> {
    variant: &'a FormatVariant,
    observer: &'a mut dyn ParseObserver,
    skip_blank_rows: bool,
    max_quantity: usize,
    state: ParseState,
    tree: EntityTree,
    active: ActiveParents,
    meta: MetaMap,
    columns: Option<ColumnIndex>,
    rows_processed: usize,
    promotions: usize,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(variant: &'a FormatVariant, observer: &'a mut dyn ParseObserver) -> Self {
        Self {
            variant,
            observer,
            skip_blank_rows: true,
            max_quantity: DEFAULT_MAX_QUANTITY,
            state: ParseState::Uninitialized,
            tree: EntityTree::new(),
            active: ActiveParents::default(),
            meta: MetaMap::new(),
            columns: None,
            rows_processed: 0,
            promotions: 0,
        }
    }

    pub fn with_skip_blank_rows(mut self, skip: bool) -> Self {
        self.skip_blank_rows = skip;
        self
    }

    pub fn with_max_quantity(mut self, max_quantity: usize) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    fn transition(&mut self, next: ParseState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Parse state transition");
        self.state = next;
    }

    /// Consume the whole record stream. Returns `Ok(None)` when the column
    /// header is unusable; the reasons are recorded in `vctx`.
    pub fn build<R: Read>(
        mut self,
        reader: &mut csv::Reader<R>,
        vctx: &mut ValidationContext,
    ) -> PslResult<Option<ParsedPsl>> {
        self.meta = read_meta(reader, &self.variant.meta_labels)?;
        self.transition(ParseState::MetaRead);

        let mut record = StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Err(PslError::MissingHeader);
        }
        let check = check_header(&record, &self.variant.required_columns, vctx);
        self.transition(ParseState::SchemaChecked);

        match check {
            HeaderCheck::Usable(columns) => self.columns = Some(columns),
            HeaderCheck::Unusable {
                missing,
                duplicates,
            } => {
                self.transition(ParseState::Aborted);
                self.observer.on_event(&ParseEvent::SchemaRejected {
                    missing,
                    duplicates,
                });
                return Ok(None);
            }
        }

        let owner = self.start()?;

        while reader.read_record(&mut record)? {
            self.process_row(&record)?;
        }

        Ok(Some(self.finish(owner)))
    }

    fn start(&mut self) -> PslResult<EntityId> {
        let ident = extract_value(&self.meta, &self.variant.owner_ident).ok_or(
            PslError::UnidentifiableRow {
                line: 0,
                target: ExtractionTarget::OwnerIdentity,
            },
        )?;
        let description =
            extract_value(&self.meta, &self.variant.owner_description).unwrap_or_default();

        let owner = self.tree.create();
        self.tree.define(owner, ident, description, None, None)?;
        self.tree.attach_structure(owner)?;
        self.active.seed_root(owner);

        self.transition(ParseState::BuildingRows);
        Ok(owner)
    }

    fn process_row(&mut self, record: &StringRecord) -> PslResult<()> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if self.skip_blank_rows && record.iter().all(|cell| cell.trim().is_empty()) {
            self.observer.on_event(&ParseEvent::BlankRowSkipped { line });
            return Ok(());
        }

        let row = match &self.columns {
            Some(columns) => columns.project(record),
            None => return Err(PslError::MissingHeader),
        };
        let variant = self.variant;

        let raw_level = field(&row, &variant.level_field);
        let level = parse_count(raw_level).ok_or_else(|| PslError::InvalidLevel {
                line,
                value: raw_level.to_string(),
            })?;

        let parents = self
            .active
            .parents_for(level)
            .ok_or(PslError::MissingParentLevel { line, level })?
            .to_vec();

        if level > 0 {
            let parent_ident = extract_value(&row, &variant.parent_specs).ok_or(
                PslError::UnidentifiableRow {
                    line,
                    target: ExtractionTarget::ParentIdentity,
                },
            )?;
            let expected = self
                .tree
                .get(parents[0])
                .map(|e| e.ident.as_str())
                .unwrap_or("");
            if expected != parent_ident {
                return Err(PslError::ParentMismatch {
                    line,
                    level,
                    expected: expected.to_string(),
                    found: parent_ident,
                });
            }
        }

        let identity = extract(&row, &variant.ident_specs).ok_or(PslError::UnidentifiableRow {
            line,
            target: ExtractionTarget::Identity,
        })?;

        let qty = self.quantity(&row, line)?;
        if qty % parents.len() != 0 {
            return Err(PslError::UnevenDistribution {
                line,
                level,
                entities: qty,
                parents: parents.len(),
            });
        }

        let is_assembly = self.is_assembly(&row, line);
        let description = field(&row, &variant.description_field);
        let base_refdes = field(&row, &variant.refdes_field);

        let mut entities = Vec::with_capacity(qty);
        for index in 0..qty {
            let id = self.tree.create();
            self.tree.define(
                id,
                identity.value.clone(),
                description,
                designator(base_refdes, qty, index),
                identity.domain.clone(),
            )?;
            if is_assembly {
                self.tree.attach_structure(id)?;
            }
            entities.push(id);
        }

        self.distribute(line, level, &parents, &entities)?;
        self.active.replace(level, entities);
        self.rows_processed += 1;
        Ok(())
    }

    fn quantity(&self, row: &RowMap, line: u64) -> PslResult<usize> {
        let column = match &self.variant.quantity {
            QuantityMode::Fixed => return Ok(1),
            QuantityMode::Column(column) => column,
        };

        let raw = field(row, column);
        if raw.is_empty() {
            return Ok(1);
        }
        match parse_count(raw) {
            Some(qty) if qty > 0 && qty as usize <= self.max_quantity => Ok(qty as usize),
            _ => Err(PslError::InvalidQuantity {
                line,
                value: raw.to_string(),
            }),
        }
    }

    fn is_assembly(&mut self, row: &RowMap, line: u64) -> bool {
        let value = field(row, &self.variant.type_field);
        if value.eq_ignore_ascii_case(self.variant.assembly_marker.trim()) {
            return true;
        }
        if !value.eq_ignore_ascii_case(self.variant.part_marker.trim()) {
            self.observer.on_event(&ParseEvent::UnknownItemType {
                line,
                value: value.to_string(),
            });
        }
        false
    }

    /// Insert `entities` into `parents` in contiguous blocks, promoting
    /// parents that do not yet have a structure.
    fn distribute(
        &mut self,
        line: u64,
        level: u32,
        parents: &[EntityId],
        entities: &[EntityId],
    ) -> PslResult<()> {
        let per_parent = entities.len() / parents.len();

        for (parent, block) in parents.iter().zip(entities.chunks(per_parent)) {
            if !self.tree.has_structure(*parent) {
                self.tree.attach_structure(*parent)?;
                self.promotions += 1;

                let (ident, refdes) = self
                    .tree
                    .get(*parent)
                    .map(|e| (e.ident.clone(), e.refdes.clone()))
                    .unwrap_or_default();
                self.observer.on_event(&ParseEvent::StructurePromoted {
                    line,
                    level: level.saturating_sub(1),
                    ident,
                    refdes,
                });
            }

            for child in block {
                self.tree.insert(*parent, *child)?;
            }
        }
        Ok(())
    }

    fn finish(mut self, owner: EntityId) -> ParsedPsl {
        self.transition(ParseState::Done);

        self.observer.on_event(&ParseEvent::Completed {
            rows: self.rows_processed,
            entities: self.tree.len().saturating_sub(1),
        });

        ParsedPsl {
            tree: self.tree,
            owner,
            meta: self.meta,
            rows_processed: self.rows_processed,
            promotions: self.promotions,
        }
    }
}
