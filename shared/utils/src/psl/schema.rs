//! Column header checks and row projection.

use csv::StringRecord;
use indexmap::IndexMap;

use crate::validation::{duplicate_columns, missing_columns, ValidationContext};

/// Row values keyed by column name, in header order
pub type RowMap = IndexMap<String, String>;

/// Authoritative column order taken from an accepted header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCheck {
    Usable(ColumnIndex),
    Unusable {
        missing: Vec<String>,
        duplicates: Vec<String>,
    },
}

/// Check `header` against the required columns, reporting problems to `vctx`
pub fn check_header(
    header: &StringRecord,
    required: &[String],
    vctx: &mut ValidationContext,
) -> HeaderCheck {
    let columns: Vec<String> = header.iter().map(str::to_string).collect();

    let missing = missing_columns(&columns, required);
    let duplicates = duplicate_columns(&columns);

    if !missing.is_empty() {
        vctx.required_column_missing(missing.clone());
    }
    if !duplicates.is_empty() {
        vctx.duplicate_column(duplicates.clone());
    }

    if missing.is_empty() && duplicates.is_empty() {
        HeaderCheck::Usable(ColumnIndex { columns })
    } else {
        HeaderCheck::Unusable { missing, duplicates }
    }
}

impl ColumnIndex {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Map cells to column names. Short rows get empty values for the
    /// missing tail; cells beyond the header are dropped.
    pub fn project(&self, record: &StringRecord) -> RowMap {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), record.get(i).unwrap_or("").to_string()))
            .collect()
    }
}
