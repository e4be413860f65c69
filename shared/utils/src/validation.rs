//! Validation sink and helpers.
//!
//! `ValidationContext` collects structured, non-fatal issues found while
//! reading a file. Callers inspect it after a parse returns.

use crate::error::{PslError, PslResult};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    RequiredColumnMissing,
    DuplicateColumn,
}

/// Single validation issue. Every issue makes the header unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub source: Option<String>,
    pub columns: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationContext {
    source: Option<String>,
    issues: Vec<ValidationIssue>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose issues are attributed to `source`, usually a file path
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            issues: Vec::new(),
        }
    }

    pub fn required_column_missing(&mut self, columns: Vec<String>) {
        let message = format!("Missing required columns: {}", columns.join(", "));
        self.push(IssueCode::RequiredColumnMissing, columns, message);
    }

    pub fn duplicate_column(&mut self, columns: Vec<String>) {
        let message = format!("Duplicate column names in header: {}", columns.join(", "));
        self.push(IssueCode::DuplicateColumn, columns, message);
    }

    fn push(&mut self, code: IssueCode, columns: Vec<String>, message: String) {
        self.issues.push(ValidationIssue {
            code,
            source: self.source.clone(),
            columns,
            message,
        });
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn error_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }
}

pub fn validate_model<T: Validate>(model: &T) -> PslResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(PslError::configuration(format_validation_errors(&errors))),
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match &error.code {
                std::borrow::Cow::Borrowed("length") => {
                    format!("Field '{}' must not be empty", field)
                }
                _ => match &error.message {
                    Some(detail) => format!("Invalid field '{}': {}", field, detail),
                    None => format!("Validation failed for field '{}': {}", field, error.code),
                },
            };
            messages.push(message);
        }
    }
    messages.sort();

    messages.join(", ")
}

/// Required columns absent from `header`, in required order
pub fn missing_columns(header: &[String], required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|column| !header.contains(column))
        .cloned()
        .collect()
}

/// Column names that occur more than once in `header`, in first-seen order
pub fn duplicate_columns(header: &[String]) -> Vec<String> {
    let mut duplicates: Vec<String> = Vec::new();
    for (i, column) in header.iter().enumerate() {
        if header[..i].contains(column) && !duplicates.contains(column) {
            duplicates.push(column.clone());
        }
    }
    duplicates
}
