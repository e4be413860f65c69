use psl_models::TreeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which extracted value could not be derived from a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTarget {
    OwnerIdentity,
    Identity,
    ParentIdentity,
}

impl std::fmt::Display for ExtractionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnerIdentity => write!(f, "owner identity"),
            Self::Identity => write!(f, "identity"),
            Self::ParentIdentity => write!(f, "parent identity"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PslError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("CSV error at line {line:?}: {message}")]
    Csv { line: Option<u64>, message: String },

    #[error("Metadata label mismatch at line {line}: found '{found}', expected '{expected}'")]
    Metadata {
        found: String,
        expected: String,
        line: u64,
    },

    #[error("Metadata block truncated: expected label '{expected}' but input ended")]
    MetadataTruncated { expected: String },

    #[error("Column header row missing after metadata block")]
    MissingHeader,

    #[error("Parent mismatch at line {line} (level {level}): expected '{expected}', found '{found}'")]
    ParentMismatch {
        line: u64,
        level: u32,
        expected: String,
        found: String,
    },

    #[error("No active parent for level {level} at line {line}; rows out of level order")]
    MissingParentLevel { line: u64, level: u32 },

    #[error("Cannot distribute {entities} entities over {parents} parents at line {line} (level {level})")]
    UnevenDistribution {
        line: u64,
        level: u32,
        entities: usize,
        parents: usize,
    },

    #[error("Unable to derive {target} at line {line}")]
    UnidentifiableRow { line: u64, target: ExtractionTarget },

    #[error("Invalid level '{value}' at line {line}")]
    InvalidLevel { line: u64, value: String },

    #[error("Invalid quantity '{value}' at line {line}")]
    InvalidQuantity { line: u64, value: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown format variant: {name}")]
    UnknownVariant { name: String },

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

impl PslError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_variant(name: impl Into<String>) -> Self {
        Self::UnknownVariant { name: name.into() }
    }

    pub fn metadata(found: impl Into<String>, expected: impl Into<String>, line: u64) -> Self {
        Self::Metadata {
            found: found.into(),
            expected: expected.into(),
            line,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Csv { .. } => "CSV_ERROR",
            Self::Metadata { .. } => "METADATA_FORMAT_ERROR",
            Self::MetadataTruncated { .. } => "METADATA_TRUNCATED",
            Self::MissingHeader => "MISSING_HEADER",
            Self::ParentMismatch { .. } => "PARENT_MISMATCH",
            Self::MissingParentLevel { .. } => "MISSING_PARENT_LEVEL",
            Self::UnevenDistribution { .. } => "UNEVEN_DISTRIBUTION",
            Self::UnidentifiableRow { .. } => "UNIDENTIFIABLE_ROW",
            Self::InvalidLevel { .. } => "INVALID_LEVEL",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::UnknownVariant { .. } => "UNKNOWN_VARIANT",
            Self::Tree(_) => "TREE_ERROR",
        }
    }

    /// True for errors signalling that the file's level structure is inconsistent
    pub fn is_hierarchy_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::ParentMismatch { .. }
                | Self::MissingParentLevel { .. }
                | Self::UnevenDistribution { .. }
        )
    }

    pub fn is_metadata_error(&self) -> bool {
        matches!(self, Self::Metadata { .. } | Self::MetadataTruncated { .. })
    }
}

pub type PslResult<T> = Result<T, PslError>;

// Conversion from common error types
impl From<std::io::Error> for PslError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<csv::Error> for PslError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|p| p.line());
        Self::Csv {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PslError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::configuration(error.to_string())
    }
}

impl From<config::ConfigError> for PslError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_classification() {
        let err = PslError::ParentMismatch {
            line: 7,
            level: 2,
            expected: "SUB-1".to_string(),
            found: "SUB-2".to_string(),
        };
        assert!(err.is_hierarchy_inconsistency());
        assert_eq!(err.error_code(), "PARENT_MISMATCH");
        assert!(err.to_string().contains("expected 'SUB-1', found 'SUB-2'"));

        let err = PslError::metadata("rev", "revision", 2);
        assert!(!err.is_hierarchy_inconsistency());
        assert!(err.is_metadata_error());
    }

    #[test]
    fn test_tree_error_conversion() {
        let err: PslError = TreeError::NoStructure {
            ident: "BOLT".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "TREE_ERROR");
    }
}
