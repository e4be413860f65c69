//! Entity domain models for reconstructed parts structures.
//!
//! An entity is one line item of a bill of materials: an assembly, a
//! sub-assembly or a part. Entities that own children carry a [`Structure`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to an entity stored in an [`EntityTree`](crate::EntityTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Provenance of an entity identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTag {
    /// Identity taken from a drawing reference
    Drawing,
    /// Identity synthesized from a material number or free-text description
    Material,
    Other(String),
}

impl DomainTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Drawing => "drawing",
            Self::Material => "material",
            Self::Other(tag) => tag.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "drawing" => Self::Drawing,
            "material" => Self::Material,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container capability. Only entities with a structure can own children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub(crate) children: Vec<EntityId>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A single node of the reconstructed hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub ident: String,
    pub description: String,
    pub refdes: Option<String>,
    pub domain: Option<DomainTag>,
    pub structure: Option<Structure>,
}

impl Entity {
    pub fn has_structure(&self) -> bool {
        self.structure.is_some()
    }

    /// Children of this entity, empty for entities without a structure
    pub fn children(&self) -> &[EntityId] {
        self.structure
            .as_ref()
            .map(|s| s.children())
            .unwrap_or(&[])
    }
}
