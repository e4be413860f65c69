//! Arena-backed entity tree.
//!
//! Entities are stored in insertion order and addressed by [`EntityId`].
//! Parent to child links live in each parent's [`Structure`], so handles stay
//! valid for the lifetime of the tree and two trees built by the same sequence
//! of operations compare equal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{DomainTag, Entity, EntityId, Structure};

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeError {
    #[error("Entity '{ident}' has no structure to insert children into")]
    NoStructure { ident: String },

    #[error("Unknown entity: {id}")]
    UnknownEntity { id: EntityId },

    #[error("Entity '{ident}' cannot be inserted into itself")]
    SelfInsert { ident: String },

    #[error("Subtree is {depth} levels deep, snapshots are limited to {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Deepest subtree [`EntityTree::snapshot`] will nest
pub const MAX_SNAPSHOT_DEPTH: usize = 512;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTree {
    nodes: Vec<Entity>,
}

/// Owned, nested view of a subtree used for display and comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityNode {
    pub ident: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refdes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainTag>,
    pub has_structure: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<EntityNode>,
}

impl EntityTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a blank entity without a structure
    pub fn create(&mut self) -> EntityId {
        let id = EntityId(self.nodes.len());
        self.nodes.push(Entity::default());
        id
    }

    /// Set the descriptive fields of an entity
    pub fn define(
        &mut self,
        id: EntityId,
        ident: impl Into<String>,
        description: impl Into<String>,
        refdes: Option<String>,
        domain: Option<DomainTag>,
    ) -> TreeResult<()> {
        let entity = self.get_mut(id)?;
        entity.ident = ident.into();
        entity.description = description.into();
        entity.refdes = refdes;
        entity.domain = domain;
        Ok(())
    }

    /// Attach an empty structure. An existing structure is left untouched.
    pub fn attach_structure(&mut self, id: EntityId) -> TreeResult<()> {
        let entity = self.get_mut(id)?;
        if entity.structure.is_none() {
            entity.structure = Some(Structure::new());
        }
        Ok(())
    }

    pub fn has_structure(&self, id: EntityId) -> bool {
        self.get(id).map(Entity::has_structure).unwrap_or(false)
    }

    /// Append `child` to the structure of `parent`
    pub fn insert(&mut self, parent: EntityId, child: EntityId) -> TreeResult<()> {
        if parent == child {
            return Err(TreeError::SelfInsert {
                ident: self.get_mut(parent)?.ident.clone(),
            });
        }
        self.get_mut(child)?;

        let entity = self.get_mut(parent)?;
        match entity.structure.as_mut() {
            Some(structure) => {
                structure.children.push(child);
                Ok(())
            }
            None => Err(TreeError::NoStructure {
                ident: entity.ident.clone(),
            }),
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.nodes.get(id.0)
    }

    fn get_mut(&mut self, id: EntityId) -> TreeResult<&mut Entity> {
        self.nodes
            .get_mut(id.0)
            .ok_or(TreeError::UnknownEntity { id })
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.get(id).map(Entity::children).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first pre-order walk from `root`, yielding each entity with its depth
    pub fn walk(&self, root: EntityId) -> Walk<'_> {
        let stack = if self.get(root).is_some() {
            vec![(root, 0)]
        } else {
            Vec::new()
        };
        Walk { tree: self, stack }
    }

    /// Build an owned nested copy of the subtree rooted at `id`. The depth is
    /// checked with an iterative walk first, since building, comparing,
    /// serializing and dropping an `EntityNode` all recurse per level.
    pub fn snapshot(&self, id: EntityId) -> TreeResult<EntityNode> {
        let entity = self.get(id).ok_or(TreeError::UnknownEntity { id })?;
        if let Some(depth) = self
            .walk(id)
            .map(|(_, depth, _)| depth)
            .find(|depth| *depth > MAX_SNAPSHOT_DEPTH)
        {
            return Err(TreeError::TooDeep {
                depth,
                limit: MAX_SNAPSHOT_DEPTH,
            });
        }
        Ok(self.snapshot_node(entity))
    }

    fn snapshot_node(&self, entity: &Entity) -> EntityNode {
        let children = entity
            .children()
            .iter()
            .filter_map(|child| self.get(*child))
            .map(|child| self.snapshot_node(child))
            .collect();

        EntityNode {
            ident: entity.ident.clone(),
            description: entity.description.clone(),
            refdes: entity.refdes.clone(),
            domain: entity.domain.clone(),
            has_structure: entity.has_structure(),
            children,
        }
    }
}

pub struct Walk<'a> {
    tree: &'a EntityTree,
    stack: Vec<(EntityId, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (EntityId, usize, &'a Entity);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let entity = self.tree.get(id)?;
        for child in entity.children().iter().rev() {
            self.stack.push((*child, depth + 1));
        }
        Some((id, depth, entity))
    }
}

impl EntityNode {
    /// Number of nodes in this subtree, including itself
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(EntityNode::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembly(tree: &mut EntityTree, ident: &str) -> EntityId {
        let id = tree.create();
        tree.define(id, ident, "", None, None).unwrap();
        tree.attach_structure(id).unwrap();
        id
    }

    fn part(tree: &mut EntityTree, ident: &str, refdes: &str) -> EntityId {
        let id = tree.create();
        tree.define(id, ident, "", Some(refdes.to_string()), Some(DomainTag::Material))
            .unwrap();
        id
    }

    #[test]
    fn test_insert_requires_structure() {
        let mut tree = EntityTree::new();
        let bolt = part(&mut tree, "BOLT", "B1");
        let nut = part(&mut tree, "NUT", "N1");

        let err = tree.insert(bolt, nut).unwrap_err();
        assert_eq!(err, TreeError::NoStructure { ident: "BOLT".to_string() });

        tree.attach_structure(bolt).unwrap();
        assert!(tree.insert(bolt, nut).is_ok());
        assert_eq!(tree.children(bolt), &[nut]);
    }

    #[test]
    fn test_attach_structure_keeps_children() {
        let mut tree = EntityTree::new();
        let root = assembly(&mut tree, "ROOT");
        let bolt = part(&mut tree, "BOLT", "B1");
        tree.insert(root, bolt).unwrap();

        tree.attach_structure(root).unwrap();
        assert_eq!(tree.children(root).len(), 1);
    }

    #[test]
    fn test_unknown_and_self_insert() {
        let mut tree = EntityTree::new();
        let root = assembly(&mut tree, "ROOT");

        assert!(matches!(
            tree.insert(root, EntityId(42)),
            Err(TreeError::UnknownEntity { .. })
        ));
        assert!(matches!(tree.insert(root, root), Err(TreeError::SelfInsert { .. })));
        assert!(!tree.has_structure(EntityId(42)));
    }

    #[test]
    fn test_walk_is_depth_first() {
        let mut tree = EntityTree::new();
        let root = assembly(&mut tree, "ROOT");
        let sub = assembly(&mut tree, "SUB");
        let a = part(&mut tree, "A", "A1");
        let b = part(&mut tree, "B", "B1");
        tree.insert(root, sub).unwrap();
        tree.insert(sub, a).unwrap();
        tree.insert(root, b).unwrap();

        let order: Vec<(String, usize)> = tree
            .walk(root)
            .map(|(_, depth, e)| (e.ident.clone(), depth))
            .collect();

        assert_eq!(
            order,
            vec![
                ("ROOT".to_string(), 0),
                ("SUB".to_string(), 1),
                ("A".to_string(), 2),
                ("B".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_snapshot_nests_children() {
        let mut tree = EntityTree::new();
        let root = assembly(&mut tree, "ROOT");
        let a = part(&mut tree, "A", "A1");
        tree.insert(root, a).unwrap();

        let node = tree.snapshot(root).unwrap();
        assert_eq!(node.count(), 2);
        assert_eq!(
            tree.snapshot(EntityId(9)),
            Err(TreeError::UnknownEntity { id: EntityId(9) })
        );
        assert_eq!(node.children[0].refdes.as_deref(), Some("A1"));
        assert!(!node.children[0].has_structure);

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["children"][0]["domain"], "material");
    }

    #[test]
    fn test_snapshot_rejects_deep_chains() {
        let mut tree = EntityTree::new();
        let root = assembly(&mut tree, "L0");
        let mut parent = root;
        for level in 1..=MAX_SNAPSHOT_DEPTH + 1 {
            let child = assembly(&mut tree, &format!("L{}", level));
            tree.insert(parent, child).unwrap();
            parent = child;
        }

        assert_eq!(
            tree.snapshot(root),
            Err(TreeError::TooDeep {
                depth: MAX_SNAPSHOT_DEPTH + 1,
                limit: MAX_SNAPSHOT_DEPTH,
            })
        );
        assert_eq!(tree.walk(root).count(), MAX_SNAPSHOT_DEPTH + 2);

        let below = tree.children(root)[0];
        assert_eq!(tree.snapshot(below).unwrap().count(), MAX_SNAPSHOT_DEPTH + 1);
    }
}
