//! Property-based tests for the entity arena
//!
//! These check structural guarantees of `EntityTree` for arbitrary shapes:
//! every inserted entity is reachable exactly once from the root, and
//! snapshots agree with the arena.

use proptest::prelude::*;

use crate::{DomainTag, EntityId, EntityTree};

prop_compose! {
    fn arb_domain()(kind in 0..3u8, other in "[a-z]{1,8}") -> Option<DomainTag> {
        match kind {
            0 => None,
            1 => Some(DomainTag::Drawing),
            _ => Some(DomainTag::Other(other)),
        }
    }
}

prop_compose! {
    /// Parent choices for each new entity, always pointing at an earlier node
    fn arb_shape()(size in 1..40usize)(
        parents in prop::collection::vec(any::<prop::sample::Index>(), size),
        domains in prop::collection::vec(arb_domain(), size),
    ) -> Vec<(prop::sample::Index, Option<DomainTag>)> {
        parents.into_iter().zip(domains).collect()
    }
}

fn build(shape: &[(prop::sample::Index, Option<DomainTag>)]) -> (EntityTree, EntityId) {
    let mut tree = EntityTree::new();
    let root = tree.create();
    tree.define(root, "ROOT", "root", None, None).unwrap();
    tree.attach_structure(root).unwrap();

    let mut ids = vec![root];
    for (n, (pick, domain)) in shape.iter().enumerate() {
        let parent = ids[pick.index(ids.len())];
        let child = tree.create();
        tree.define(child, format!("E{}", n), "", Some(format!("R{}", n)), domain.clone())
            .unwrap();
        if !tree.has_structure(parent) {
            tree.attach_structure(parent).unwrap();
        }
        tree.insert(parent, child).unwrap();
        ids.push(child);
    }
    (tree, root)
}

proptest! {
    #[test]
    fn prop_every_entity_reachable_once(shape in arb_shape()) {
        let (tree, root) = build(&shape);

        let mut seen: Vec<usize> = tree.walk(root).map(|(id, _, _)| id.index()).collect();
        seen.sort_unstable();
        let expected: Vec<usize> = (0..tree.len()).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_snapshot_matches_arena(shape in arb_shape()) {
        let (tree, root) = build(&shape);
        let node = tree.snapshot(root).unwrap();

        prop_assert_eq!(node.count(), tree.len());
        prop_assert_eq!(node.children.len(), tree.children(root).len());
    }

    #[test]
    fn prop_same_operations_build_equal_trees(shape in arb_shape()) {
        let (first, _) = build(&shape);
        let (second, _) = build(&shape);
        prop_assert_eq!(first, second);
    }
}
