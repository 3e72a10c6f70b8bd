//! Balancing policies plugged into the tree engine.
//!
//! The engine performs plain binary-search-tree insertion and removal and calls
//! the policy at two points: after a new leaf is linked, and right before a node
//! with at most one child is unlinked. [`RedBlack`] restores the red-black
//! invariants at those points; [`Unbalanced`] does nothing.

use log::trace;

use crate::rbtree_node::{
    child_of, color_of, is_red, parent_of, set_color, side_of, Color, Dir, Link, NodeRef,
};
use crate::rotate;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unbalanced {}
    impl Sealed for super::RedBlack {}
}

/// Hooks the engine calls around structural changes.
pub trait RebalancePolicy: sealed::Sealed {
    /// Called once `node` has been linked in as a new red leaf.
    fn after_insert<K, V>(root: &mut Link<K, V>, node: NodeRef<K, V>);

    /// Called with the node about to be unlinked; it has at most one child and is
    /// still attached to the tree.
    fn before_unlink<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>);
}

/// Plain binary search tree: no rebalancing, colors are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbalanced;

impl RebalancePolicy for Unbalanced {
    fn after_insert<K, V>(_root: &mut Link<K, V>, _node: NodeRef<K, V>) {}

    fn before_unlink<K, V>(_root: &mut Link<K, V>, _node: &NodeRef<K, V>) {}
}

/// Red-black balancing.
///
/// Keeps the root black, forbids red-red parent/child pairs and keeps the
/// black-height equal on every path, which bounds the height by `2·log2(n+1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedBlack;

impl RebalancePolicy for RedBlack {
    fn after_insert<K, V>(root: &mut Link<K, V>, node: NodeRef<K, V>) {
        insert_fixup(root, node);
    }

    fn before_unlink<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>) {
        if color_of(Some(node)) == Color::Red {
            return;
        }
        match child_of(node, Dir::Left).or_else(|| child_of(node, Dir::Right)) {
            // A black node with a single child: that child is red and takes over the black.
            Some(child) => set_color(&child, Color::Black),
            // A black leaf leaves a deficit; fix it while the leaf still marks the spot.
            None => remove_fixup(root, node.clone()),
        }
    }
}

fn insert_fixup<K, V>(root: &mut Link<K, V>, mut node: NodeRef<K, V>) {
    loop {
        let Some(mut parent) = parent_of(&node) else {
            trace!("insert case 1: node is root");
            set_color(&node, Color::Black);
            return;
        };
        if !is_red(Some(&parent)) {
            trace!("insert case 2: parent is black");
            return;
        }
        let Some(grand) = parent_of(&parent) else {
            // Red root; only reachable if the root invariant was already broken.
            debug_assert!(false, "red root during insert fix-up");
            set_color(&parent, Color::Black);
            return;
        };

        let side = side_of(&grand, &parent);
        let uncle = child_of(&grand, side.opposite());
        if let Some(uncle) = uncle.filter(|u| is_red(Some(u))) {
            trace!("insert case 3: red uncle, recolor and move up");
            set_color(&parent, Color::Black);
            set_color(&uncle, Color::Black);
            set_color(&grand, Color::Red);
            node = grand;
            continue;
        }

        if side_of(&parent, &node) != side {
            trace!("insert case 4: inner child, rotate at parent");
            rotate(root, &parent, side);
            std::mem::swap(&mut node, &mut parent);
        }

        trace!("insert case 5: outer child, rotate at grandparent");
        set_color(&parent, Color::Black);
        set_color(&grand, Color::Red);
        rotate(root, &grand, side.opposite());
        return;
    }
}

/// Restores black-height when `node`, a black node, is one black short.
fn remove_fixup<K, V>(root: &mut Link<K, V>, mut node: NodeRef<K, V>) {
    loop {
        let Some(parent) = parent_of(&node) else {
            trace!("remove case 1: deficit reached the root");
            return;
        };
        let side = side_of(&parent, &node);
        let Some(sibling) = child_of(&parent, side.opposite()) else {
            // A black non-root node always has a sibling subtree of equal black-height.
            debug_assert!(false, "black node without sibling");
            return;
        };

        if is_red(Some(&sibling)) {
            trace!("remove case 2: red sibling, rotate at parent");
            set_color(&sibling, Color::Black);
            set_color(&parent, Color::Red);
            rotate(root, &parent, side);
            continue;
        }

        let near = child_of(&sibling, side);
        let far = child_of(&sibling, side.opposite());
        if !is_red(near.as_ref()) && !is_red(far.as_ref()) {
            set_color(&sibling, Color::Red);
            if is_red(Some(&parent)) {
                trace!("remove case 4: red parent absorbs the deficit");
                set_color(&parent, Color::Black);
                return;
            }
            trace!("remove case 3: all black, move deficit up");
            node = parent;
            continue;
        }

        let (sibling, far) = match near {
            Some(near) if !is_red(far.as_ref()) => {
                trace!("remove case 5: red near nephew, rotate at sibling");
                set_color(&near, Color::Black);
                set_color(&sibling, Color::Red);
                rotate(root, &sibling, side.opposite());
                (near, Some(sibling))
            }
            _ => (sibling, far),
        };

        trace!("remove case 6: red far nephew, rotate at parent");
        set_color(&sibling, color_of(Some(&parent)));
        set_color(&parent, Color::Black);
        if let Some(far) = &far {
            set_color(far, Color::Black);
        }
        rotate(root, &parent, side);
        return;
    }
}
