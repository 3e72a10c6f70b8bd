use std::cell::Cell;
use std::rc::Rc;

use crate::rbtree_error::TreeError;
use crate::rbtree_node::{extreme, step, Dir, Link, NodeRef};

enum Position<K, V> {
    BeforeFirst,
    At(NodeRef<K, V>),
    AfterLast,
}

/// A bidirectional cursor over a tree's entries.
///
/// The cursor starts before the first entry. Moves are computed from parent and
/// child links only, and report `Ok(false)` instead of wrapping when they run
/// off either end. Like [`Enumerator`](crate::Enumerator), it does not borrow the
/// tree and fails with [`TreeError::InvalidatedByMutation`] after the tree changes.
pub struct Cursor<K, V> {
    root: Link<K, V>,
    position: Position<K, V>,
    generation: Rc<Cell<u64>>,
    observed: u64,
}

impl<K, V> Cursor<K, V> {
    pub(super) fn new(root: Link<K, V>, generation: Rc<Cell<u64>>) -> Self {
        let observed = generation.get();
        Cursor {
            root,
            position: Position::BeforeFirst,
            generation,
            observed,
        }
    }

    /// Returns true once the tree has changed since this cursor was created.
    pub fn is_stale(&self) -> bool {
        self.generation.get() != self.observed
    }

    fn check(&self) -> Result<(), TreeError> {
        if self.is_stale() {
            Err(TreeError::InvalidatedByMutation)
        } else {
            Ok(())
        }
    }

    fn land(&mut self, node: Link<K, V>, past: Position<K, V>) -> bool {
        match node {
            Some(node) => {
                self.position = Position::At(node);
                true
            }
            None => {
                self.position = past;
                false
            }
        }
    }

    /// Moves to the in-order successor, or past the last entry.
    pub fn move_next(&mut self) -> Result<bool, TreeError> {
        self.check()?;
        let next = match &self.position {
            Position::BeforeFirst => self.root.as_ref().map(|r| extreme(r, Dir::Left)),
            Position::At(node) => step(node, Dir::Right),
            Position::AfterLast => return Ok(false),
        };
        Ok(self.land(next, Position::AfterLast))
    }

    /// Moves to the in-order predecessor, or before the first entry.
    pub fn move_prev(&mut self) -> Result<bool, TreeError> {
        self.check()?;
        let prev = match &self.position {
            Position::AfterLast => self.root.as_ref().map(|r| extreme(r, Dir::Right)),
            Position::At(node) => step(node, Dir::Left),
            Position::BeforeFirst => return Ok(false),
        };
        Ok(self.land(prev, Position::BeforeFirst))
    }

    /// Moves to the smallest key. Returns false on an empty tree.
    pub fn move_to_min(&mut self) -> Result<bool, TreeError> {
        self.check()?;
        let min = self.root.as_ref().map(|r| extreme(r, Dir::Left));
        Ok(self.land(min, Position::BeforeFirst))
    }

    /// Moves to the largest key. Returns false on an empty tree.
    pub fn move_to_max(&mut self) -> Result<bool, TreeError> {
        self.check()?;
        let max = self.root.as_ref().map(|r| extreme(r, Dir::Right));
        Ok(self.land(max, Position::AfterLast))
    }

    /// Moves to the root entry. Returns false on an empty tree.
    pub fn move_to_root(&mut self) -> Result<bool, TreeError> {
        self.check()?;
        let root = self.root.clone();
        Ok(self.land(root, Position::BeforeFirst))
    }

    // `f` must not reach back into the tree: the node stays borrowed while it runs.
    fn read<R>(&self, f: impl FnOnce(&K, &V) -> R) -> Result<Option<R>, TreeError> {
        self.check()?;
        Ok(match &self.position {
            Position::At(node) => {
                let n = node.borrow();
                Some(f(&n.key, &n.value))
            }
            _ => None,
        })
    }

    /// Returns a clone of the current key, or `Ok(None)` when the cursor is
    /// before the first or after the last entry.
    pub fn key(&self) -> Result<Option<K>, TreeError>
    where
        K: Clone,
    {
        self.read(|k, _| k.clone())
    }

    /// Returns a clone of the current entry.
    pub fn current(&self) -> Result<Option<(K, V)>, TreeError>
    where
        K: Clone,
        V: Clone,
    {
        self.read(|k, v| (k.clone(), v.clone()))
    }
}
