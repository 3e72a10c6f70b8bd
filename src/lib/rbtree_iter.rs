use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::rbtree_error::TreeError;
use crate::rbtree_node::{child_of, entry, Dir, Link, NodeRef};

/// Pending-visit stack shared by the borrowed and detached in-order walks.
struct InorderStack<K, V> {
    // Stack of ancestors whose left subtree is being visited
    stack: Vec<NodeRef<K, V>>,
    // Subtree to descend into on the next step
    descend: Link<K, V>,
}

impl<K, V> InorderStack<K, V> {
    fn new(root: Link<K, V>) -> Self {
        InorderStack {
            stack: Vec::new(),
            descend: root,
        }
    }

    fn next_node(&mut self) -> Option<NodeRef<K, V>> {
        while let Some(node) = self.descend.take() {
            self.descend = child_of(&node, Dir::Left);
            self.stack.push(node);
        }
        let node = self.stack.pop()?;
        self.descend = child_of(&node, Dir::Right);
        Some(node)
    }
}

/// In-order iterator over a borrowed tree.
pub struct Iter<'a, K, V> {
    inner: InorderStack<K, V>,
    remaining: usize,
    marker: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(root: Link<K, V>, length: usize) -> Self {
        Iter {
            inner: InorderStack::new(root),
            remaining: length,
            marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.inner.next_node()?;
        self.remaining = self.remaining.saturating_sub(1);
        // SAFETY: the iterator holds a shared borrow of the tree for 'a, so the
        // node cannot be mutated or released meanwhile.
        Some(unsafe { entry(&node) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> ExactSizeIterator for Iter<'a, K, V> {}

/// Detached in-order enumerator.
///
/// Holds its own handles to the nodes instead of a borrow of the tree, so the
/// tree may be modified while it exists; every step first compares the tree's
/// generation with the one observed at creation and fails fast on mismatch.
pub struct Enumerator<K, V> {
    inner: InorderStack<K, V>,
    generation: Rc<Cell<u64>>,
    observed: u64,
    failed: bool,
}

impl<K, V> Enumerator<K, V> {
    pub(super) fn new(root: Link<K, V>, generation: Rc<Cell<u64>>) -> Self {
        let observed = generation.get();
        Enumerator {
            inner: InorderStack::new(root),
            generation,
            observed,
            failed: false,
        }
    }

    /// Returns true once the tree has changed since this enumerator was created.
    pub fn is_stale(&self) -> bool {
        self.generation.get() != self.observed
    }

    // `f` must not reach back into the tree: the node stays borrowed while it runs.
    fn advance_with<R>(&mut self, f: impl FnOnce(&K, &V) -> R) -> Result<Option<R>, TreeError> {
        if self.is_stale() {
            return Err(TreeError::InvalidatedByMutation);
        }
        Ok(self.inner.next_node().map(|node| {
            let n = node.borrow();
            f(&n.key, &n.value)
        }))
    }

    /// Returns a clone of the next entry in key order, or `Ok(None)` when the
    /// walk is finished.
    pub fn advance(&mut self) -> Result<Option<(K, V)>, TreeError>
    where
        K: Clone,
        V: Clone,
    {
        self.advance_with(|k, v| (k.clone(), v.clone()))
    }
}

/// Yields `Err(InvalidatedByMutation)` once and then stops.
impl<K: Clone, V: Clone> Iterator for Enumerator<K, V> {
    type Item = Result<(K, V), TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.advance().transpose();
        if let Some(Err(_)) = item {
            self.failed = true;
        }
        item
    }
}
