//! An ordered map built on a binary search tree with a pluggable balancing policy.
//!
//! [`RedBlackTree`] keeps itself balanced with the classic red-black fix-ups;
//! [`BinarySearchTree`] shares the same engine without rebalancing. Both offer a
//! borrowed in-order iterator plus a detached [`Enumerator`] and [`Cursor`] that
//! fail with [`TreeError::InvalidatedByMutation`] once the tree changes shape.
#![warn(missing_docs)]

use std::cell::Cell;
use std::cmp::{self, Ordering};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::rc::{Rc, Weak};

use log::debug;

mod rbtree_balance;
mod rbtree_cursor;
mod rbtree_error;
mod rbtree_iter;
mod rbtree_node;

pub use rbtree_balance::{RebalancePolicy, RedBlack, Unbalanced};
pub use rbtree_cursor::Cursor;
pub use rbtree_error::TreeError;
pub use rbtree_iter::{Enumerator, Iter};
pub use rbtree_node::{Color, Link, Node, NodeRef};

use rbtree_node::{child_of, entry, extreme, parent_of, set_parent, side_of, Dir};

/// Three-way comparison used to order keys.
///
/// Implemented for [`NaturalOrder`] and for any `Fn(&K, &K) -> Ordering`.
pub trait Comparator<K: ?Sized> {
    /// Compares `a` with `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// An ordered map whose shape is maintained by the policy `P`.
pub struct Tree<K, V, P = RedBlack, C = NaturalOrder> {
    root: Link<K, V>,
    length: usize,
    generation: Rc<Cell<u64>>,
    compare: C,
    policy: PhantomData<P>,
}

/// A self-balancing red-black tree map.
pub type RedBlackTree<K, V, C = NaturalOrder> = Tree<K, V, RedBlack, C>;

/// A binary search tree map without rebalancing.
pub type BinarySearchTree<K, V, C = NaturalOrder> = Tree<K, V, Unbalanced, C>;

impl<K: Ord, V, P: RebalancePolicy> Tree<K, V, P, NaturalOrder> {
    /// Creates an empty tree ordered by `K: Ord`.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Ord, V, P: RebalancePolicy> Default for Tree<K, V, P, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P, C> Tree<K, V, P, C> {
    /// Creates an empty tree ordered by `compare`, which is fixed for the tree's lifetime.
    pub fn with_comparator(compare: C) -> Self {
        Tree {
            root: None,
            length: 0,
            generation: Rc::new(Cell::new(0)),
            compare,
            policy: PhantomData,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Longest root-to-leaf path in edges: `-1` when empty, `0` for a single node.
    pub fn height(&self) -> isize {
        let mut deepest = -1;
        let mut stack: Vec<(NodeRef<K, V>, isize)> =
            self.root.iter().map(|r| (r.clone(), 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            deepest = cmp::max(deepest, depth);
            let n = node.borrow();
            for c in [&n.left, &n.right].into_iter().flatten() {
                stack.push((c.clone(), depth + 1));
            }
        }
        deepest
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        debug!("clearing tree with {} entries", self.length);
        teardown(self.root.take());
        self.length = 0;
        self.touch();
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let node = extreme(self.root.as_ref()?, Dir::Left);
        // SAFETY: the node is owned by `self`, which stays borrowed for the result.
        Some(unsafe { entry(&node) })
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let node = extreme(self.root.as_ref()?, Dir::Right);
        // SAFETY: as in `first_key_value`.
        Some(unsafe { entry(&node) })
    }

    /// Returns the entry at in-order position `index`.
    pub fn nth(&self, index: usize) -> Result<(&K, &V), TreeError> {
        self.iter().nth(index).ok_or(TreeError::IndexOutOfRange {
            index,
            len: self.length,
        })
    }

    /// Returns an in-order iterator over the entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.clone(), self.length)
    }

    /// Returns a detached in-order enumerator yielding cloned entries.
    ///
    /// It does not borrow the tree; any later insert, remove or clear makes it
    /// fail with [`TreeError::InvalidatedByMutation`].
    pub fn enumerator(&self) -> Enumerator<K, V> {
        Enumerator::new(self.root.clone(), self.generation.clone())
    }

    /// Returns a bidirectional cursor positioned before the first entry.
    ///
    /// Like [`Tree::enumerator`], the cursor is invalidated by structural mutation.
    pub fn cursor(&self) -> Cursor<K, V> {
        Cursor::new(self.root.clone(), self.generation.clone())
    }

    fn touch(&mut self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }
}

impl<K, V, P: RebalancePolicy, C: Comparator<K>> Tree<K, V, P, C> {
    fn find(&self, key: &K) -> Link<K, V> {
        let mut current = self.root.clone();
        while let Some(node) = current {
            let ord = self.compare.compare(key, &node.borrow().key);
            current = match ord {
                Ordering::Less => child_of(&node, Dir::Left),
                Ordering::Greater => child_of(&node, Dir::Right),
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// Returns a reference to the value for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let node = self.find(key)?;
        // SAFETY: the node is owned by `self`, which stays borrowed for the result.
        Some(unsafe { entry(&node) }.1)
    }

    /// Returns a mutable reference to the value for `key`.
    ///
    /// The shape is unchanged, but outstanding cursors and enumerators are
    /// invalidated since they could otherwise read the value while it is borrowed.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.find(key)?;
        self.touch();
        let mut n = node.borrow_mut();
        let ptr: *mut V = &mut n.value;
        drop(n);
        // SAFETY: `self` is borrowed mutably for the result and every detached
        // reader has just been invalidated, so nothing else can reach the value.
        Some(unsafe { &mut *ptr })
    }

    /// Returns the value for `key`, or [`TreeError::KeyNotFound`].
    pub fn get_required(&self, key: &K) -> Result<&V, TreeError> {
        self.get(key).ok_or(TreeError::KeyNotFound)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a new entry; an existing equal key is left untouched and reported
    /// as [`TreeError::DuplicateKey`].
    pub fn insert(&mut self, key: K, value: V) -> Result<(), TreeError> {
        let mut parent = None;
        let mut side = Dir::Left;
        let mut current = self.root.clone();
        while let Some(node) = current {
            side = match self.compare.compare(&key, &node.borrow().key) {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => return Err(TreeError::DuplicateKey),
            };
            current = child_of(&node, side);
            parent = Some(node);
        }

        let node = Node::new(key, value, Color::Red);
        match &parent {
            Some(p) => {
                set_parent(&node, Some(p));
                *p.borrow_mut().child_mut(side) = Some(node.clone());
            }
            None => self.root = Some(node.clone()),
        }
        self.length += 1;
        self.touch();
        P::after_insert(&mut self.root, node);
        Ok(())
    }

    /// Removes the entry for `key`. Returns false if it was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(target) = self.find(key) else {
            return false;
        };

        // With two children, the in-order successor's entry moves into `target`
        // and the successor node, which has no left child, is unlinked instead.
        let doomed = match (child_of(&target, Dir::Left), child_of(&target, Dir::Right)) {
            (Some(_), Some(right)) => {
                let successor = extreme(&right, Dir::Left);
                swap_entries(&target, &successor);
                successor
            }
            _ => target,
        };

        P::before_unlink(&mut self.root, &doomed);
        unlink(&mut self.root, &doomed);
        self.length -= 1;
        self.touch();
        true
    }
}

impl<K, V, P, C> Drop for Tree<K, V, P, C> {
    fn drop(&mut self) {
        // Outstanding cursors and enumerators must see the tree as gone.
        self.generation.set(self.generation.get().wrapping_add(1));
        teardown(self.root.take());
    }
}

/// Drops a subtree without recursing, so degenerate chains cannot overflow the stack.
fn teardown<K, V>(root: Link<K, V>) {
    let mut stack: Vec<NodeRef<K, V>> = root.into_iter().collect();
    let mut dropped = 0usize;
    while let Some(node) = stack.pop() {
        let mut n = node.borrow_mut();
        stack.extend(n.left.take());
        stack.extend(n.right.take());
        n.parent = Weak::new();
        dropped += 1;
    }
    if dropped > 0 {
        debug!("released {} nodes", dropped);
    }
}

fn swap_entries<K, V>(a: &NodeRef<K, V>, b: &NodeRef<K, V>) {
    let mut a = a.borrow_mut();
    let mut b = b.borrow_mut();
    mem::swap(&mut a.key, &mut b.key);
    mem::swap(&mut a.value, &mut b.value);
}

/// Points the slot that holds `old` (a child of `parent`, or the root) at `new`.
fn replace_child<K, V>(
    root: &mut Link<K, V>,
    parent: Option<&NodeRef<K, V>>,
    old: &NodeRef<K, V>,
    new: Link<K, V>,
) {
    match parent {
        None => *root = new,
        Some(p) => {
            let side = side_of(p, old);
            *p.borrow_mut().child_mut(side) = new;
        }
    }
}

/// Splices out `node`, which has at most one child.
fn unlink<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>) {
    let (child, parent) = {
        let mut n = node.borrow_mut();
        debug_assert!(n.left.is_none() || n.right.is_none());
        let child = match n.left.take() {
            Some(left) => Some(left),
            None => n.right.take(),
        };
        (child, n.parent.upgrade())
    };
    if let Some(child) = &child {
        set_parent(child, parent.as_ref());
    }
    replace_child(root, parent.as_ref(), node, child);
    node.borrow_mut().parent = Weak::new();
}

/// Rotates around `node`, moving it one level down towards `dir` and promoting
/// its child on the other side. In-order sequence is unchanged.
pub(crate) fn rotate<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>, dir: Dir) {
    let up = dir.opposite();
    let pivot = node.borrow_mut().child_mut(up).take();
    let Some(pivot) = pivot else {
        debug_assert!(false, "rotation without a child to promote");
        return;
    };

    //        g                 g
    //        |                 |
    //      node              pivot
    //     /    \     -->    /     \
    //    a    pivot       node     c
    //        /     \     /    \
    //     inner     c   a    inner
    let inner = pivot.borrow_mut().child_mut(dir).take();
    if let Some(inner) = &inner {
        set_parent(inner, Some(node));
    }
    *node.borrow_mut().child_mut(up) = inner;

    let grand = parent_of(node);
    set_parent(&pivot, grand.as_ref());
    replace_child(root, grand.as_ref(), node, Some(pivot.clone()));

    set_parent(node, Some(&pivot));
    *pivot.borrow_mut().child_mut(dir) = Some(node.clone());
}

/// Promotes the right child of `node`.
#[cfg(test)]
pub(crate) fn rotate_left<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>) {
    rotate(root, node, Dir::Left);
}

/// Promotes the left child of `node`.
#[cfg(test)]
pub(crate) fn rotate_right<K, V>(root: &mut Link<K, V>, node: &NodeRef<K, V>) {
    rotate(root, node, Dir::Right);
}

impl<'a, K, V, P, C> IntoIterator for &'a Tree<K, V, P, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, P, C> fmt::Debug for Tree<K, V, P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, P, C> Tree<K, V, P, C> {
    #[cfg(test)]
    /// Collects `(key, color)` per depth for debugging.
    pub(crate) fn layers(&self) -> Vec<Vec<(K, Color)>>
    where
        K: Clone,
    {
        let mut result = Vec::new();
        if let Some(ref root) = self.root {
            root.borrow().layers(0, &mut result);
        }
        result
    }
}
