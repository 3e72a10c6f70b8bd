use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared handle to a tree node. Children own their subtree through these.
pub type NodeRef<K, V> = Rc<RefCell<Node<K, V>>>;

/// A child slot (or the root slot) of the tree.
pub type Link<K, V> = Option<NodeRef<K, V>>;

/// Node color. Only the red-black policy reads it; absent children count as `Black`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Red node.
    Red,
    /// Black node.
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Dir {
    pub(crate) fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// A single entry of the tree together with its structural links.
///
/// The parent link is a `Weak` back-reference: it is only used to walk upward
/// (rotations, cursor moves) and never keeps a node alive.
pub struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: Color,
    pub(crate) parent: Weak<RefCell<Node<K, V>>>,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V, color: Color) -> NodeRef<K, V> {
        Rc::new(RefCell::new(Node {
            key,
            value,
            color,
            parent: Weak::new(),
            left: None,
            right: None,
        }))
    }

    pub(crate) fn child(&self, dir: Dir) -> &Link<K, V> {
        match dir {
            Dir::Left => &self.left,
            Dir::Right => &self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, dir: Dir) -> &mut Link<K, V> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }
}

pub(crate) fn child_of<K, V>(node: &NodeRef<K, V>, dir: Dir) -> Link<K, V> {
    node.borrow().child(dir).clone()
}

pub(crate) fn parent_of<K, V>(node: &NodeRef<K, V>) -> Link<K, V> {
    node.borrow().parent.upgrade()
}

pub(crate) fn set_parent<K, V>(node: &NodeRef<K, V>, parent: Option<&NodeRef<K, V>>) {
    node.borrow_mut().parent = parent.map(Rc::downgrade).unwrap_or_default();
}

/// Color of a possibly absent node; a missing child is a black leaf.
pub(crate) fn color_of<K, V>(link: Option<&NodeRef<K, V>>) -> Color {
    link.map_or(Color::Black, |n| n.borrow().color)
}

pub(crate) fn is_red<K, V>(link: Option<&NodeRef<K, V>>) -> bool {
    color_of(link) == Color::Red
}

pub(crate) fn set_color<K, V>(node: &NodeRef<K, V>, color: Color) {
    node.borrow_mut().color = color;
}

/// Which side of `parent` holds `node`.
pub(crate) fn side_of<K, V>(parent: &NodeRef<K, V>, node: &NodeRef<K, V>) -> Dir {
    match &parent.borrow().left {
        Some(left) if Rc::ptr_eq(left, node) => Dir::Left,
        _ => Dir::Right,
    }
}

/// Borrows the key and value of `node` without going through the `RefCell` flag.
///
/// # Safety
/// `'a` must be bounded by a borrow of the tree owning `node`, and no `RefMut`
/// of `node` may exist while the returned references are alive.
pub(crate) unsafe fn entry<'a, K, V>(node: &NodeRef<K, V>) -> (&'a K, &'a V) {
    let n = unsafe { &*node.as_ptr() };
    (&n.key, &n.value)
}

/// Follows `dir` links from `node` as far as they go.
pub(crate) fn extreme<K, V>(node: &NodeRef<K, V>, dir: Dir) -> NodeRef<K, V> {
    let mut current = node.clone();
    loop {
        let next = child_of(&current, dir);
        match next {
            Some(next) => current = next,
            None => return current,
        }
    }
}

/// In-order neighbour of `node`: `Dir::Right` is the successor, `Dir::Left` the predecessor.
pub(crate) fn step<K, V>(node: &NodeRef<K, V>, dir: Dir) -> Link<K, V> {
    if let Some(sub) = child_of(node, dir) {
        return Some(extreme(&sub, dir.opposite()));
    }
    let mut current = node.clone();
    while let Some(up) = parent_of(&current) {
        if side_of(&up, &current) == dir.opposite() {
            return Some(up);
        }
        current = up;
    }
    None
}

#[cfg(test)]
impl<K: Clone, V> Node<K, V> {
    /// Collects `(key, color)` pairs per depth, left to right.
    pub(crate) fn layers(&self, depth: usize, result: &mut Vec<Vec<(K, Color)>>) {
        if result.len() <= depth {
            result.push(Vec::new());
        }
        result[depth].push((self.key.clone(), self.color));
        for c in [&self.left, &self.right].into_iter().flatten() {
            c.borrow().layers(depth + 1, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(parent_node: &NodeRef<i32, ()>, node: NodeRef<i32, ()>, dir: Dir) -> NodeRef<i32, ()> {
        set_parent(&node, Some(parent_node));
        *parent_node.borrow_mut().child_mut(dir) = Some(node.clone());
        node
    }

    #[test]
    fn test_absent_child_is_black() {
        assert_eq!(color_of::<i32, ()>(None), Color::Black);
        let n = Node::new(1, (), Color::Red);
        assert!(is_red(Some(&n)));
        set_color(&n, Color::Black);
        assert!(!is_red(Some(&n)));
    }

    #[test]
    fn test_step_and_extreme() {
        //       4
        //     2   6
        //    1 3 5
        let root = Node::new(4, (), Color::Black);
        let two = link(&root, Node::new(2, (), Color::Black), Dir::Left);
        let six = link(&root, Node::new(6, (), Color::Black), Dir::Right);
        let one = link(&two, Node::new(1, (), Color::Red), Dir::Left);
        let three = link(&two, Node::new(3, (), Color::Red), Dir::Right);
        let five = link(&six, Node::new(5, (), Color::Red), Dir::Left);

        assert_eq!(extreme(&root, Dir::Left).borrow().key, 1);
        assert_eq!(extreme(&root, Dir::Right).borrow().key, 6);
        assert_eq!(side_of(&two, &three), Dir::Right);
        assert_eq!(side_of(&root, &two), Dir::Left);

        let key = |l: Link<i32, ()>| l.as_ref().map(|n| n.borrow().key);
        assert_eq!(key(step(&three, Dir::Right)), Some(4));
        assert_eq!(key(step(&five, Dir::Left)), Some(4));
        assert_eq!(key(step(&root, Dir::Right)), Some(5));
        assert_eq!(key(step(&one, Dir::Left)), None);
        assert_eq!(key(step(&six, Dir::Right)), None);
        assert!(one.borrow().left.is_none() && one.borrow().right.is_none());
    }
}
