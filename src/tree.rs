//! Rule Trees
//!
//! Discounts and policies are both stored as an arena of nodes keyed by [`RuleId`]. Composite
//! nodes only reference their children by id, so the arena is the single owner of every node.

use std::{fmt, str::FromStr};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{ids::RuleId, validation::ValidationError};

/// Ordered child ids of a composite node.
pub type ChildIds = SmallVec<[RuleId; 4]>;

/// How a composite combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Exactly one child.
    Xor,

    /// Any child.
    Or,

    /// Every child.
    And,
}

impl CompositeOp {
    /// Lowercase operator name.
    pub const fn as_str(self) -> &'static str {
        match self {
            CompositeOp::Xor => "xor",
            CompositeOp::Or => "or",
            CompositeOp::And => "and",
        }
    }
}

impl fmt::Display for CompositeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositeOp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xor" => Ok(CompositeOp::Xor),
            "or" => Ok(CompositeOp::Or),
            "and" => Ok(CompositeOp::And),
            _ => Err(ValidationError::UnknownOperator(s.to_string())),
        }
    }
}

/// A node that may hold child ids.
pub trait TreeNode: Clone {
    /// Child ids in evaluation order; empty for leaves.
    fn children(&self) -> &[RuleId];

    /// Mutable child ids, or `None` for leaves.
    fn children_mut(&mut self) -> Option<&mut ChildIds>;
}

/// Structural errors raised while editing a tree.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The id is not part of the tree.
    #[error("rule {0} not found")]
    NotFound(RuleId),

    /// The root cannot be detached or replaced.
    #[error("rule {0} is the root and cannot be detached")]
    Root(RuleId),

    /// A child was attached to a leaf.
    #[error("rule {0} cannot have children")]
    NotComposite(RuleId),

    /// The id is already used in the tree.
    #[error("rule {0} already exists")]
    DuplicateId(RuleId),
}

/// A subtree removed from a [`RuleTree`], nodes in pre-order.
#[derive(Debug, Clone)]
pub struct Detached<N> {
    root: RuleId,
    nodes: Vec<(RuleId, N)>,
}

impl<N> Detached<N> {
    /// Id of the subtree root.
    pub fn root(&self) -> RuleId {
        self.root
    }

    /// Ids of every removed node, subtree root first.
    pub fn ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.nodes.iter().map(|(id, _)| *id)
    }

    /// Removed nodes in pre-order.
    pub fn nodes(&self) -> &[(RuleId, N)] {
        &self.nodes
    }
}

/// Arena of rule nodes reachable from a single root.
#[derive(Debug, Clone)]
pub struct RuleTree<N> {
    root: RuleId,
    nodes: FxHashMap<RuleId, N>,
}

impl<N: TreeNode> RuleTree<N> {
    /// Create a tree holding only `node` as its root.
    pub fn new(root: RuleId, node: N) -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert(root, node);

        Self { root, nodes }
    }

    /// Root id.
    pub fn root(&self) -> RuleId {
        self.root
    }

    /// Find a node anywhere in the tree.
    pub fn get(&self, id: RuleId) -> Option<&N> {
        self.nodes.get(&id)
    }

    /// Whether `id` is reachable from the root.
    pub fn contains(&self, id: RuleId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Child ids of `id`, empty for leaves and unknown ids.
    pub fn children_of(&self, id: RuleId) -> &[RuleId] {
        self.nodes
            .get(&id)
            .map(TreeNode::children)
            .unwrap_or_default()
    }

    /// Id of the composite holding `id`.
    pub fn parent_of(&self, id: RuleId) -> Option<RuleId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.children().contains(&id))
            .map(|(parent, _)| *parent)
    }

    /// `id` and every node below it, in pre-order.
    pub fn descendants(&self, id: RuleId) -> Vec<RuleId> {
        self.walk_from(id).into_iter().map(|(id, _)| id).collect()
    }

    /// Every node below the root with its depth (root children have depth 0), in pre-order.
    pub fn walk(&self) -> Vec<(RuleId, usize)> {
        self.children_of(self.root)
            .iter()
            .flat_map(|child| self.walk_from(*child))
            .collect()
    }

    fn walk_from(&self, id: RuleId) -> Vec<(RuleId, usize)> {
        let mut visited = Vec::new();

        if !self.contains(id) {
            return visited;
        }

        let mut stack = vec![(id, 0)];

        while let Some((current, depth)) = stack.pop() {
            visited.push((current, depth));

            for child in self.children_of(current).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }

        visited
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] if the parent is unknown or a leaf, or `id` is taken.
    pub fn attach(&mut self, parent: RuleId, id: RuleId, node: N) -> Result<(), TreeError> {
        if self.contains(id) {
            return Err(TreeError::DuplicateId(id));
        }

        self.child_ids_mut(parent)?.push(id);
        self.nodes.insert(id, node);

        Ok(())
    }

    /// Re-attach a previously detached subtree as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] if the parent is unknown or a leaf, or any id is taken.
    pub fn attach_detached(&mut self, parent: RuleId, detached: Detached<N>) -> Result<(), TreeError> {
        if let Some(taken) = detached.ids().find(|id| self.contains(*id)) {
            return Err(TreeError::DuplicateId(taken));
        }

        self.child_ids_mut(parent)?.push(detached.root);
        self.nodes.extend(detached.nodes);

        Ok(())
    }

    /// Remove `id` and its subtree from wherever it lives.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] for unknown ids and [`TreeError::Root`] for the root.
    pub fn detach(&mut self, id: RuleId) -> Result<Detached<N>, TreeError> {
        let parent = self.parent_for_edit(id)?;

        self.child_ids_mut(parent)?.retain(|child| *child != id);

        Ok(self.remove_subtree(id))
    }

    /// Swap `id` for `node` under a fresh id, keeping its position among its siblings.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] for unknown ids, the root, or a taken `new_id`.
    pub fn replace(&mut self, id: RuleId, new_id: RuleId, node: N) -> Result<Detached<N>, TreeError> {
        let parent = self.parent_for_edit(id)?;

        if self.contains(new_id) {
            return Err(TreeError::DuplicateId(new_id));
        }

        if let Some(slot) = self
            .child_ids_mut(parent)?
            .iter_mut()
            .find(|child| **child == id)
        {
            *slot = new_id;
        }

        let removed = self.remove_subtree(id);
        self.nodes.insert(new_id, node);

        Ok(removed)
    }

    fn parent_for_edit(&self, id: RuleId) -> Result<RuleId, TreeError> {
        if id == self.root {
            return Err(TreeError::Root(id));
        }

        self.parent_of(id).ok_or(TreeError::NotFound(id))
    }

    fn child_ids_mut(&mut self, parent: RuleId) -> Result<&mut ChildIds, TreeError> {
        self.nodes
            .get_mut(&parent)
            .ok_or(TreeError::NotFound(parent))?
            .children_mut()
            .ok_or(TreeError::NotComposite(parent))
    }

    fn remove_subtree(&mut self, id: RuleId) -> Detached<N> {
        let nodes = self
            .descendants(id)
            .into_iter()
            .filter_map(|descendant| self.nodes.remove(&descendant).map(|node| (descendant, node)))
            .collect();

        Detached { root: id, nodes }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Node {
        Leaf(&'static str),
        Group(ChildIds),
    }

    impl TreeNode for Node {
        fn children(&self) -> &[RuleId] {
            match self {
                Node::Leaf(_) => &[],
                Node::Group(children) => children,
            }
        }

        fn children_mut(&mut self) -> Option<&mut ChildIds> {
            match self {
                Node::Leaf(_) => None,
                Node::Group(children) => Some(children),
            }
        }
    }

    fn id(raw: u64) -> RuleId {
        RuleId::new(raw)
    }

    fn sample() -> TestResult<RuleTree<Node>> {
        let mut tree = RuleTree::new(id(1), Node::Group(smallvec![]));

        tree.attach(id(1), id(2), Node::Leaf("a"))?;
        tree.attach(id(1), id(3), Node::Group(smallvec![]))?;
        tree.attach(id(3), id(4), Node::Leaf("b"))?;
        tree.attach(id(3), id(5), Node::Leaf("c"))?;
        tree.attach(id(1), id(6), Node::Leaf("d"))?;

        Ok(tree)
    }

    #[test]
    fn operators_parse_case_insensitively() -> TestResult {
        assert_eq!("XOR".parse::<CompositeOp>()?, CompositeOp::Xor);
        assert_eq!(" and ".parse::<CompositeOp>()?, CompositeOp::And);
        assert!(matches!(
            "nand".parse::<CompositeOp>(),
            Err(ValidationError::UnknownOperator(_))
        ));

        Ok(())
    }

    #[test]
    fn walk_is_preorder_with_depth() -> TestResult {
        let tree = sample()?;

        assert_eq!(
            tree.walk(),
            [(id(2), 0), (id(3), 0), (id(4), 1), (id(5), 1), (id(6), 0)]
        );

        Ok(())
    }

    #[test]
    fn attach_to_leaf_fails() -> TestResult {
        let mut tree = sample()?;

        assert_eq!(
            tree.attach(id(2), id(9), Node::Leaf("x")),
            Err(TreeError::NotComposite(id(2)))
        );
        assert_eq!(
            tree.attach(id(1), id(4), Node::Leaf("x")),
            Err(TreeError::DuplicateId(id(4)))
        );

        Ok(())
    }

    #[test]
    fn detach_removes_whole_subtree() -> TestResult {
        let mut tree = sample()?;

        let detached = tree.detach(id(3))?;

        assert_eq!(detached.ids().collect::<Vec<_>>(), [id(3), id(4), id(5)]);
        assert!(!tree.contains(id(4)));
        assert_eq!(tree.children_of(id(1)), [id(2), id(6)]);

        Ok(())
    }

    #[test]
    fn detach_root_or_unknown_fails() -> TestResult {
        let mut tree = sample()?;

        assert!(matches!(tree.detach(id(1)), Err(TreeError::Root(_))));
        assert!(matches!(tree.detach(id(42)), Err(TreeError::NotFound(_))));

        Ok(())
    }

    #[test]
    fn replace_keeps_sibling_position() -> TestResult {
        let mut tree = sample()?;

        let removed = tree.replace(id(3), id(7), Node::Leaf("e"))?;

        assert_eq!(removed.ids().count(), 3);
        assert_eq!(tree.children_of(id(1)), [id(2), id(7), id(6)]);
        assert_eq!(tree.get(id(7)), Some(&Node::Leaf("e")));

        Ok(())
    }

    #[test]
    fn attach_detached_moves_subtree() -> TestResult {
        let mut tree = sample()?;

        let detached = tree.detach(id(3))?;
        tree.attach(id(1), id(8), Node::Group(smallvec![]))?;
        tree.attach_detached(id(8), detached)?;

        assert_eq!(tree.parent_of(id(3)), Some(id(8)));
        assert_eq!(tree.descendants(id(8)), [id(8), id(3), id(4), id(5)]);

        Ok(())
    }
}
