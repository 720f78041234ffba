//! Shopping Policies
//!
//! Same tree shape as discounts, but leaves accept or reject a basket instead of pricing it.

use crate::{
    ids::RuleId,
    scope::RuleScope,
    tree::{ChildIds, CompositeOp, RuleTree, TreeNode},
};

pub mod composite;
pub mod leaves;

use leaves::PolicyLeaf;

/// Arena of policy nodes owned by a store.
pub type PolicyTree = RuleTree<PolicyNode>;

/// A node of the policy tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyNode {
    /// Single predicate.
    Leaf(PolicyLeaf),

    /// Combinator over child policies.
    Composite(CompositePolicy),
}

impl PolicyNode {
    /// Products and categories the node itself constrains.
    pub fn scope(&self) -> RuleScope {
        match self {
            PolicyNode::Leaf(leaf) => leaf.scope(),
            PolicyNode::Composite(_) => RuleScope::default(),
        }
    }
}

impl From<PolicyLeaf> for PolicyNode {
    fn from(leaf: PolicyLeaf) -> Self {
        PolicyNode::Leaf(leaf)
    }
}

impl From<CompositePolicy> for PolicyNode {
    fn from(composite: CompositePolicy) -> Self {
        PolicyNode::Composite(composite)
    }
}

impl TreeNode for PolicyNode {
    fn children(&self) -> &[RuleId] {
        match self {
            PolicyNode::Leaf(_) => &[],
            PolicyNode::Composite(composite) => &composite.children,
        }
    }

    fn children_mut(&mut self) -> Option<&mut ChildIds> {
        match self {
            PolicyNode::Leaf(_) => None,
            PolicyNode::Composite(composite) => Some(&mut composite.children),
        }
    }
}

/// XOR, OR or AND over child policies.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePolicy {
    /// Combinator.
    pub op: CompositeOp,

    /// Children in insertion order.
    pub children: ChildIds,
}

impl CompositePolicy {
    /// Empty composite.
    pub fn new(op: CompositeOp) -> Self {
        Self::with_children(op, [])
    }

    /// Composite over `children`.
    pub fn with_children(op: CompositeOp, children: impl IntoIterator<Item = RuleId>) -> Self {
        Self {
            op,
            children: children.into_iter().collect(),
        }
    }

    fn header(&self) -> &'static str {
        match self.op {
            CompositeOp::Xor => "Only one of the following policies must be answered:",
            CompositeOp::Or => "At least one of the following policies must be answered:",
            CompositeOp::And => "ALL of the following policies must be answered:",
        }
    }
}
