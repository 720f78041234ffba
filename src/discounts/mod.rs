//! Discounts
//!
//! A store's discounts form a tree: leaves pair a [`Condition`](conditions::Condition) with a
//! [`Strategy`](strategies::Strategy), composites combine their children with XOR, OR or AND.

use crate::{
    ids::RuleId,
    scope::RuleScope,
    tree::{ChildIds, CompositeOp, RuleTree, TreeNode},
};

pub mod composite;
pub mod conditions;
pub mod rule;
pub mod strategies;

use rule::DiscountRule;

/// Arena of discount nodes owned by a store.
pub type DiscountTree = RuleTree<DiscountNode>;

/// A node of the discount tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscountNode {
    /// Condition and strategy.
    Leaf(DiscountRule),

    /// Combinator over child nodes.
    Composite(CompositeDiscount),
}

impl DiscountNode {
    /// Products and categories the node itself names; composites only contribute their wrapper.
    pub fn scope(&self) -> RuleScope {
        match self {
            DiscountNode::Leaf(rule) => rule.scope(),
            DiscountNode::Composite(composite) => composite
                .wrapper
                .as_ref()
                .map(DiscountRule::scope)
                .unwrap_or_default(),
        }
    }

    /// The rule whose strategy drives the catalog display price.
    pub fn display_rule(&self) -> Option<&DiscountRule> {
        match self {
            DiscountNode::Leaf(rule) => Some(rule),
            DiscountNode::Composite(composite) => composite.wrapper.as_ref(),
        }
    }
}

impl From<DiscountRule> for DiscountNode {
    fn from(rule: DiscountRule) -> Self {
        DiscountNode::Leaf(rule)
    }
}

impl From<CompositeDiscount> for DiscountNode {
    fn from(composite: CompositeDiscount) -> Self {
        DiscountNode::Composite(composite)
    }
}

impl TreeNode for DiscountNode {
    fn children(&self) -> &[RuleId] {
        match self {
            DiscountNode::Leaf(_) => &[],
            DiscountNode::Composite(composite) => &composite.children,
        }
    }

    fn children_mut(&mut self) -> Option<&mut ChildIds> {
        match self {
            DiscountNode::Leaf(_) => None,
            DiscountNode::Composite(composite) => Some(&mut composite.children),
        }
    }
}

/// XOR, OR or AND over child discounts, optionally followed by a wrapper rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDiscount {
    /// Combinator.
    pub op: CompositeOp,

    /// Children in insertion order.
    pub children: ChildIds,

    /// Applied to the result once the children have been applied.
    pub wrapper: Option<DiscountRule>,
}

impl CompositeDiscount {
    /// Empty composite without a wrapper.
    pub fn new(op: CompositeOp) -> Self {
        Self {
            op,
            children: ChildIds::new(),
            wrapper: None,
        }
    }

    /// Composite over `children`.
    pub fn with_children(op: CompositeOp, children: impl IntoIterator<Item = RuleId>) -> Self {
        Self {
            op,
            children: children.into_iter().collect(),
            wrapper: None,
        }
    }

    /// Attach a wrapper rule.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: DiscountRule) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    fn header(&self) -> &'static str {
        match self.op {
            CompositeOp::Xor => "Only 1 discount of the following discounts:",
            CompositeOp::Or => "Any one of the following discounts:",
            CompositeOp::And => "ALL of the following discount conditions must be answered:",
        }
    }
}
