//! Policy Tree Evaluation

use jiff::civil::Weekday;

use crate::{
    basket::Basket,
    ids::RuleId,
    policies::{PolicyNode, PolicyTree},
    tree::CompositeOp,
};

impl PolicyTree {
    /// Whether `basket` satisfies the subtree rooted at `id` on `today`.
    ///
    /// AND is true for no children, OR is false for no children, XOR stops at the second
    /// satisfied child. Unknown ids reject the basket.
    pub fn evaluate(&self, id: RuleId, basket: &Basket, today: Weekday) -> bool {
        match self.get(id) {
            None => false,
            Some(PolicyNode::Leaf(leaf)) => leaf.holds(basket, today),
            Some(PolicyNode::Composite(composite)) => {
                let mut children = composite
                    .children
                    .iter()
                    .map(|child| self.evaluate(*child, basket, today));

                match composite.op {
                    CompositeOp::And => children.all(|holds| holds),
                    CompositeOp::Or => children.any(|holds| holds),
                    CompositeOp::Xor => {
                        let mut seen = false;

                        for holds in children {
                            if holds {
                                if seen {
                                    return false;
                                }

                                seen = true;
                            }
                        }

                        seen
                    }
                }
            }
        }
    }

    /// Description of the subtree at `id`.
    pub fn describe(&self, id: RuleId) -> Option<String> {
        self.get(id).map(|node| self.describe_node(node, 0))
    }

    fn describe_node(&self, node: &PolicyNode, depth: usize) -> String {
        match node {
            PolicyNode::Leaf(leaf) => leaf.describe(),
            PolicyNode::Composite(composite) => {
                let indent = "  ".repeat(depth + 1);

                let children = composite
                    .children
                    .iter()
                    .filter_map(|child| {
                        self.get(*child).map(|node| {
                            format!("{indent}{child}: {}", self.describe_node(node, depth + 1))
                        })
                    })
                    .collect::<Vec<_>>()
                    .join(",\n");

                format!("{}\n{children}", composite.header())
            }
        }
    }
}
