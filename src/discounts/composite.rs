//! Discount Tree Evaluation

use jiff::Timestamp;
use tracing::{debug, trace};

use crate::{
    basket::Basket,
    discounts::{
        CompositeDiscount, DiscountNode, DiscountTree,
        rule::{Application, Outcome},
    },
    ids::RuleId,
    tree::CompositeOp,
};

const INDENT: &str = "  ";

impl DiscountTree {
    /// Price a copy of `basket` with the subtree rooted at `id`.
    ///
    /// Unknown ids are not applicable. The input basket is never modified.
    pub fn apply(&self, id: RuleId, basket: &Basket, now: Timestamp) -> Application {
        match self.get(id) {
            None => Application::untouched(basket, Outcome::NotApplicable),
            Some(DiscountNode::Leaf(rule)) => rule.apply(basket, now),
            Some(DiscountNode::Composite(composite)) => self.apply_composite(composite, basket, now),
        }
    }

    /// Whether the node's own condition holds.
    ///
    /// A composite's condition is derived from its children: AND needs all of them (true when
    /// empty), OR and XOR need at least one.
    pub fn gate(&self, id: RuleId, basket: &Basket, now: Timestamp) -> bool {
        match self.get(id) {
            None => false,
            Some(DiscountNode::Leaf(rule)) => rule.holds(basket, now),
            Some(DiscountNode::Composite(composite)) => match composite.op {
                CompositeOp::And => composite
                    .children
                    .iter()
                    .all(|child| self.gate(*child, basket, now)),
                CompositeOp::Or | CompositeOp::Xor => composite
                    .children
                    .iter()
                    .any(|child| self.gate(*child, basket, now)),
            },
        }
    }

    fn apply_composite(
        &self,
        composite: &CompositeDiscount,
        basket: &Basket,
        now: Timestamp,
    ) -> Application {
        let resolved = match composite.op {
            CompositeOp::Xor => self.resolve_xor(composite, basket, now),
            CompositeOp::Or => self.resolve_or(composite, basket, now),
            CompositeOp::And => self.resolve_and(composite, basket, now),
        };

        let Some(resolved) = resolved else {
            return Application::untouched(basket, Outcome::NotApplicable);
        };

        let priced = match &composite.wrapper {
            Some(wrapper) => wrapper.apply(&resolved, now).basket,
            None => resolved,
        };

        Application::cheapest(basket, priced)
    }

    /// Cheapest single child; the first child wins ties.
    fn resolve_xor(
        &self,
        composite: &CompositeDiscount,
        basket: &Basket,
        now: Timestamp,
    ) -> Option<Basket> {
        let mut lowest = basket.total_minor();
        let mut chosen = None;

        for child in &composite.children {
            let application = self.apply(*child, basket, now);
            let total = application.basket.total_minor();

            trace!(rule = %child, total, "xor candidate");

            if total < lowest {
                lowest = total;
                chosen = Some((*child, application.basket));
            }
        }

        chosen.map(|(child, basket)| {
            debug!(rule = %child, total = lowest, "xor chose child");
            basket
        })
    }

    fn resolve_or(
        &self,
        composite: &CompositeDiscount,
        basket: &Basket,
        now: Timestamp,
    ) -> Option<Basket> {
        let mut working = basket.clone();
        let mut applied = false;

        for child in &composite.children {
            if self.gate(*child, basket, now) {
                self.apply_unguarded(*child, &mut working, now);
                applied = true;
            }
        }

        applied.then_some(working)
    }

    /// All children or nothing.
    fn resolve_and(
        &self,
        composite: &CompositeDiscount,
        basket: &Basket,
        now: Timestamp,
    ) -> Option<Basket> {
        if let Some(failed) = composite
            .children
            .iter()
            .find(|child| !self.gate(**child, basket, now))
        {
            debug!(rule = %failed, "and short-circuited");
            return None;
        }

        let mut working = basket.clone();

        for child in &composite.children {
            self.apply_unguarded(*child, &mut working, now);
        }

        Some(working)
    }

    /// Leaves run their strategy directly, composites resolve recursively.
    fn apply_unguarded(&self, id: RuleId, working: &mut Basket, now: Timestamp) {
        match self.get(id) {
            Some(DiscountNode::Leaf(rule)) => rule.strategy.apply(working),
            Some(DiscountNode::Composite(_)) => *working = self.apply(id, working, now).basket,
            None => {}
        }
    }

    /// Description of the subtree at `id`, nested composites indented one level deeper.
    pub fn describe(&self, id: RuleId) -> Option<String> {
        self.get(id).map(|node| self.describe_node(node, 0))
    }

    fn describe_node(&self, node: &DiscountNode, depth: usize) -> String {
        match node {
            DiscountNode::Leaf(rule) => rule.describe(),
            DiscountNode::Composite(composite) => {
                let indent = INDENT.repeat(depth + 1);

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

                let mut description = format!("{}\n{children}", composite.header());

                if let Some(wrapper) = &composite.wrapper {
                    description.push_str(&format!("\n{indent}then: {}", wrapper.describe()));
                }

                description
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::{Money, iso::USD};
    use testresult::TestResult;

    use super::*;
    use crate::{
        basket::BasketLine,
        categories::Categories,
        discounts::{
            conditions::ComboCondition,
            rule::DiscountRule,
            strategies::Strategy,
        },
        pricing::Price,
    };

    fn usd(minor: i64) -> Price {
        Money::from_minor(minor, USD)
    }

    fn id(raw: u64) -> RuleId {
        RuleId::new(raw)
    }

    fn now() -> TestResult<Timestamp> {
        Ok("2025-09-01T09:00:00Z".parse()?)
    }

    fn basket() -> TestResult<Basket> {
        Ok(Basket::with_lines(
            [
                BasketLine::new("milk", 2, usd(1_000), Categories::from_strs(&["dairy"]))?,
                BasketLine::new("bread", 1, usd(2_000), Categories::from_strs(&["bakery"]))?,
            ],
            USD,
        )?)
    }

    fn tree(op: CompositeOp, children: &[(u64, DiscountRule)]) -> TestResult<DiscountTree> {
        let mut tree = DiscountTree::new(id(1), CompositeDiscount::new(op).into());

        for (raw, rule) in children {
            tree.attach(id(1), id(*raw), rule.clone().into())?;
        }

        Ok(tree)
    }

    fn percent_off(product: &str, percent: f64) -> TestResult<DiscountRule> {
        Ok(DiscountRule::unconditional(Strategy::product_percent(
            product,
            Percentage::from(percent),
        )?))
    }

    fn needs_items(min: u64, rule: DiscountRule) -> DiscountRule {
        DiscountRule::new(ComboCondition::new().with_basket_size_min(min), rule.strategy)
    }

    #[test]
    fn xor_picks_cheapest_child() -> TestResult {
        let tree = tree(
            CompositeOp::Xor,
            &[(2, percent_off("milk", 0.1)?), (3, percent_off("bread", 0.2)?)],
        )?;

        let application = tree.apply(id(1), &basket()?, now()?);

        assert_eq!(application.basket.total(), usd(3_600));

        Ok(())
    }

    #[test]
    fn xor_tie_goes_to_first_child() -> TestResult {
        let tree = tree(
            CompositeOp::Xor,
            &[(2, percent_off("milk", 0.2)?), (3, percent_off("bread", 0.2)?)],
        )?;

        let application = tree.apply(id(1), &basket()?, now()?);

        let milk = application.basket.line("milk").map(BasketLine::total);
        let bread = application.basket.line("bread").map(BasketLine::total);

        assert_eq!(milk, Some(&usd(1_600)));
        assert_eq!(bread, Some(&usd(2_000)));

        Ok(())
    }

    #[test]
    fn xor_without_cheaper_child_is_not_applicable() -> TestResult {
        let tree = tree(CompositeOp::Xor, &[(2, percent_off("cheese", 0.5)?)])?;
        let basket = basket()?;

        let application = tree.apply(id(1), &basket, now()?);

        assert_eq!(application.outcome, Outcome::NotApplicable);
        assert_eq!(application.basket, basket);

        Ok(())
    }

    #[test]
    fn or_applies_every_holding_child() -> TestResult {
        let tree = tree(
            CompositeOp::Or,
            &[
                (2, percent_off("milk", 0.5)?),
                (3, needs_items(10, percent_off("bread", 0.5)?)),
                (4, percent_off("bread", 0.25)?),
            ],
        )?;

        let application = tree.apply(id(1), &basket()?, now()?);

        assert_eq!(application.basket.total(), usd(2_500));
        assert!(application.outcome.is_applied());

        Ok(())
    }

    #[test]
    fn and_short_circuits_on_failed_child() -> TestResult {
        let tree = tree(
            CompositeOp::And,
            &[
                (2, percent_off("milk", 0.5)?),
                (3, needs_items(10, percent_off("bread", 0.5)?)),
            ],
        )?;
        let basket = basket()?;

        let application = tree.apply(id(1), &basket, now()?);

        assert_eq!(application.basket, basket);
        assert_eq!(application.outcome, Outcome::NotApplicable);

        Ok(())
    }

    #[test]
    fn and_applies_children_then_wrapper() -> TestResult {
        let mut tree = DiscountTree::new(
            id(1),
            CompositeDiscount::new(CompositeOp::Or).into(),
        );
        let and = CompositeDiscount::new(CompositeOp::And).with_wrapper(DiscountRule::unconditional(
            Strategy::basket_percent(Percentage::from(0.5))?,
        ));

        tree.attach(id(1), id(2), and.into())?;
        tree.attach(id(2), id(3), percent_off("milk", 0.5)?.into())?;
        tree.attach(id(2), id(4), needs_items(3, percent_off("bread", 0.5)?).into())?;

        let application = tree.apply(id(1), &basket()?, now()?);

        assert_eq!(application.basket.total(), usd(1_000));

        Ok(())
    }

    #[test]
    fn describe_nests_children() -> TestResult {
        let tree = tree(CompositeOp::Xor, &[(2, percent_off("milk", 0.1)?)])?;

        assert_eq!(
            tree.describe(id(1)).as_deref(),
            Some(
                "Only 1 discount of the following discounts:\n  #2: get discount of 10% on products: milk, with no end date"
            )
        );

        Ok(())
    }
}
