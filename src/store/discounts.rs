//! Discount administration and checkout pricing.

use decimal_percentage::Percentage;
use jiff::Zoned;
use tracing::{Span, debug, info, warn};

use crate::{
    basket::Basket,
    discounts::{
        CompositeDiscount, DiscountNode,
        conditions::Condition,
        rule::{Application, DiscountRule, Outcome},
        strategies::Strategy,
    },
    ids::RuleId,
    persistence::RuleRepository,
    store::{
        RuleSummary, StoreError, StoreRules, attach_node, combine_nodes, remove_node,
        replace_node, summaries,
    },
    tree::CompositeOp,
    validation::ValidationError,
};

impl StoreRules {
    /// Percentage off one product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    pub fn add_simple_product_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        product: &str,
        percent: Percentage,
        condition: Condition,
    ) -> Result<RuleId, StoreError> {
        let strategy = Strategy::product_percent(product, percent)?;

        self.add_discount(repo, DiscountRule::new(condition, strategy))
    }

    /// Percentage off one category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    pub fn add_simple_category_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        category: &str,
        percent: Percentage,
        condition: Condition,
    ) -> Result<RuleId, StoreError> {
        let strategy = Strategy::category_percent(category, percent)?;

        self.add_discount(repo, DiscountRule::new(condition, strategy))
    }

    /// Percentage off the entire basket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    pub fn add_discount_on_entire_store(
        &mut self,
        repo: &mut dyn RuleRepository,
        percent: Percentage,
        condition: Condition,
    ) -> Result<RuleId, StoreError> {
        let strategy = Strategy::basket_percent(percent)?;

        self.add_discount(repo, DiscountRule::new(condition, strategy))
    }

    /// Free units of one product.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    pub fn add_free_per_x_product_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        product: &str,
        free: u32,
        per_x: u32,
        is_duplicate: bool,
        condition: Condition,
    ) -> Result<RuleId, StoreError> {
        let strategy = Strategy::free_per_x_product(product, free, per_x, is_duplicate)?;

        self.add_discount(repo, DiscountRule::new(condition, strategy))
    }

    /// Free units of every product in a category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    pub fn add_free_per_x_category_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        category: &str,
        free: u32,
        per_x: u32,
        is_duplicate: bool,
        condition: Condition,
    ) -> Result<RuleId, StoreError> {
        let strategy = Strategy::free_per_x_category(category, free, per_x, is_duplicate)?;

        self.add_discount(repo, DiscountRule::new(condition, strategy))
    }

    /// Attach a rule as a new independent discount under the root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    #[tracing::instrument(
        name = "store.discounts.add",
        skip(self, repo, rule),
        fields(discount_id = tracing::field::Empty),
        err
    )]
    pub fn add_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        rule: DiscountRule,
    ) -> Result<RuleId, StoreError> {
        rule.validate(self.currency)?;

        let id = self.transact(repo, "add discount", |store, repo| {
            attach_node(
                &mut store.discounts,
                &mut store.index,
                &store.catalog,
                repo,
                DiscountNode::Leaf(rule),
            )
        })?;

        Span::current().record("discount_id", tracing::field::display(id));

        info!(discount_id = %id, "added discount");

        Ok(id)
    }

    /// Remove a discount and everything below it, returning its description.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or a failed transaction.
    #[tracing::instrument(name = "store.discounts.remove", skip(self, repo), fields(discount_id = %id), err)]
    pub fn remove_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        id: RuleId,
    ) -> Result<String, StoreError> {
        let description = self.transact(repo, "remove discount", |store, repo| {
            remove_node(&mut store.discounts, &mut store.index, repo, id)
        })?;

        info!(discount_id = %id, "removed discount");

        Ok(description)
    }

    /// Replace a discount in place under a new id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, [`StoreError::Validation`] for bad
    /// parameters, or a failed transaction.
    #[tracing::instrument(
        name = "store.discounts.edit",
        skip(self, repo, rule),
        fields(discount_id = %id, new_discount_id = tracing::field::Empty),
        err
    )]
    pub fn edit_discount(
        &mut self,
        repo: &mut dyn RuleRepository,
        id: RuleId,
        rule: DiscountRule,
    ) -> Result<RuleId, StoreError> {
        rule.validate(self.currency)?;

        let new_id = self.transact(repo, "edit discount", |store, repo| {
            replace_node(
                &mut store.discounts,
                &mut store.index,
                &store.catalog,
                repo,
                id,
                DiscountNode::Leaf(rule),
            )
        })?;

        Span::current().record("new_discount_id", tracing::field::display(new_id));

        info!(discount_id = %id, new_discount_id = %new_id, "edited discount");

        Ok(new_id)
    }

    /// Move `ids` under a new composite attached to the root.
    ///
    /// Either every id is moved or none is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if any id is missing, or a failed transaction.
    #[tracing::instrument(
        name = "store.discounts.combine",
        skip(self, repo, wrapper),
        fields(op = %op, count = ids.len(), discount_id = tracing::field::Empty),
        err
    )]
    pub fn combine_discounts(
        &mut self,
        repo: &mut dyn RuleRepository,
        ids: &[RuleId],
        op: CompositeOp,
        wrapper: Option<DiscountRule>,
    ) -> Result<RuleId, StoreError> {
        if ids.is_empty() {
            return Err(ValidationError::NothingToCombine.into());
        }

        let mut composite = CompositeDiscount::new(op);

        if let Some(wrapper) = wrapper {
            wrapper.validate(self.currency)?;
            composite = composite.with_wrapper(wrapper);
        }

        let new_id = self.transact(repo, "combine discounts", |store, repo| {
            combine_nodes(
                &mut store.discounts,
                &mut store.index,
                &store.catalog,
                repo,
                ids,
                DiscountNode::Composite(composite),
            )
        })?;

        Span::current().record("discount_id", tracing::field::display(new_id));

        info!(discount_id = %new_id, "combined discounts");

        Ok(new_id)
    }

    /// Every discount below the root, in pre-order.
    pub fn fetch_all_discounts(&self) -> Vec<RuleSummary> {
        summaries(&self.discounts)
    }

    /// Find a discount anywhere in the tree.
    pub fn search_discount(&self, id: RuleId) -> Option<&DiscountNode> {
        self.discounts.get(id)
    }

    /// Price a copy of `basket` with every discount, as of now.
    pub fn apply_discount_on_basket(&self, basket: &Basket) -> Basket {
        self.apply_discount_on_basket_at(basket, &Zoned::now()).basket
    }

    /// Price a copy of `basket` with every discount, as of `now`.
    #[tracing::instrument(name = "store.discounts.apply", skip_all, fields(lines = basket.len()))]
    pub fn apply_discount_on_basket_at(&self, basket: &Basket, now: &Zoned) -> Application {
        if basket.currency() != self.currency {
            warn!(
                basket = basket.currency().iso_alpha_code,
                store = self.currency.iso_alpha_code,
                "basket currency differs from store currency"
            );

            return Application {
                basket: basket.clone(),
                outcome: Outcome::NotApplicable,
            };
        }

        let application = self
            .discounts
            .apply(self.discounts.root(), basket, now.timestamp());

        debug!(outcome = ?application.outcome, "priced basket");

        application
    }
}
