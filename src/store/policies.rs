//! Policy administration and checkout validation.

use jiff::Zoned;
use tracing::{Span, debug, info};

use crate::{
    basket::Basket,
    ids::RuleId,
    persistence::RuleRepository,
    policies::{CompositePolicy, PolicyNode, leaves::PolicyLeaf},
    store::{
        RuleSummary, StoreError, StoreRules, attach_node, combine_nodes, remove_node,
        replace_node, summaries,
    },
    tree::CompositeOp,
    validation::ValidationError,
};

impl StoreRules {
    /// Attach a policy under the root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for bad parameters, or a failed transaction.
    #[tracing::instrument(
        name = "store.policies.add",
        skip(self, repo, leaf),
        fields(policy_id = tracing::field::Empty),
        err
    )]
    pub fn add_policy(
        &mut self,
        repo: &mut dyn RuleRepository,
        leaf: PolicyLeaf,
    ) -> Result<RuleId, StoreError> {
        leaf.validate()?;

        let id = self.transact(repo, "add policy", |store, repo| {
            attach_node(
                &mut store.policies,
                &mut store.index,
                &store.catalog,
                repo,
                PolicyNode::Leaf(leaf),
            )
        })?;

        Span::current().record("policy_id", tracing::field::display(id));

        info!(policy_id = %id, "added policy");

        Ok(id)
    }

    /// Remove a policy and everything below it, returning its description.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or a failed transaction.
    #[tracing::instrument(name = "store.policies.remove", skip(self, repo), fields(policy_id = %id), err)]
    pub fn remove_policy(
        &mut self,
        repo: &mut dyn RuleRepository,
        id: RuleId,
    ) -> Result<String, StoreError> {
        let description = self.transact(repo, "remove policy", |store, repo| {
            remove_node(&mut store.policies, &mut store.index, repo, id)
        })?;

        info!(policy_id = %id, "removed policy");

        Ok(description)
    }

    /// Replace a policy in place under a new id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids, or a failed transaction.
    #[tracing::instrument(
        name = "store.policies.edit",
        skip(self, repo, leaf),
        fields(policy_id = %id, new_policy_id = tracing::field::Empty),
        err
    )]
    pub fn edit_policy(
        &mut self,
        repo: &mut dyn RuleRepository,
        id: RuleId,
        leaf: PolicyLeaf,
    ) -> Result<RuleId, StoreError> {
        leaf.validate()?;

        let new_id = self.transact(repo, "edit policy", |store, repo| {
            replace_node(
                &mut store.policies,
                &mut store.index,
                &store.catalog,
                repo,
                id,
                PolicyNode::Leaf(leaf),
            )
        })?;

        Span::current().record("new_policy_id", tracing::field::display(new_id));

        info!(policy_id = %id, new_policy_id = %new_id, "edited policy");

        Ok(new_id)
    }

    /// Move `ids` under a new composite attached to the root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if any id is missing, or a failed transaction.
    #[tracing::instrument(
        name = "store.policies.combine",
        skip(self, repo),
        fields(op = %op, count = ids.len(), policy_id = tracing::field::Empty),
        err
    )]
    pub fn combine_policies(
        &mut self,
        repo: &mut dyn RuleRepository,
        ids: &[RuleId],
        op: CompositeOp,
    ) -> Result<RuleId, StoreError> {
        if ids.is_empty() {
            return Err(ValidationError::NothingToCombine.into());
        }

        let new_id = self.transact(repo, "combine policies", |store, repo| {
            combine_nodes(
                &mut store.policies,
                &mut store.index,
                &store.catalog,
                repo,
                ids,
                PolicyNode::Composite(CompositePolicy::new(op)),
            )
        })?;

        Span::current().record("policy_id", tracing::field::display(new_id));

        info!(policy_id = %new_id, "combined policies");

        Ok(new_id)
    }

    /// Every policy below the root, in pre-order.
    pub fn fetch_policies(&self) -> Vec<RuleSummary> {
        summaries(&self.policies)
    }

    /// Find a policy anywhere in the tree.
    pub fn search_policy(&self, id: RuleId) -> Option<&PolicyNode> {
        self.policies.get(id)
    }

    /// Whether `basket` may be bought now.
    pub fn apply_policies_on_basket(&self, basket: &Basket) -> bool {
        self.apply_policies_on_basket_at(basket, &Zoned::now())
    }

    /// Whether `basket` may be bought at `now`.
    #[tracing::instrument(name = "store.policies.apply", skip_all, fields(lines = basket.len()))]
    pub fn apply_policies_on_basket_at(&self, basket: &Basket, now: &Zoned) -> bool {
        let accepted = self
            .policies
            .evaluate(self.policies.root(), basket, now.weekday());

        debug!(accepted, "checked policies");

        accepted
    }
}
