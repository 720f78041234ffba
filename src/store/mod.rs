//! Store Rules
//!
//! Per-store discount tree (OR root), policy tree (AND root) and the product index derived from
//! both. Structural edits run inside a repository transaction and leave the store unchanged when
//! they fail.

use rusty_money::iso::Currency;
use tracing::{info, warn};

use crate::{
    catalog::{Catalog, CatalogProduct},
    discounts::{CompositeDiscount, DiscountNode, DiscountTree},
    ids::{RuleId, RuleKind},
    index::StoreRuleIndex,
    persistence::{RuleRecord, RuleRepository, StoredRule},
    policies::{CompositePolicy, PolicyNode, PolicyTree},
    pricing::Price,
    scope::RuleScope,
    tree::{CompositeOp, Detached, RuleTree, TreeNode},
};

mod discounts;
mod errors;
mod policies;

pub use errors::StoreError;

/// One row of a rule listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSummary {
    /// Rule id.
    pub id: RuleId,

    /// Nesting depth below the root.
    pub depth: usize,

    /// Human readable description.
    pub description: String,
}

/// What the catalog shows for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Product name.
    pub product: String,

    /// Undiscounted unit price.
    pub price: Price,

    /// Unit price after every indexed discount's strategy.
    pub discounted_price: Price,

    /// Discounts that may affect the product.
    pub discount_ids: Vec<RuleId>,

    /// Policies that constrain the product.
    pub policy_ids: Vec<RuleId>,

    /// Descriptions of `discount_ids`, same order.
    pub discounts: Vec<String>,

    /// Descriptions of `policy_ids`, same order.
    pub policies: Vec<String>,
}

/// Rules of a single store.
#[derive(Debug, Clone)]
pub struct StoreRules {
    currency: &'static Currency,
    catalog: Catalog,
    discounts: DiscountTree,
    policies: PolicyTree,
    index: StoreRuleIndex,
}

impl StoreRules {
    /// Create a store with empty rule trees, persisting both roots.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transaction`] if the repository fails.
    #[tracing::instrument(
        name = "store.rules.new",
        skip_all,
        fields(currency = currency.iso_alpha_code, products = catalog.len()),
        err
    )]
    pub fn new(
        repo: &mut dyn RuleRepository,
        currency: &'static Currency,
        catalog: Catalog,
    ) -> Result<Self, StoreError> {
        let store = run_in_transaction(repo, "create store", |repo| {
            let discount_root = repo.next_id(RuleKind::Discount)?;
            let policy_root = repo.next_id(RuleKind::Policy)?;

            let store = Self {
                currency,
                catalog,
                discounts: DiscountTree::new(
                    discount_root,
                    CompositeDiscount::new(CompositeOp::Or).into(),
                ),
                policies: PolicyTree::new(
                    policy_root,
                    CompositePolicy::new(CompositeOp::And).into(),
                ),
                index: StoreRuleIndex::default(),
            };

            persist(repo, &store.discounts, &[discount_root])?;
            persist(repo, &store.policies, &[policy_root])?;

            Ok(store)
        })?;

        info!(
            discount_root = %store.discounts.root(),
            policy_root = %store.policies.root(),
            "created store rules"
        );

        Ok(store)
    }

    /// Store currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Products the index is built against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Discount tree.
    pub fn discounts(&self) -> &DiscountTree {
        &self.discounts
    }

    /// Policy tree.
    pub fn policies(&self) -> &PolicyTree {
        &self.policies
    }

    /// Product index.
    pub fn index(&self) -> &StoreRuleIndex {
        &self.index
    }

    /// List a product, indexing it against the existing rules.
    #[tracing::instrument(name = "store.rules.add_product", skip(self, product), fields(product = %product.name))]
    pub fn add_product(&mut self, product: CatalogProduct) {
        self.index.remove_product(&product.name);

        index_product(&mut self.index, &self.discounts, &product);
        index_product(&mut self.index, &self.policies, &product);

        self.catalog.insert(product);
    }

    /// Recompute the index from scratch.
    pub fn rebuild_index(&mut self) {
        let mut index = StoreRuleIndex::default();

        let discount_ids: Vec<RuleId> = self.discounts.walk().into_iter().map(|(id, _)| id).collect();
        let policy_ids: Vec<RuleId> = self.policies.walk().into_iter().map(|(id, _)| id).collect();

        index_ids(&mut index, &self.catalog, &self.discounts, &discount_ids);
        index_ids(&mut index, &self.catalog, &self.policies, &policy_ids);

        self.index = index;
    }

    /// Display price and rules for a listed product.
    pub fn catalog_entry(&self, product: &str) -> Option<CatalogEntry> {
        let listed = self.catalog.get(product)?;

        let discount_ids = self.index.ids_for(RuleKind::Discount, product);
        let policy_ids = self.index.ids_for(RuleKind::Policy, product);

        let discounted_price = discount_ids
            .iter()
            .filter_map(|id| self.discounts.get(*id))
            .filter_map(DiscountNode::display_rule)
            .fold(listed.price, |price, rule| {
                rule.strategy
                    .apply_to_price(&listed.name, &listed.categories, price)
            });

        Some(CatalogEntry {
            product: listed.name.clone(),
            price: listed.price,
            discounted_price,
            discounts: discount_ids
                .iter()
                .filter_map(|id| self.discounts.describe(*id))
                .collect(),
            policies: policy_ids
                .iter()
                .filter_map(|id| self.policies.describe(*id))
                .collect(),
            discount_ids,
            policy_ids,
        })
    }

    /// Run `work` in a repository transaction, restoring the trees and index if it fails.
    fn transact<T>(
        &mut self,
        repo: &mut dyn RuleRepository,
        operation: &'static str,
        work: impl FnOnce(&mut Self, &mut dyn RuleRepository) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let snapshot = (
            self.discounts.clone(),
            self.policies.clone(),
            self.index.clone(),
        );

        let result = run_in_transaction(repo, operation, |repo| work(self, repo));

        if result.is_err() {
            (self.discounts, self.policies, self.index) = snapshot;
        }

        result
    }
}

/// `begin_nested`, run `work`, then `flush` and `commit`; `rollback` on any error.
fn run_in_transaction<T>(
    repo: &mut dyn RuleRepository,
    operation: &'static str,
    work: impl FnOnce(&mut dyn RuleRepository) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    repo.begin_nested()
        .map_err(|source| StoreError::Transaction { operation, source })?;

    let result = work(&mut *repo).and_then(|value| {
        repo.flush()?;
        repo.commit()?;

        Ok(value)
    });

    match result {
        Ok(value) => {
            info!(operation, "committed");

            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = repo.rollback() {
                warn!(operation, error = %rollback_error, "rollback failed");
            }

            warn!(operation, error = %error, "rolled back");

            Err(error.in_transaction(operation))
        }
    }
}

/// Tree node that can be indexed and persisted.
pub(crate) trait RuleNode: TreeNode {
    const KIND: RuleKind;

    fn scope(&self) -> RuleScope;

    fn stored(&self) -> StoredRule;

    fn describe_in(tree: &RuleTree<Self>, id: RuleId) -> Option<String>;
}

impl RuleNode for DiscountNode {
    const KIND: RuleKind = RuleKind::Discount;

    fn scope(&self) -> RuleScope {
        DiscountNode::scope(self)
    }

    fn stored(&self) -> StoredRule {
        StoredRule::Discount(self.clone())
    }

    fn describe_in(tree: &DiscountTree, id: RuleId) -> Option<String> {
        tree.describe(id)
    }
}

impl RuleNode for PolicyNode {
    const KIND: RuleKind = RuleKind::Policy;

    fn scope(&self) -> RuleScope {
        PolicyNode::scope(self)
    }

    fn stored(&self) -> StoredRule {
        StoredRule::Policy(self.clone())
    }

    fn describe_in(tree: &PolicyTree, id: RuleId) -> Option<String> {
        tree.describe(id)
    }
}

fn tree_error<N: RuleNode>(error: crate::tree::TreeError) -> StoreError {
    StoreError::from_tree(N::KIND, error)
}

fn index_ids<N: RuleNode>(
    index: &mut StoreRuleIndex,
    catalog: &Catalog,
    tree: &RuleTree<N>,
    ids: &[RuleId],
) {
    for id in ids {
        let Some(scope) = tree.get(*id).map(RuleNode::scope) else {
            continue;
        };

        for product in catalog.iter() {
            if scope.matches(&product.name, &product.categories) {
                index.insert(N::KIND, &product.name, *id);
            }
        }
    }
}

fn index_product<N: RuleNode>(
    index: &mut StoreRuleIndex,
    tree: &RuleTree<N>,
    product: &CatalogProduct,
) {
    for (id, _) in tree.walk() {
        if tree
            .get(id)
            .is_some_and(|node| node.scope().matches(&product.name, &product.categories))
        {
            index.insert(N::KIND, &product.name, id);
        }
    }
}

fn persist<N: RuleNode>(
    repo: &mut dyn RuleRepository,
    tree: &RuleTree<N>,
    ids: &[RuleId],
) -> Result<(), StoreError> {
    for id in ids {
        if let Some(node) = tree.get(*id) {
            let description = N::describe_in(tree, *id).unwrap_or_default();

            repo.save(RuleRecord::new(*id, description, node.stored()))?;
        }
    }

    Ok(())
}

/// Attach `node` under the root, index and persist it.
fn attach_node<N: RuleNode>(
    tree: &mut RuleTree<N>,
    index: &mut StoreRuleIndex,
    catalog: &Catalog,
    repo: &mut dyn RuleRepository,
    node: N,
) -> Result<RuleId, StoreError> {
    let id = repo.next_id(N::KIND)?;
    let root = tree.root();

    tree.attach(root, id, node).map_err(tree_error::<N>)?;

    index_ids(index, catalog, tree, &[id]);
    persist(repo, tree, &[id, root])?;

    Ok(id)
}

/// Strip a detached subtree from the index, then soft-delete every node in it.
fn retire<N: RuleNode>(
    index: &mut StoreRuleIndex,
    repo: &mut dyn RuleRepository,
    removed: &Detached<N>,
) -> Result<(), StoreError> {
    let ids: Vec<RuleId> = removed.ids().collect();

    index.remove_ids(N::KIND, &ids);

    for id in ids {
        repo.delete(N::KIND, id)?;
    }

    Ok(())
}

fn remove_node<N: RuleNode>(
    tree: &mut RuleTree<N>,
    index: &mut StoreRuleIndex,
    repo: &mut dyn RuleRepository,
    id: RuleId,
) -> Result<String, StoreError> {
    if id == tree.root() {
        return Err(StoreError::RootRule { kind: N::KIND, id });
    }

    let description = N::describe_in(tree, id).ok_or(StoreError::NotFound { kind: N::KIND, id })?;
    let parent = tree.parent_of(id);

    let removed = tree.detach(id).map_err(tree_error::<N>)?;
    retire(index, repo, &removed)?;

    if let Some(parent) = parent {
        persist(repo, tree, &[parent])?;
    }

    Ok(description)
}

fn replace_node<N: RuleNode>(
    tree: &mut RuleTree<N>,
    index: &mut StoreRuleIndex,
    catalog: &Catalog,
    repo: &mut dyn RuleRepository,
    id: RuleId,
    node: N,
) -> Result<RuleId, StoreError> {
    if id == tree.root() {
        return Err(StoreError::RootRule { kind: N::KIND, id });
    }

    let parent = tree
        .parent_of(id)
        .ok_or(StoreError::NotFound { kind: N::KIND, id })?;
    let new_id = repo.next_id(N::KIND)?;

    let removed = tree.replace(id, new_id, node).map_err(tree_error::<N>)?;
    retire(index, repo, &removed)?;

    index_ids(index, catalog, tree, &[new_id]);
    persist(repo, tree, &[new_id, parent])?;

    Ok(new_id)
}

/// Extract every id, then wrap them in `composite` under the root.
fn combine_nodes<N: RuleNode>(
    tree: &mut RuleTree<N>,
    index: &mut StoreRuleIndex,
    catalog: &Catalog,
    repo: &mut dyn RuleRepository,
    ids: &[RuleId],
    composite: N,
) -> Result<RuleId, StoreError> {
    let mut parents = Vec::with_capacity(ids.len() + 2);
    let mut extracted = Vec::with_capacity(ids.len());

    for id in ids {
        if *id == tree.root() {
            return Err(StoreError::RootRule {
                kind: N::KIND,
                id: *id,
            });
        }

        parents.extend(tree.parent_of(*id));
        extracted.push(tree.detach(*id).map_err(tree_error::<N>)?);
    }

    let new_id = repo.next_id(N::KIND)?;
    let root = tree.root();

    tree.attach(root, new_id, composite).map_err(tree_error::<N>)?;

    for detached in extracted {
        tree.attach_detached(new_id, detached)
            .map_err(tree_error::<N>)?;
    }

    index_ids(index, catalog, tree, &[new_id]);

    parents.push(new_id);
    parents.push(root);
    parents.sort_unstable();
    parents.dedup();

    persist(repo, tree, &parents)?;

    Ok(new_id)
}

fn summaries<N: RuleNode>(tree: &RuleTree<N>) -> Vec<RuleSummary> {
    tree.walk()
        .into_iter()
        .filter_map(|(id, depth)| {
            N::describe_in(tree, id).map(|description| RuleSummary {
                id,
                depth,
                description,
            })
        })
        .collect()
}
