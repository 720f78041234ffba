//! Store Rule Index
//!
//! Maps catalog products to the discount and policy ids that can affect them, so catalog
//! display does not have to walk the trees.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ids::{RuleId, RuleKind};

/// Product name to rule ids, per rule kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreRuleIndex {
    discounts: FxHashMap<String, FxHashSet<RuleId>>,
    policies: FxHashMap<String, FxHashSet<RuleId>>,
}

impl StoreRuleIndex {
    /// Record that rule `id` affects `product`.
    pub fn insert(&mut self, kind: RuleKind, product: &str, id: RuleId) {
        self.entries_mut(kind)
            .entry(product.to_string())
            .or_default()
            .insert(id);
    }

    /// Strip `ids` from every product, dropping products left without rules.
    pub fn remove_ids(&mut self, kind: RuleKind, ids: &[RuleId]) {
        let entries = self.entries_mut(kind);

        for rules in entries.values_mut() {
            rules.retain(|id| !ids.contains(id));
        }

        entries.retain(|_, rules| !rules.is_empty());
    }

    /// Forget every rule recorded against `product`.
    pub fn remove_product(&mut self, product: &str) {
        self.discounts.remove(product);
        self.policies.remove(product);
    }

    /// Rule ids affecting `product`, sorted.
    pub fn ids_for(&self, kind: RuleKind, product: &str) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = self
            .entries(kind)
            .get(product)
            .map(|rules| rules.iter().copied().collect())
            .unwrap_or_default();

        ids.sort_unstable();
        ids
    }

    /// Whether `id` is indexed against any product.
    pub fn mentions(&self, kind: RuleKind, id: RuleId) -> bool {
        self.entries(kind).values().any(|rules| rules.contains(&id))
    }

    /// Products with at least one rule of `kind`.
    pub fn products(&self, kind: RuleKind) -> impl Iterator<Item = &str> {
        self.entries(kind).keys().map(String::as_str)
    }

    fn entries(&self, kind: RuleKind) -> &FxHashMap<String, FxHashSet<RuleId>> {
        match kind {
            RuleKind::Discount => &self.discounts,
            RuleKind::Policy => &self.policies,
        }
    }

    fn entries_mut(&mut self, kind: RuleKind) -> &mut FxHashMap<String, FxHashSet<RuleId>> {
        match kind {
            RuleKind::Discount => &mut self.discounts,
            RuleKind::Policy => &mut self.policies,
        }
    }
}
