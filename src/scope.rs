//! Rule Scope
//!
//! The set of catalog products a rule can possibly touch, used to maintain the store index.

use smallvec::SmallVec;

use crate::categories::Categories;

/// Products and categories a rule mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleScope {
    everywhere: bool,
    products: SmallVec<[String; 2]>,
    categories: SmallVec<[String; 2]>,
}

impl RuleScope {
    /// Scope that touches every product.
    pub fn everywhere() -> Self {
        Self {
            everywhere: true,
            ..Self::default()
        }
    }

    /// Scope naming a single product.
    pub fn product(name: &str) -> Self {
        let mut scope = Self::default();
        scope.add_product(name);
        scope
    }

    /// Scope naming a single category.
    pub fn category(name: &str) -> Self {
        let mut scope = Self::default();
        scope.add_category(name);
        scope
    }

    /// Add a product name.
    pub fn add_product(&mut self, name: &str) {
        if !self.products.iter().any(|known| known == name) {
            self.products.push(name.to_string());
        }
    }

    /// Add a category name.
    pub fn add_category(&mut self, name: &str) {
        if !self.categories.iter().any(|known| known == name) {
            self.categories.push(name.to_string());
        }
    }

    /// Union `other` into this scope.
    #[must_use]
    pub fn merge(mut self, other: RuleScope) -> Self {
        self.everywhere |= other.everywhere;

        for product in &other.products {
            self.add_product(product);
        }

        for category in &other.categories {
            self.add_category(category);
        }

        self
    }

    /// Whether a product with these categories is in scope.
    pub fn matches(&self, product: &str, categories: &Categories) -> bool {
        self.everywhere
            || self.products.iter().any(|name| name == product)
            || self.categories.iter().any(|name| categories.contains(name))
    }

    /// Whether the scope touches nothing.
    pub fn is_empty(&self) -> bool {
        !self.everywhere && self.products.is_empty() && self.categories.is_empty()
    }
}
