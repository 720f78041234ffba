//! Store Catalog

use rustc_hash::FxHashMap;

use crate::{categories::Categories, pricing::Price};

/// A product listed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    /// Product name, unique within the store.
    pub name: String,

    /// Categories the product is listed under.
    pub categories: Categories,

    /// Undiscounted unit price.
    pub price: Price,
}

/// Product name to product lookup used to (re)build the rule index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: FxHashMap<String, CatalogProduct>,
}

impl Catalog {
    /// Create a catalog from products; later duplicates replace earlier ones.
    pub fn with_products(products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        let mut catalog = Self::default();

        for product in products {
            catalog.insert(product);
        }

        catalog
    }

    /// Add or replace a product, returning the previous listing.
    pub fn insert(&mut self, product: CatalogProduct) -> Option<CatalogProduct> {
        self.products.insert(product.name.clone(), product)
    }

    /// Look up a product by name.
    pub fn get(&self, name: &str) -> Option<&CatalogProduct> {
        self.products.get(name)
    }

    /// Iterate products in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogProduct> {
        self.products.values()
    }

    /// Number of listed products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
