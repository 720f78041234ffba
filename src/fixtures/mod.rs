//! Fixtures

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    basket::{Basket, BasketError, BasketLine},
    catalog::{Catalog, CatalogProduct},
    fixtures::{
        baskets::BasketFixture, discounts::DiscountsFixture, policies::PoliciesFixture,
        products::ProductsFixture,
    },
    ids::RuleId,
    persistence::memory::InMemoryRuleRepository,
    store::{StoreError, StoreRules},
    tree::CompositeOp,
    validation::ValidationError,
};

pub mod baskets;
pub mod discounts;
pub mod policies;
pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Invalid timestamp format
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Rule key not found
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// No basket loaded
    #[error("No basket loaded")]
    NoBasket,

    /// Basket creation error
    #[error("Failed to create basket: {0}")]
    Basket(#[from] BasketError),

    /// Invalid rule parameters
    #[error("Invalid rule: {0}")]
    Validation(#[from] ValidationError),

    /// Store rejected a rule
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Fixture
///
/// Owns a catalog, an in-memory repository, and the store rules built from the loaded files.
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Products loaded so far
    catalog: Catalog,

    /// Currency for the fixture set
    currency: Option<&'static Currency>,

    /// Storage behind `store`
    repository: InMemoryRuleRepository,

    /// Created with the first rule file
    store: Option<StoreRules>,

    /// String key -> rule id mappings for lookups
    discount_keys: FxHashMap<String, RuleId>,
    policy_keys: FxHashMap<String, RuleId>,

    basket: Option<Basket>,
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: Catalog::default(),
            currency: None,
            repository: InMemoryRuleRepository::new(),
            store: None,
            discount_keys: FxHashMap::default(),
            policy_keys: FxHashMap::default(),
            basket: None,
        }
    }

    fn read(&self, category: &str, name: &str) -> Result<String, FixtureError> {
        let file_path = self.base_path.join(category).join(format!("{name}.yml"));

        Ok(fs::read_to_string(&file_path)?)
    }

    /// Load products from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or if there are currency mismatches.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: ProductsFixture = serde_norway::from_str(&self.read("products", name)?)?;

        let mut products: Vec<(String, _)> = fixture.products.into_iter().collect();
        products.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (key, product_fixture) in products {
            let product: CatalogProduct = product_fixture.into_product(key)?;
            let currency = product.price.currency();

            // Validate currency consistency
            if let Some(existing_currency) = self.currency {
                if existing_currency != currency {
                    return Err(FixtureError::CurrencyMismatch(
                        existing_currency.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                self.currency = Some(currency);
            }

            if let Some(store) = self.store.as_mut() {
                store.add_product(product.clone());
            }

            self.catalog.insert(product);
        }

        Ok(self)
    }

    /// Load a basket from a YAML fixture file, pricing lines from the catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a product is unknown, or a line is
    /// invalid.
    pub fn load_basket(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let currency = self.currency()?;
        let fixture: BasketFixture = serde_norway::from_str(&self.read("baskets", name)?)?;

        let mut basket = Basket::new(currency);

        for line in fixture.lines {
            let product = self.product(&line.product)?;

            basket.add_line(BasketLine::new(
                line.product,
                line.quantity,
                product.price,
                product.categories.clone(),
            )?)?;
        }

        self.basket = Some(basket);

        Ok(self)
    }

    /// Load discounts and their combinations from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a rule is invalid, or a
    /// combination names an unknown key.
    pub fn load_discounts(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: DiscountsFixture = serde_norway::from_str(&self.read("discounts", name)?)?;

        self.ensure_store()?;

        let Self {
            store,
            repository,
            discount_keys,
            ..
        } = &mut *self;
        let store = store.as_mut().ok_or(FixtureError::NoCurrency)?;

        for discount in fixture.discounts {
            let key = discount.key.clone();
            let id = store.add_discount(repository, discount.try_into_rule()?)?;

            discount_keys.insert(key, id);
        }

        for combination in fixture.combinations {
            let op: CompositeOp = combination.op.parse()?;
            let ids = lookup_keys(discount_keys, &combination.members)?;
            let wrapper = combination
                .wrapper
                .map(discounts::WrapperFixture::try_into_rule)
                .transpose()?;

            let id = store.combine_discounts(repository, &ids, op, wrapper)?;

            discount_keys.insert(combination.key, id);
        }

        Ok(self)
    }

    /// Load policies and their combinations from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a rule is invalid, or a
    /// combination names an unknown key.
    pub fn load_policies(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: PoliciesFixture = serde_norway::from_str(&self.read("policies", name)?)?;

        self.ensure_store()?;

        let Self {
            store,
            repository,
            policy_keys,
            ..
        } = &mut *self;
        let store = store.as_mut().ok_or(FixtureError::NoCurrency)?;

        for policy in fixture.policies {
            let id = store.add_policy(repository, policy.rule.try_into_leaf()?)?;

            policy_keys.insert(policy.key, id);
        }

        for combination in fixture.combinations {
            let op: CompositeOp = combination.op.parse()?;
            let ids = lookup_keys(policy_keys, &combination.members)?;

            let id = store.combine_policies(repository, &ids, op)?;

            policy_keys.insert(combination.key, id);
        }

        Ok(self)
    }

    /// Load a complete fixture set (products, basket, discounts and policies with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_set(name)?;

        Ok(fixture)
    }

    /// Load a complete fixture set into this fixture
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn load_set(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        self.load_products(name)?
            .load_basket(name)?
            .load_discounts(name)?
            .load_policies(name)
    }

    fn ensure_store(&mut self) -> Result<(), FixtureError> {
        if self.store.is_none() {
            let currency = self.currency()?;
            let store = StoreRules::new(&mut self.repository, currency, self.catalog.clone())?;

            self.store = Some(store);
        }

        Ok(())
    }

    /// Get a product by name
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found.
    pub fn product(&self, name: &str) -> Result<&CatalogProduct, FixtureError> {
        self.catalog
            .get(name)
            .ok_or_else(|| FixtureError::ProductNotFound(name.to_string()))
    }

    /// Get a discount id by its key
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found.
    pub fn discount_id(&self, key: &str) -> Result<RuleId, FixtureError> {
        self.discount_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::RuleNotFound(key.to_string()))
    }

    /// Get a policy id by its key
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found.
    pub fn policy_id(&self, key: &str) -> Result<RuleId, FixtureError> {
        self.policy_keys
            .get(key)
            .copied()
            .ok_or_else(|| FixtureError::RuleNotFound(key.to_string()))
    }

    /// Get the loaded basket
    ///
    /// # Errors
    ///
    /// Returns an error if no basket has been loaded.
    pub fn basket(&self) -> Result<&Basket, FixtureError> {
        self.basket.as_ref().ok_or(FixtureError::NoBasket)
    }

    /// Get the store rules
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn store(&mut self) -> Result<&StoreRules, FixtureError> {
        self.ensure_store()?;

        self.store.as_ref().ok_or(FixtureError::NoCurrency)
    }

    /// Get the store rules together with their repository, for further edits
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn store_mut(
        &mut self,
    ) -> Result<(&mut StoreRules, &mut InMemoryRuleRepository), FixtureError> {
        self.ensure_store()?;

        let Self {
            store, repository, ..
        } = self;

        Ok((store.as_mut().ok_or(FixtureError::NoCurrency)?, repository))
    }

    /// Get the loaded products
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the repository
    pub fn repository(&self) -> &InMemoryRuleRepository {
        &self.repository
    }

    /// Get the currency
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn currency(&self) -> Result<&'static Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_keys(keys: &FxHashMap<String, RuleId>, members: &[String]) -> Result<Vec<RuleId>, FixtureError> {
    members
        .iter()
        .map(|member| {
            keys.get(member)
                .copied()
                .ok_or_else(|| FixtureError::RuleNotFound(member.clone()))
        })
        .collect()
}
