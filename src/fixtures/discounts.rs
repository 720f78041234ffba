//! Discount Fixtures

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::Deserialize;

use crate::{
    discounts::{
        conditions::{ComboCondition, Condition, SimpleCondition},
        rule::DiscountRule,
        strategies::Strategy,
    },
    fixtures::{
        FixtureError,
        products::{parse_money, parse_percentage},
    },
};

/// Wrapper for discounts in YAML
#[derive(Debug, Deserialize)]
pub struct DiscountsFixture {
    /// Leaf discounts, added in file order
    #[serde(default)]
    pub discounts: Vec<DiscountFixture>,

    /// Composites built from earlier keys, in file order
    #[serde(default)]
    pub combinations: Vec<CombinationFixture>,
}

/// One leaf discount
#[derive(Debug, Deserialize)]
pub struct DiscountFixture {
    /// Key used by combinations and tests
    pub key: String,

    /// What the discount does
    pub strategy: StrategyFixture,

    /// When it applies; omitted means always
    #[serde(default)]
    pub condition: ConditionFixture,
}

impl DiscountFixture {
    /// Build the rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a percentage, price, timestamp or parameter is invalid.
    pub fn try_into_rule(self) -> Result<DiscountRule, FixtureError> {
        Ok(DiscountRule::new(
            self.condition.try_into_condition()?,
            self.strategy.try_into_strategy()?,
        ))
    }
}

/// Discount strategy from YAML
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyFixture {
    /// Percentage off the whole basket
    BasketPercent {
        /// Percentage (e.g. "10%")
        percent: String,
    },

    /// Percentage off one product
    ProductPercent {
        /// Product name
        product: String,

        /// Percentage (e.g. "10%")
        percent: String,
    },

    /// Percentage off a category
    CategoryPercent {
        /// Category name
        category: String,

        /// Percentage (e.g. "10%")
        percent: String,
    },

    /// Free units of one product
    FreePerXProduct {
        /// Product name
        product: String,

        /// Units given away
        free: u32,

        /// Units bought per round
        per_x: u32,

        /// Whether the deal repeats
        #[serde(default)]
        is_duplicate: bool,
    },

    /// Free units of each product in a category
    FreePerXCategory {
        /// Category name
        category: String,

        /// Units given away
        free: u32,

        /// Units bought per round
        per_x: u32,

        /// Whether the deal repeats
        #[serde(default)]
        is_duplicate: bool,
    },
}

impl StrategyFixture {
    /// Build the strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the percentage cannot be parsed or the parameters are invalid.
    pub fn try_into_strategy(self) -> Result<Strategy, FixtureError> {
        let strategy = match self {
            StrategyFixture::BasketPercent { percent } => {
                Strategy::basket_percent(parse_percentage(&percent)?)?
            }
            StrategyFixture::ProductPercent { product, percent } => {
                Strategy::product_percent(product, parse_percentage(&percent)?)?
            }
            StrategyFixture::CategoryPercent { category, percent } => {
                Strategy::category_percent(category, parse_percentage(&percent)?)?
            }
            StrategyFixture::FreePerXProduct {
                product,
                free,
                per_x,
                is_duplicate,
            } => Strategy::free_per_x_product(product, free, per_x, is_duplicate)?,
            StrategyFixture::FreePerXCategory {
                category,
                free,
                per_x,
                is_duplicate,
            } => Strategy::free_per_x_category(category, free, per_x, is_duplicate)?,
        };

        Ok(strategy)
    }
}

/// Discount condition from YAML
///
/// Only `ends_at` yields a simple condition; any threshold yields a combo condition.
#[derive(Debug, Default, Deserialize)]
pub struct ConditionFixture {
    /// Expiry instant (RFC 3339)
    pub ends_at: Option<String>,

    /// Minimum units in the basket
    pub basket_size_min: Option<u64>,

    /// Product -> minimum line total (e.g. "5.00 USD")
    #[serde(default)]
    pub product_price_min: BTreeMap<String, String>,

    /// Category -> minimum total
    #[serde(default)]
    pub category_price_min: BTreeMap<String, String>,

    /// Product -> minimum units
    #[serde(default)]
    pub product_quantity_min: BTreeMap<String, u32>,

    /// Category -> minimum units
    #[serde(default)]
    pub category_quantity_min: BTreeMap<String, u64>,
}

impl ConditionFixture {
    fn has_thresholds(&self) -> bool {
        self.basket_size_min.is_some()
            || !self.product_price_min.is_empty()
            || !self.category_price_min.is_empty()
            || !self.product_quantity_min.is_empty()
            || !self.category_quantity_min.is_empty()
    }

    /// Build the condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp or a price cannot be parsed, or a threshold is invalid.
    pub fn try_into_condition(self) -> Result<Condition, FixtureError> {
        let end_time = self.ends_at.as_deref().map(parse_timestamp).transpose()?;

        if !self.has_thresholds() {
            return Ok(end_time.map_or_else(SimpleCondition::default, SimpleCondition::until).into());
        }

        let mut condition = ComboCondition::new();

        if let Some(end) = end_time {
            condition = condition.with_end_time(end);
        }

        if let Some(min) = self.basket_size_min {
            condition = condition.with_basket_size_min(min);
        }

        for (product, min) in self.product_price_min {
            condition = condition.with_product_price_min(product, parse_money(&min)?)?;
        }

        for (category, min) in self.category_price_min {
            condition = condition.with_category_price_min(category, parse_money(&min)?)?;
        }

        for (product, min) in self.product_quantity_min {
            condition = condition.with_product_quantity_min(product, min)?;
        }

        for (category, min) in self.category_quantity_min {
            condition = condition.with_category_quantity_min(category, min)?;
        }

        Ok(condition.into())
    }
}

/// Composite built from previously loaded keys
#[derive(Debug, Deserialize)]
pub struct CombinationFixture {
    /// Key of the new composite
    pub key: String,

    /// Operator name: `xor`, `or` or `and`
    pub op: String,

    /// Keys of the rules moved under the composite
    pub members: Vec<String>,

    /// Discount applied after the members, if any
    pub wrapper: Option<WrapperFixture>,
}

/// Wrapper discount of a composite
#[derive(Debug, Deserialize)]
pub struct WrapperFixture {
    /// What the wrapper does
    pub strategy: StrategyFixture,

    /// When it applies; omitted means always
    #[serde(default)]
    pub condition: ConditionFixture,
}

impl WrapperFixture {
    /// Build the wrapper rule.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is invalid.
    pub fn try_into_rule(self) -> Result<DiscountRule, FixtureError> {
        Ok(DiscountRule::new(
            self.condition.try_into_condition()?,
            self.strategy.try_into_strategy()?,
        ))
    }
}

/// Parse an RFC 3339 timestamp (e.g. "2026-12-31T23:59:59Z").
///
/// # Errors
///
/// Returns [`FixtureError::InvalidTimestamp`] if the string cannot be parsed.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, FixtureError> {
    s.trim()
        .parse::<Timestamp>()
        .map_err(|_err| FixtureError::InvalidTimestamp(s.to_string()))
}
