//! Discount Strategies

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::Money;

use crate::{
    basket::{Basket, BasketLine},
    categories::Categories,
    pricing::{Price, percent_points, percent_value, reduce_by_percent, share_of_minor},
    scope::RuleScope,
    validation::{ValidationError, require_name},
};

/// Price reduction applied to the lines a discount targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Percentage off every line.
    BasketPercent {
        /// Fraction taken off.
        percent: Percentage,
    },

    /// Percentage off one product's line.
    ProductPercent {
        /// Discounted product.
        product: String,
        /// Fraction taken off.
        percent: Percentage,
    },

    /// Percentage off every line in a category.
    CategoryPercent {
        /// Discounted category.
        category: String,
        /// Fraction taken off.
        percent: Percentage,
    },

    /// Free units of one product.
    FreePerXProduct {
        /// Discounted product.
        product: String,
        /// Bundle definition.
        deal: FreePerX,
    },

    /// Free units of every product in a category, counted per line.
    FreePerXCategory {
        /// Discounted category.
        category: String,
        /// Bundle definition.
        deal: FreePerX,
    },
}

impl Strategy {
    /// Percentage off the whole basket.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PercentOutOfRange`] unless `0 <= percent < 1`.
    pub fn basket_percent(percent: Percentage) -> Result<Self, ValidationError> {
        validate_percent(&percent)?;

        Ok(Strategy::BasketPercent { percent })
    }

    /// Percentage off one product.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or an out of range percentage.
    pub fn product_percent(
        product: impl Into<String>,
        percent: Percentage,
    ) -> Result<Self, ValidationError> {
        let strategy = Strategy::ProductPercent {
            product: product.into(),
            percent,
        };
        strategy.validate()?;

        Ok(strategy)
    }

    /// Percentage off one category.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or an out of range percentage.
    pub fn category_percent(
        category: impl Into<String>,
        percent: Percentage,
    ) -> Result<Self, ValidationError> {
        let strategy = Strategy::CategoryPercent {
            category: category.into(),
            percent,
        };
        strategy.validate()?;

        Ok(strategy)
    }

    /// `free` units of `product` for every `per_x` bought.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or `free >= per_x`.
    pub fn free_per_x_product(
        product: impl Into<String>,
        free: u32,
        per_x: u32,
        is_duplicate: bool,
    ) -> Result<Self, ValidationError> {
        let strategy = Strategy::FreePerXProduct {
            product: product.into(),
            deal: FreePerX::new(free, per_x, is_duplicate)?,
        };
        strategy.validate()?;

        Ok(strategy)
    }

    /// `free` units of each `category` product for every `per_x` bought.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or `free >= per_x`.
    pub fn free_per_x_category(
        category: impl Into<String>,
        free: u32,
        per_x: u32,
        is_duplicate: bool,
    ) -> Result<Self, ValidationError> {
        let strategy = Strategy::FreePerXCategory {
            category: category.into(),
            deal: FreePerX::new(free, per_x, is_duplicate)?,
        };
        strategy.validate()?;

        Ok(strategy)
    }

    /// Re-check parameters of a strategy that may have been built directly.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Strategy::BasketPercent { percent } => validate_percent(percent),
            Strategy::ProductPercent { product, percent } => {
                require_name("product", product)?;
                validate_percent(percent)
            }
            Strategy::CategoryPercent { category, percent } => {
                require_name("category", category)?;
                validate_percent(percent)
            }
            Strategy::FreePerXProduct { product, .. } => require_name("product", product),
            Strategy::FreePerXCategory { category, .. } => require_name("category", category),
        }
    }

    /// Reduce the running totals of targeted lines in place. Quantities are never changed.
    pub fn apply(&self, basket: &mut Basket) {
        for line in basket.lines_mut() {
            if self.targets(line.product(), line.categories()) {
                self.apply_to_line(line);
            }
        }
    }

    fn apply_to_line(&self, line: &mut BasketLine) {
        let total = line.total_minor();

        let reduced = match self {
            Strategy::BasketPercent { percent }
            | Strategy::ProductPercent { percent, .. }
            | Strategy::CategoryPercent { percent, .. } => reduce_by_percent(percent, total),
            Strategy::FreePerXProduct { deal, .. } | Strategy::FreePerXCategory { deal, .. } => {
                total - deal.reduction(total, line.quantity())
            }
        };

        line.set_total_minor(reduced);
    }

    /// Price shown in the catalog for one unit of a product.
    ///
    /// Bundle deals need basket context, so they leave the price untouched.
    pub fn apply_to_price(&self, product: &str, categories: &Categories, price: Price) -> Price {
        match self {
            Strategy::BasketPercent { percent }
            | Strategy::ProductPercent { percent, .. }
            | Strategy::CategoryPercent { percent, .. }
                if self.targets(product, categories) =>
            {
                Money::from_minor(
                    reduce_by_percent(percent, price.to_minor_units()),
                    price.currency(),
                )
            }
            _ => price,
        }
    }

    /// Whether a product with these categories is reduced by this strategy.
    pub fn targets(&self, product: &str, categories: &Categories) -> bool {
        match self {
            Strategy::BasketPercent { .. } => true,
            Strategy::ProductPercent { product: target, .. }
            | Strategy::FreePerXProduct {
                product: target, ..
            } => target == product,
            Strategy::CategoryPercent {
                category: target, ..
            }
            | Strategy::FreePerXCategory {
                category: target, ..
            } => categories.contains(target),
        }
    }

    /// Products and categories the strategy can reduce.
    pub fn scope(&self) -> RuleScope {
        match self {
            Strategy::BasketPercent { .. } => RuleScope::everywhere(),
            Strategy::ProductPercent { product, .. } | Strategy::FreePerXProduct { product, .. } => {
                RuleScope::product(product)
            }
            Strategy::CategoryPercent { category, .. }
            | Strategy::FreePerXCategory { category, .. } => RuleScope::category(category),
        }
    }

    /// Human readable description.
    pub fn describe(&self) -> String {
        match self {
            Strategy::BasketPercent { percent } => {
                format!("get discount {}% on entire baskets", percent_points(percent))
            }
            Strategy::ProductPercent { product, percent } => format!(
                "get discount of {}% on products: {product}",
                percent_points(percent)
            ),
            Strategy::CategoryPercent { category, percent } => format!(
                "get discount of {}% on category: {category}",
                percent_points(percent)
            ),
            Strategy::FreePerXProduct { product, deal } => {
                format!("get {} of product {product}", deal.describe())
            }
            Strategy::FreePerXCategory { category, deal } => {
                format!("get {} of category {category}", deal.describe())
            }
        }
    }
}

fn validate_percent(percent: &Percentage) -> Result<(), ValidationError> {
    let value = percent_value(percent);

    if value >= Decimal::ZERO && value < Decimal::ONE {
        Ok(())
    } else {
        Err(ValidationError::PercentOutOfRange(
            percent_points(percent).to_string(),
        ))
    }
}

/// "Buy `per_x`, get `free` free" bundle, with `free < per_x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreePerX {
    free: u32,
    per_x: u32,
    is_duplicate: bool,
}

impl FreePerX {
    /// Create a bundle; `is_duplicate` repeats the reward for every full bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::FreeNotBelowPaid`] when `free >= per_x`.
    pub fn new(free: u32, per_x: u32, is_duplicate: bool) -> Result<Self, ValidationError> {
        if free >= per_x {
            return Err(ValidationError::FreeNotBelowPaid { free, per_x });
        }

        Ok(Self {
            free,
            per_x,
            is_duplicate,
        })
    }

    /// Units given away per bundle.
    pub fn free(&self) -> u32 {
        self.free
    }

    /// Units bought per bundle.
    pub fn per_x(&self) -> u32 {
        self.per_x
    }

    /// Whether the reward repeats.
    pub fn is_duplicate(&self) -> bool {
        self.is_duplicate
    }

    /// Number of times the reward is granted for `quantity` units.
    pub fn rounds(&self, quantity: u32) -> u32 {
        let bundle = self.free.saturating_add(self.per_x);

        if self.is_duplicate {
            quantity / bundle
        } else {
            u32::from(quantity >= bundle)
        }
    }

    /// Amount taken off a line of `quantity` units totalling `total` minor units.
    fn reduction(&self, total: i64, quantity: u32) -> i64 {
        let rounds = self.rounds(quantity);

        if rounds == 0 {
            return 0;
        }

        // Unit price is taken from the running total, so earlier discounts carry through.
        share_of_minor(total, self.free, quantity)
            .ok()
            .and_then(|per_round| per_round.checked_mul(i64::from(rounds)))
            .unwrap_or(0)
    }

    fn describe(&self) -> String {
        let once = if self.is_duplicate { "" } else { " (once)" };

        format!("free {} on every {}{once}", self.free, self.per_x)
    }
}
