//! Basket

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{categories::Categories, pricing::Price};

/// Errors related to basket construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BasketError {
    /// A line's currency differs from the basket currency (product, line currency, basket currency).
    #[error("Line {0} has currency {1}, but basket has currency {2}")]
    CurrencyMismatch(String, &'static str, &'static str),

    /// The product already has a line in the basket.
    #[error("Product {0} is already in the basket")]
    DuplicateProduct(String),

    /// A line was created with zero units.
    #[error("Line {0} must have a quantity of at least 1")]
    ZeroQuantity(String),

    /// The line total or the basket total does not fit in minor units.
    #[error("Line {0} total overflows")]
    TotalOverflow(String),

    /// A line was created with a negative unit price.
    #[error("Line {0} has a negative unit price")]
    NegativePrice(String),
}

/// One product line of a basket.
///
/// `total` starts at `unit_price * quantity` and is the only field discounts change.
#[derive(Debug, Clone, PartialEq)]
pub struct BasketLine {
    product: String,
    quantity: u32,
    unit_price: Price,
    total: Price,
    categories: Categories,
}

impl BasketLine {
    /// Create a line for `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::ZeroQuantity`] for an empty line, [`BasketError::NegativePrice`]
    /// for a unit price below zero and [`BasketError::TotalOverflow`] if the line total
    /// cannot be represented.
    pub fn new(
        product: impl Into<String>,
        quantity: u32,
        unit_price: Price,
        categories: Categories,
    ) -> Result<Self, BasketError> {
        let product = product.into();

        if quantity == 0 {
            return Err(BasketError::ZeroQuantity(product));
        }

        if unit_price.to_minor_units() < 0 {
            return Err(BasketError::NegativePrice(product));
        }

        let total = unit_price
            .to_minor_units()
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| BasketError::TotalOverflow(product.clone()))?;

        Ok(Self {
            total: Money::from_minor(total, unit_price.currency()),
            product,
            quantity,
            unit_price,
            categories,
        })
    }

    /// Product name.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Number of units.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Catalog price of one unit.
    pub fn unit_price(&self) -> &Price {
        &self.unit_price
    }

    /// Running line total after any discounts applied so far.
    pub fn total(&self) -> &Price {
        &self.total
    }

    /// Categories of the product.
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Whether the line's product belongs to `category`.
    pub fn in_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub(crate) fn total_minor(&self) -> i64 {
        self.total.to_minor_units()
    }

    pub(crate) fn set_total_minor(&mut self, minor: i64) {
        self.total = Money::from_minor(minor, self.total.currency());
    }
}

/// Ordered product lines of one store's share of a shopping cart.
///
/// Cloning a basket produces the independent copy that discount evaluation works on.
#[derive(Debug, Clone, PartialEq)]
pub struct Basket {
    lines: Vec<BasketLine>,
    currency: &'static Currency,
}

impl Basket {
    /// Create an empty basket.
    pub fn new(currency: &'static Currency) -> Self {
        Basket {
            lines: Vec::new(),
            currency,
        }
    }

    /// Create a basket with the given lines, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns a `BasketError` on a currency mismatch or a repeated product.
    pub fn with_lines(
        lines: impl IntoIterator<Item = BasketLine>,
        currency: &'static Currency,
    ) -> Result<Self, BasketError> {
        let mut basket = Basket::new(currency);

        for line in lines {
            basket.add_line(line)?;
        }

        Ok(basket)
    }

    /// Append a line.
    ///
    /// # Errors
    ///
    /// Returns a `BasketError` on a currency mismatch, a repeated product or a
    /// basket total that no longer fits in minor units.
    pub fn add_line(&mut self, line: BasketLine) -> Result<&mut Self, BasketError> {
        let line_currency = line.unit_price.currency();

        if line_currency != self.currency {
            return Err(BasketError::CurrencyMismatch(
                line.product,
                line_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        if self.line(&line.product).is_some() {
            return Err(BasketError::DuplicateProduct(line.product));
        }

        // Discounts only lower line totals, so a bounded total here bounds every later sum.
        if self.total_minor().checked_add(line.total_minor()).is_none() {
            return Err(BasketError::TotalOverflow(line.product));
        }

        self.lines.push(line);

        Ok(self)
    }

    /// Find the line for `product`.
    pub fn line(&self, product: &str) -> Option<&BasketLine> {
        self.lines.iter().find(|line| line.product == product)
    }

    /// All lines in insertion order.
    pub fn lines(&self) -> &[BasketLine] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> impl Iterator<Item = &mut BasketLine> {
        self.lines.iter_mut()
    }

    /// Sum of all running line totals.
    pub fn total(&self) -> Price {
        Money::from_minor(self.total_minor(), self.currency)
    }

    pub(crate) fn total_minor(&self) -> i64 {
        self.lines.iter().map(BasketLine::total_minor).sum()
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Units of products in `category`.
    pub fn category_quantity(&self, category: &str) -> u64 {
        self.lines
            .iter()
            .filter(|line| line.in_category(category))
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Running total of products in `category`.
    pub fn category_total(&self, category: &str) -> Price {
        Money::from_minor(self.category_total_minor(category), self.currency)
    }

    pub(crate) fn category_total_minor(&self, category: &str) -> i64 {
        self.lines
            .iter()
            .filter(|line| line.in_category(category))
            .map(BasketLine::total_minor)
            .sum()
    }

    /// Get the number of lines in the basket.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the basket is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the currency of the basket.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}
