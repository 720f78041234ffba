//! Discount Conditions

use jiff::Timestamp;
use rusty_money::iso::Currency;
use smallvec::SmallVec;

use crate::{
    basket::Basket,
    pricing::{Price, format_price},
    scope::RuleScope,
    validation::{ValidationError, require_name},
};

/// Predicate gating whether a discount's strategy may run.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Time validity only.
    Simple(SimpleCondition),

    /// Time validity plus basket thresholds.
    Combo(ComboCondition),
}

impl Condition {
    /// A condition that never expires and has no thresholds.
    pub fn always() -> Self {
        Condition::Simple(SimpleCondition::default())
    }

    /// A condition that holds until `end`.
    pub fn until(end: Timestamp) -> Self {
        Condition::Simple(SimpleCondition::until(end))
    }

    /// Whether the condition holds for `basket` at `now`.
    pub fn holds(&self, basket: &Basket, now: Timestamp) -> bool {
        match self {
            Condition::Simple(simple) => simple.is_valid_at(now),
            Condition::Combo(combo) => combo.holds(basket, now),
        }
    }

    /// Products and categories the condition inspects.
    pub fn scope(&self) -> RuleScope {
        match self {
            Condition::Simple(_) => RuleScope::default(),
            Condition::Combo(combo) => combo.scope(),
        }
    }

    /// Check money thresholds against the store currency.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for negative thresholds or foreign currencies.
    pub fn validate(&self, currency: &'static Currency) -> Result<(), ValidationError> {
        match self {
            Condition::Simple(_) => Ok(()),
            Condition::Combo(combo) => combo.validate(currency),
        }
    }

    /// Human readable description.
    pub fn describe(&self) -> String {
        match self {
            Condition::Simple(simple) => simple.describe(),
            Condition::Combo(combo) => combo.describe(),
        }
    }
}

impl From<SimpleCondition> for Condition {
    fn from(condition: SimpleCondition) -> Self {
        Condition::Simple(condition)
    }
}

impl From<ComboCondition> for Condition {
    fn from(condition: ComboCondition) -> Self {
        Condition::Combo(condition)
    }
}

/// Expiry-only condition; `None` never expires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleCondition {
    end_time: Option<Timestamp>,
}

impl SimpleCondition {
    /// Condition valid strictly before `end`.
    pub fn until(end: Timestamp) -> Self {
        Self {
            end_time: Some(end),
        }
    }

    /// Expiry instant, if any.
    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    /// Whether `now` is before the expiry.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.end_time.is_none_or(|end| now < end)
    }

    fn describe(&self) -> String {
        describe_expiry(self.end_time)
    }
}

fn describe_expiry(end_time: Option<Timestamp>) -> String {
    match end_time {
        Some(end) => format!("until date {}", end.strftime("%d-%m-%Y")),
        None => "with no end date".to_string(),
    }
}

/// Expiry plus any combination of basket thresholds; unset facets always pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComboCondition {
    end_time: Option<Timestamp>,
    basket_size_min: Option<u64>,
    product_price_min: SmallVec<[(String, Price); 2]>,
    category_price_min: SmallVec<[(String, Price); 2]>,
    product_quantity_min: SmallVec<[(String, u32); 2]>,
    category_quantity_min: SmallVec<[(String, u64); 2]>,
}

impl ComboCondition {
    /// Combo condition with no thresholds that never expires.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the condition at `end`.
    #[must_use]
    pub fn with_end_time(mut self, end: Timestamp) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Require at least `min` units in the basket.
    #[must_use]
    pub fn with_basket_size_min(mut self, min: u64) -> Self {
        self.basket_size_min = Some(min);
        self
    }

    /// Require the line total of `product` to reach `min`. An absent product fails.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or a negative amount.
    pub fn with_product_price_min(
        mut self,
        product: impl Into<String>,
        min: Price,
    ) -> Result<Self, ValidationError> {
        let product = product.into();
        require_name("product", &product)?;
        require_non_negative(&product, &min)?;

        self.product_price_min.push((product, min));

        Ok(self)
    }

    /// Require the total spent in `category` to reach `min`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or a negative amount.
    pub fn with_category_price_min(
        mut self,
        category: impl Into<String>,
        min: Price,
    ) -> Result<Self, ValidationError> {
        let category = category.into();
        require_name("category", &category)?;
        require_non_negative(&category, &min)?;

        self.category_price_min.push((category, min));

        Ok(self)
    }

    /// Require at least `min` units of `product`. An absent product passes.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name.
    pub fn with_product_quantity_min(
        mut self,
        product: impl Into<String>,
        min: u32,
    ) -> Result<Self, ValidationError> {
        let product = product.into();
        require_name("product", &product)?;

        self.product_quantity_min.push((product, min));

        Ok(self)
    }

    /// Require at least `min` units from `category`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name.
    pub fn with_category_quantity_min(
        mut self,
        category: impl Into<String>,
        min: u64,
    ) -> Result<Self, ValidationError> {
        let category = category.into();
        require_name("category", &category)?;

        self.category_quantity_min.push((category, min));

        Ok(self)
    }

    /// Whether every facet holds for `basket` at `now`.
    pub fn holds(&self, basket: &Basket, now: Timestamp) -> bool {
        self.end_time.is_none_or(|end| now < end)
            && self
                .basket_size_min
                .is_none_or(|min| basket.total_quantity() >= min)
            && self
                .category_price_min
                .iter()
                .all(|(category, min)| basket.category_total_minor(category) >= min.to_minor_units())
            && self.product_price_min.iter().all(|(product, min)| {
                basket
                    .line(product)
                    .is_some_and(|line| line.total_minor() >= min.to_minor_units())
            })
            && self.product_quantity_min.iter().all(|(product, min)| {
                basket
                    .line(product)
                    .is_none_or(|line| line.quantity() >= *min)
            })
            && self
                .category_quantity_min
                .iter()
                .all(|(category, min)| basket.category_quantity(category) >= *min)
    }

    fn scope(&self) -> RuleScope {
        let mut scope = if self.basket_size_min.is_some() {
            RuleScope::everywhere()
        } else {
            RuleScope::default()
        };

        for (product, _) in &self.product_price_min {
            scope.add_product(product);
        }

        for (product, _) in &self.product_quantity_min {
            scope.add_product(product);
        }

        for (category, _) in &self.category_price_min {
            scope.add_category(category);
        }

        for (category, _) in &self.category_quantity_min {
            scope.add_category(category);
        }

        scope
    }

    fn validate(&self, currency: &'static Currency) -> Result<(), ValidationError> {
        self.product_price_min
            .iter()
            .chain(&self.category_price_min)
            .try_for_each(|(subject, min)| {
                require_non_negative(subject, min)?;

                if min.currency() == currency {
                    Ok(())
                } else {
                    Err(ValidationError::CurrencyMismatch {
                        subject: subject.clone(),
                        found: min.currency().iso_alpha_code,
                        expected: currency.iso_alpha_code,
                    })
                }
            })
    }

    fn describe(&self) -> String {
        let mut parts = vec![describe_expiry(self.end_time)];

        if let Some(min) = self.basket_size_min {
            parts.push(format!("minimum size of basket: {min}"));
        }

        if !self.product_price_min.is_empty() {
            parts.push(format!(
                "minimum price for products: {}",
                join_prices(&self.product_price_min)
            ));
        }

        if !self.category_price_min.is_empty() {
            parts.push(format!(
                "minimum price for category: {}",
                join_prices(&self.category_price_min)
            ));
        }

        if !self.product_quantity_min.is_empty() {
            parts.push(format!(
                "minimum quantity for products: {}",
                join_quantities(&self.product_quantity_min)
            ));
        }

        if !self.category_quantity_min.is_empty() {
            parts.push(format!(
                "minimum quantity for category: {}",
                join_quantities(&self.category_quantity_min)
            ));
        }

        parts.join("; ")
    }
}

fn require_non_negative(subject: &str, min: &Price) -> Result<(), ValidationError> {
    if min.to_minor_units() < 0 {
        Err(ValidationError::NegativeThreshold {
            subject: subject.to_string(),
        })
    } else {
        Ok(())
    }
}

fn join_prices(thresholds: &[(String, Price)]) -> String {
    thresholds
        .iter()
        .map(|(subject, min)| format!("{subject} {}", format_price(min)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_quantities<Q: std::fmt::Display>(thresholds: &[(String, Q)]) -> String {
    thresholds
        .iter()
        .map(|(subject, min)| format!("{subject} x{min}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use rusty_money::{
        Money,
        iso::{GBP, USD},
    };
    use testresult::TestResult;

    use super::*;
    use crate::{basket::BasketLine, categories::Categories};

    fn usd(minor: i64) -> Price {
        Money::from_minor(minor, USD)
    }

    fn basket() -> TestResult<Basket> {
        Ok(Basket::with_lines(
            [
                BasketLine::new("milk", 2, usd(1_000), Categories::from_strs(&["dairy"]))?,
                BasketLine::new("cheese", 1, usd(2_000), Categories::from_strs(&["dairy"]))?,
                BasketLine::new("bread", 3, usd(300), Categories::from_strs(&["bakery"]))?,
            ],
            USD,
        )?)
    }

    fn instant(s: &str) -> TestResult<Timestamp> {
        Ok(s.parse()?)
    }

    #[test]
    fn simple_condition_expires_at_end_time() -> TestResult {
        let basket = basket()?;
        let condition = Condition::until(instant("2026-01-01T00:00:00Z")?);

        assert!(condition.holds(&basket, instant("2025-12-31T23:59:59Z")?));
        assert!(!condition.holds(&basket, instant("2026-01-01T00:00:00Z")?));
        assert!(Condition::always().holds(&basket, instant("2099-01-01T00:00:00Z")?));

        Ok(())
    }

    #[test]
    fn category_price_threshold() -> TestResult {
        let basket = basket()?;
        let now = instant("2025-06-01T12:00:00Z")?;

        let met = ComboCondition::new().with_category_price_min("dairy", usd(4_000))?;
        let unmet = ComboCondition::new().with_category_price_min("dairy", usd(4_001))?;

        assert!(met.holds(&basket, now));
        assert!(!unmet.holds(&basket, now));

        Ok(())
    }

    #[test]
    fn absent_product_fails_price_but_passes_quantity() -> TestResult {
        let basket = basket()?;
        let now = instant("2025-06-01T12:00:00Z")?;

        let price = ComboCondition::new().with_product_price_min("butter", usd(0))?;
        let quantity = ComboCondition::new().with_product_quantity_min("butter", 5)?;

        assert!(!price.holds(&basket, now));
        assert!(quantity.holds(&basket, now));

        Ok(())
    }

    #[test]
    fn quantity_thresholds() -> TestResult {
        let basket = basket()?;
        let now = instant("2025-06-01T12:00:00Z")?;

        assert!(ComboCondition::new().with_basket_size_min(6).holds(&basket, now));
        assert!(!ComboCondition::new().with_basket_size_min(7).holds(&basket, now));
        assert!(
            ComboCondition::new()
                .with_product_quantity_min("bread", 3)?
                .holds(&basket, now)
        );
        assert!(
            !ComboCondition::new()
                .with_category_quantity_min("dairy", 4)?
                .holds(&basket, now)
        );

        Ok(())
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let result = ComboCondition::new().with_product_price_min("milk", usd(-1));

        assert_eq!(
            result,
            Err(ValidationError::NegativeThreshold {
                subject: "milk".to_string()
            })
        );
    }

    #[test]
    fn foreign_currency_threshold_fails_validation() -> TestResult {
        let condition: Condition = ComboCondition::new()
            .with_category_price_min("dairy", Money::from_minor(100, GBP))?
            .into();

        assert!(matches!(
            condition.validate(USD),
            Err(ValidationError::CurrencyMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn scope_collects_named_subjects() -> TestResult {
        let condition: Condition = ComboCondition::new()
            .with_product_price_min("milk", usd(100))?
            .with_category_quantity_min("bakery", 2)?
            .into();
        let scope = condition.scope();

        assert!(scope.matches("milk", &Categories::default()));
        assert!(scope.matches("bread", &Categories::from_strs(&["bakery"])));
        assert!(!scope.matches("cheese", &Categories::from_strs(&["dairy"])));

        Ok(())
    }

    #[test]
    fn describes_expiry_and_thresholds() -> TestResult {
        let condition: Condition = ComboCondition::new()
            .with_end_time(instant("2026-03-05T10:00:00Z")?)
            .with_basket_size_min(3)
            .into();

        assert_eq!(
            condition.describe(),
            "until date 05-03-2026; minimum size of basket: 3"
        );

        Ok(())
    }
}
