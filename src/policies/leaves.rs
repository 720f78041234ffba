//! Policy Leaves

use jiff::civil::Weekday;

use crate::{
    basket::Basket,
    scope::RuleScope,
    validation::{ValidationError, require_name},
};

/// Inclusive quantity bounds with at least one side set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityRange {
    min: Option<u64>,
    max: Option<u64>,
}

impl QuantityRange {
    /// Create a range.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when both bounds are missing or `min > max`.
    pub fn new(min: Option<u64>, max: Option<u64>) -> Result<Self, ValidationError> {
        match (min, max) {
            (None, None) => Err(ValidationError::UnboundedRange),
            (Some(min), Some(max)) if min > max => Err(ValidationError::InvertedRange { min, max }),
            _ => Ok(Self { min, max }),
        }
    }

    /// Lower bound.
    pub fn min(&self) -> Option<u64> {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// Whether `quantity` is within the bounds.
    pub fn contains(&self, quantity: u64) -> bool {
        self.min.is_none_or(|min| quantity >= min) && self.max.is_none_or(|max| quantity <= max)
    }

    fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("at least {min} and at most {max}"),
            (Some(min), None) => format!("at least {min}"),
            (None, Some(max)) => format!("at most {max}"),
            (None, None) => "unbounded".to_string(),
        }
    }
}

/// Boolean eligibility rule over a basket.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyLeaf {
    /// Total units in the basket.
    BasketQuantity {
        /// Allowed units.
        range: QuantityRange,
    },

    /// Units of one product; passes when the product is absent.
    ProductQuantity {
        /// Limited product.
        product: String,
        /// Allowed units.
        range: QuantityRange,
    },

    /// Units in one category; passes when the category is absent.
    CategoryQuantity {
        /// Limited category.
        category: String,
        /// Allowed units.
        range: QuantityRange,
    },

    /// No shopping on the given day.
    ForbiddenWeekday {
        /// Day on which every basket is rejected.
        day: Weekday,
    },
}

impl PolicyLeaf {
    /// Limit total basket units.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an invalid range.
    pub fn basket_quantity(min: Option<u64>, max: Option<u64>) -> Result<Self, ValidationError> {
        Ok(PolicyLeaf::BasketQuantity {
            range: QuantityRange::new(min, max)?,
        })
    }

    /// Limit units of one product.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or an invalid range.
    pub fn product_quantity(
        product: impl Into<String>,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Result<Self, ValidationError> {
        let product = product.into();
        require_name("product", &product)?;

        Ok(PolicyLeaf::ProductQuantity {
            product,
            range: QuantityRange::new(min, max)?,
        })
    }

    /// Limit units of one category.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or an invalid range.
    pub fn category_quantity(
        category: impl Into<String>,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Result<Self, ValidationError> {
        let category = category.into();
        require_name("category", &category)?;

        Ok(PolicyLeaf::CategoryQuantity {
            category,
            range: QuantityRange::new(min, max)?,
        })
    }

    /// Reject baskets on `day`.
    pub fn forbidden_weekday(day: Weekday) -> Self {
        PolicyLeaf::ForbiddenWeekday { day }
    }

    /// Re-check names of a leaf that may have been built directly.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTarget`] for a blank name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PolicyLeaf::ProductQuantity { product, .. } => require_name("product", product),
            PolicyLeaf::CategoryQuantity { category, .. } => require_name("category", category),
            PolicyLeaf::BasketQuantity { .. } | PolicyLeaf::ForbiddenWeekday { .. } => Ok(()),
        }
    }

    /// Evaluate against `basket` on `today`.
    pub fn holds(&self, basket: &Basket, today: Weekday) -> bool {
        match self {
            PolicyLeaf::BasketQuantity { range } => range.contains(basket.total_quantity()),
            PolicyLeaf::ProductQuantity { product, range } => basket
                .line(product)
                .is_none_or(|line| range.contains(u64::from(line.quantity()))),
            PolicyLeaf::CategoryQuantity { category, range } => {
                let quantity = basket.category_quantity(category);
                quantity == 0 || range.contains(quantity)
            }
            PolicyLeaf::ForbiddenWeekday { day } => today != *day,
        }
    }

    /// Products and categories the leaf constrains.
    pub fn scope(&self) -> RuleScope {
        match self {
            PolicyLeaf::BasketQuantity { .. } => RuleScope::everywhere(),
            PolicyLeaf::ProductQuantity { product, .. } => RuleScope::product(product),
            PolicyLeaf::CategoryQuantity { category, .. } => RuleScope::category(category),
            PolicyLeaf::ForbiddenWeekday { .. } => RuleScope::default(),
        }
    }

    /// Human readable description.
    pub fn describe(&self) -> String {
        match self {
            PolicyLeaf::BasketQuantity { range } => {
                format!("basket quantity is {}", range.describe())
            }
            PolicyLeaf::ProductQuantity { product, range } => {
                format!("The product {product} quantity is {}", range.describe())
            }
            PolicyLeaf::CategoryQuantity { category, range } => {
                format!("The Category {category} quantity is {}", range.describe())
            }
            PolicyLeaf::ForbiddenWeekday { day } => format!("Shopping is not allowed at {day:?}"),
        }
    }
}

/// Parse an English weekday name, case-insensitively.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownWeekday`] for anything else.
pub fn parse_weekday(name: &str) -> Result<Weekday, ValidationError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "monday" => Ok(Weekday::Monday),
        "tuesday" => Ok(Weekday::Tuesday),
        "wednesday" => Ok(Weekday::Wednesday),
        "thursday" => Ok(Weekday::Thursday),
        "friday" => Ok(Weekday::Friday),
        "saturday" => Ok(Weekday::Saturday),
        "sunday" => Ok(Weekday::Sunday),
        _ => Err(ValidationError::UnknownWeekday(name.to_string())),
    }
}
