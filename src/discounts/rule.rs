//! Discount Rules

use jiff::Timestamp;
use rusty_money::iso::Currency;

use crate::{
    basket::Basket,
    discounts::{conditions::Condition, strategies::Strategy},
    pricing::Price,
    scope::RuleScope,
    validation::ValidationError,
};

/// What an `apply` call did to the basket.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The condition did not hold, or no child was chosen.
    NotApplicable,

    /// The rule ran but did not lower the total.
    NoEffect,

    /// The total was lowered to `total`.
    Applied {
        /// New basket total.
        total: Price,
    },
}

impl Outcome {
    /// Whether the basket total went down.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// Priced copy of a basket together with what happened to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    /// Resulting basket, always a copy of the input.
    pub basket: Basket,

    /// What happened.
    pub outcome: Outcome,
}

impl Application {
    pub(crate) fn untouched(basket: &Basket, outcome: Outcome) -> Self {
        Self {
            basket: basket.clone(),
            outcome,
        }
    }

    /// Keep `candidate` only if it is strictly cheaper than `original`.
    pub(crate) fn cheapest(original: &Basket, candidate: Basket) -> Self {
        if candidate.total_minor() < original.total_minor() {
            Self {
                outcome: Outcome::Applied {
                    total: candidate.total(),
                },
                basket: candidate,
            }
        } else {
            Self::untouched(original, Outcome::NoEffect)
        }
    }
}

/// One condition paired with one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountRule {
    /// Gate.
    pub condition: Condition,

    /// Reduction.
    pub strategy: Strategy,
}

impl DiscountRule {
    /// Pair a condition with a strategy.
    pub fn new(condition: impl Into<Condition>, strategy: Strategy) -> Self {
        Self {
            condition: condition.into(),
            strategy,
        }
    }

    /// A strategy that always applies.
    pub fn unconditional(strategy: Strategy) -> Self {
        Self::new(Condition::always(), strategy)
    }

    /// Check both halves before the rule enters a store.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, currency: &'static Currency) -> Result<(), ValidationError> {
        self.strategy.validate()?;
        self.condition.validate(currency)
    }

    /// Whether the condition holds.
    pub fn holds(&self, basket: &Basket, now: Timestamp) -> bool {
        self.condition.holds(basket, now)
    }

    /// Run the strategy on a copy of `basket` if the condition holds, keeping the copy only
    /// when it lowers the total.
    pub fn apply(&self, basket: &Basket, now: Timestamp) -> Application {
        if !self.holds(basket, now) {
            return Application::untouched(basket, Outcome::NotApplicable);
        }

        let mut candidate = basket.clone();
        self.strategy.apply(&mut candidate);

        Application::cheapest(basket, candidate)
    }

    /// Products and categories mentioned by either half.
    pub fn scope(&self) -> RuleScope {
        self.condition.scope().merge(self.strategy.scope())
    }

    /// Human readable description.
    pub fn describe(&self) -> String {
        format!("{}, {}", self.strategy.describe(), self.condition.describe())
    }
}
