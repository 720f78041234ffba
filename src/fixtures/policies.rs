//! Policy Fixtures

use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    policies::leaves::{PolicyLeaf, parse_weekday},
};

/// Wrapper for policies in YAML
#[derive(Debug, Deserialize)]
pub struct PoliciesFixture {
    /// Leaf policies, added in file order
    #[serde(default)]
    pub policies: Vec<PolicyFixture>,

    /// Composites built from earlier keys, in file order
    #[serde(default)]
    pub combinations: Vec<PolicyCombinationFixture>,
}

/// One leaf policy
#[derive(Debug, Deserialize)]
pub struct PolicyFixture {
    /// Key used by combinations and tests
    pub key: String,

    /// The rule itself
    pub rule: PolicyRuleFixture,
}

/// Policy rule from YAML
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyRuleFixture {
    /// Limit on total basket units
    BasketQuantity {
        /// Lower bound
        min: Option<u64>,

        /// Upper bound
        max: Option<u64>,
    },

    /// Limit on units of one product
    ProductQuantity {
        /// Product name
        product: String,

        /// Lower bound
        min: Option<u64>,

        /// Upper bound
        max: Option<u64>,
    },

    /// Limit on units in one category
    CategoryQuantity {
        /// Category name
        category: String,

        /// Lower bound
        min: Option<u64>,

        /// Upper bound
        max: Option<u64>,
    },

    /// Day without shopping
    ForbiddenWeekday {
        /// English weekday name
        day: String,
    },
}

impl PolicyRuleFixture {
    /// Build the policy leaf.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid range or an unknown weekday.
    pub fn try_into_leaf(self) -> Result<PolicyLeaf, FixtureError> {
        let leaf = match self {
            PolicyRuleFixture::BasketQuantity { min, max } => PolicyLeaf::basket_quantity(min, max)?,
            PolicyRuleFixture::ProductQuantity { product, min, max } => {
                PolicyLeaf::product_quantity(product, min, max)?
            }
            PolicyRuleFixture::CategoryQuantity { category, min, max } => {
                PolicyLeaf::category_quantity(category, min, max)?
            }
            PolicyRuleFixture::ForbiddenWeekday { day } => {
                PolicyLeaf::forbidden_weekday(parse_weekday(&day)?)
            }
        };

        Ok(leaf)
    }
}

/// Composite policy built from previously loaded keys
#[derive(Debug, Deserialize)]
pub struct PolicyCombinationFixture {
    /// Key of the new composite
    pub key: String,

    /// Operator name: `xor`, `or` or `and`
    pub op: String,

    /// Keys of the policies moved under the composite
    pub members: Vec<String>,
}

#[cfg(test)]
mod tests {
    use jiff::civil::Weekday;
    use testresult::TestResult;

    use crate::validation::ValidationError;

    use super::*;

    #[test]
    fn weekday_rule_parses_day_name() -> TestResult {
        let fixture: PolicyRuleFixture =
            serde_norway::from_str("{type: forbidden_weekday, day: Saturday}")?;

        assert_eq!(
            fixture.try_into_leaf()?,
            PolicyLeaf::forbidden_weekday(Weekday::Saturday)
        );

        Ok(())
    }

    #[test]
    fn unbounded_range_is_rejected() -> TestResult {
        let fixture: PolicyRuleFixture =
            serde_norway::from_str("{type: category_quantity, category: drinks}")?;

        let result = fixture.try_into_leaf();

        assert!(matches!(
            result,
            Err(FixtureError::Validation(ValidationError::UnboundedRange))
        ));

        Ok(())
    }

    #[test]
    fn unknown_weekday_is_rejected() -> TestResult {
        let fixture: PolicyRuleFixture =
            serde_norway::from_str("{type: forbidden_weekday, day: Caturday}")?;

        assert!(matches!(
            fixture.try_into_leaf(),
            Err(FixtureError::Validation(ValidationError::UnknownWeekday(_)))
        ));

        Ok(())
    }
}
