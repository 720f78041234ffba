//! Rule Identifiers

use std::fmt;

/// Stable identifier of a discount or policy node.
///
/// Ids are handed out by the persistence collaborator and are never reused, even after the
/// node they named has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u64);

impl RuleId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RuleId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The two rule families a store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Price-reducing rules.
    Discount,

    /// Basket eligibility rules.
    Policy,
}

impl RuleKind {
    /// Lowercase name used in logs and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleKind::Discount => "discount",
            RuleKind::Policy => "policy",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_hash() {
        assert_eq!(RuleId::new(42).to_string(), "#42");
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![RuleId::new(10), RuleId::new(2), RuleId::from(7)];

        ids.sort();

        assert_eq!(ids, [RuleId::new(2), RuleId::new(7), RuleId::new(10)]);
    }

    #[test]
    fn kind_names() {
        assert_eq!(RuleKind::Discount.to_string(), "discount");
        assert_eq!(RuleKind::Policy.as_str(), "policy");
    }
}
