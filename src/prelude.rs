//! Souk prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    basket::{Basket, BasketError, BasketLine},
    catalog::{Catalog, CatalogProduct},
    categories::Categories,
    discounts::{
        CompositeDiscount, DiscountNode, DiscountTree,
        conditions::{ComboCondition, Condition, SimpleCondition},
        rule::{Application, DiscountRule, Outcome},
        strategies::{FreePerX, Strategy},
    },
    fixtures::{Fixture, FixtureError},
    ids::{RuleId, RuleKind},
    index::StoreRuleIndex,
    persistence::{
        InMemoryRuleRepository, RepositoryError, RuleRecord, RuleRepository, StoredRule,
    },
    policies::{
        CompositePolicy, PolicyNode, PolicyTree,
        leaves::{PolicyLeaf, QuantityRange},
    },
    pricing::Price,
    receipt::{Receipt, ReceiptError},
    scope::RuleScope,
    store::{CatalogEntry, RuleSummary, StoreError, StoreRules},
    tree::{CompositeOp, RuleTree, TreeError},
    validation::ValidationError,
};
