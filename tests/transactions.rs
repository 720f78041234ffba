//! Structural edits roll back as a whole when the repository fails.

use decimal_percentage::Percentage;
use mockall::predicate::eq;
use rust_decimal::Decimal;
use rusty_money::iso::USD;
use testresult::TestResult;

use souk::{persistence::MockRuleRepository, prelude::*};

fn percent(points: i64) -> Percentage {
    Percentage::from(Decimal::new(points, 2))
}

fn storage(message: &str) -> RepositoryError {
    RepositoryError::Storage(message.to_string())
}

/// Store with one pen discount, built on the in-memory repository.
fn seeded() -> TestResult<(StoreRules, RuleId)> {
    let mut repo = InMemoryRuleRepository::new();
    let catalog = Catalog::with_products([CatalogProduct {
        name: "pen".to_string(),
        categories: Categories::from_strs(&["stationery"]),
        price: rusty_money::Money::from_minor(200, USD),
    }]);

    let mut store = StoreRules::new(&mut repo, USD, catalog)?;
    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;

    Ok((store, pens))
}

#[test]
fn failed_id_allocation_rolls_back() -> TestResult {
    let (mut store, pens) = seeded()?;
    let before = store.clone();

    let mut repo = MockRuleRepository::new();
    repo.expect_begin_nested().times(1).returning(|| Ok(()));
    repo.expect_next_id()
        .with(eq(RuleKind::Discount))
        .times(1)
        .returning(|_| Err(storage("sequence unavailable")));
    repo.expect_rollback().times(1).returning(|| Ok(()));
    repo.expect_flush().never();
    repo.expect_commit().never();

    let result = store.add_discount_on_entire_store(&mut repo, percent(5), Condition::always());

    assert_eq!(
        result,
        Err(StoreError::Transaction {
            operation: "add discount",
            source: storage("sequence unavailable"),
        })
    );
    assert_eq!(store.index(), before.index());
    assert_eq!(store.fetch_all_discounts(), before.fetch_all_discounts());
    assert!(store.discounts().contains(pens));

    Ok(())
}

#[test]
fn failed_save_restores_tree_and_index() -> TestResult {
    let (mut store, pens) = seeded()?;
    let before = store.clone();
    let fresh = RuleId::new(50);

    let mut repo = MockRuleRepository::new();
    repo.expect_begin_nested().times(1).returning(|| Ok(()));
    repo.expect_next_id().times(1).returning(move |_| Ok(fresh));
    repo.expect_save().returning(|_| Err(storage("disk full")));
    repo.expect_rollback().times(1).returning(|| Ok(()));
    repo.expect_commit().never();

    let result = store.add_discount_on_entire_store(&mut repo, percent(5), Condition::always());

    assert!(matches!(result, Err(StoreError::Transaction { .. })));
    assert!(!store.discounts().contains(fresh));
    assert!(!store.index().mentions(RuleKind::Discount, fresh));
    assert_eq!(store.index().ids_for(RuleKind::Discount, "pen"), vec![pens]);
    assert_eq!(store.index(), before.index());

    Ok(())
}

#[test]
fn failed_delete_keeps_removed_rule() -> TestResult {
    let (mut store, pens) = seeded()?;

    let mut repo = MockRuleRepository::new();
    repo.expect_begin_nested().times(1).returning(|| Ok(()));
    repo.expect_delete()
        .with(eq(RuleKind::Discount), eq(pens))
        .times(1)
        .returning(|_, _| Err(storage("locked")));
    repo.expect_rollback().times(1).returning(|| Ok(()));
    repo.expect_commit().never();

    let result = store.remove_discount(&mut repo, pens);

    assert!(matches!(
        result,
        Err(StoreError::Transaction {
            operation: "remove discount",
            ..
        })
    ));
    assert_eq!(store.discounts().parent_of(pens), Some(store.discounts().root()));
    assert!(store.index().mentions(RuleKind::Discount, pens));

    Ok(())
}

#[test]
fn begin_failure_skips_the_edit() -> TestResult {
    let (mut store, _) = seeded()?;

    let mut repo = MockRuleRepository::new();
    repo.expect_begin_nested()
        .times(1)
        .returning(|| Err(storage("connection lost")));
    repo.expect_next_id().never();
    repo.expect_rollback().never();

    let result = store.add_policy(&mut repo, PolicyLeaf::basket_quantity(None, Some(3))?);

    assert!(matches!(
        result,
        Err(StoreError::Transaction {
            operation: "add policy",
            ..
        })
    ));
    assert!(store.fetch_policies().is_empty());

    Ok(())
}

#[test]
fn successful_edit_commits_once() -> TestResult {
    let (mut store, pens) = seeded()?;
    let fresh = RuleId::new(7);

    let mut repo = MockRuleRepository::new();
    repo.expect_begin_nested().times(1).returning(|| Ok(()));
    repo.expect_next_id().times(1).returning(move |_| Ok(fresh));
    repo.expect_delete().times(1).returning(|_, _| Ok(()));
    repo.expect_save().times(2).returning(|_| Ok(()));
    repo.expect_flush().times(1).returning(|| Ok(()));
    repo.expect_commit().times(1).returning(|| Ok(()));
    repo.expect_rollback().never();

    let new_id = store.edit_discount(
        &mut repo,
        pens,
        DiscountRule::unconditional(Strategy::product_percent("pen", percent(20))?),
    )?;

    assert_eq!(new_id, fresh);
    assert!(!store.discounts().contains(pens));

    Ok(())
}

#[test]
fn combine_with_missing_id_detaches_nothing() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = StoreRules::new(&mut repo, USD, Catalog::default())?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let pads = store.add_simple_product_discount(&mut repo, "pad", percent(10), Condition::always())?;
    let missing = RuleId::new(404);

    let result = store.combine_discounts(&mut repo, &[pens, missing, pads], CompositeOp::Or, None);

    assert_eq!(
        result,
        Err(StoreError::NotFound {
            kind: RuleKind::Discount,
            id: missing,
        })
    );

    let root = store.discounts().root();

    assert_eq!(store.discounts().children_of(root), &[pens, pads]);
    assert_eq!(repo.depth(), 0);
    assert_eq!(repo.live(RuleKind::Discount).len(), 3);

    Ok(())
}

#[test]
fn combine_rejects_the_root() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = StoreRules::new(&mut repo, USD, Catalog::default())?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let root = store.discounts().root();

    let result = store.combine_discounts(&mut repo, &[pens, root], CompositeOp::And, None);

    assert_eq!(
        result,
        Err(StoreError::RootRule {
            kind: RuleKind::Discount,
            id: root,
        })
    );
    assert_eq!(store.discounts().parent_of(pens), Some(root));

    Ok(())
}

#[test]
fn ids_are_not_reused() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = StoreRules::new(&mut repo, USD, Catalog::default())?;

    let first = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;

    let wrapper = DiscountRule::new(
        ComboCondition::new().with_basket_size_min(1),
        Strategy::basket_percent(percent(5))?,
    );
    let combined = store.combine_discounts(&mut repo, &[first], CompositeOp::Or, Some(wrapper))?;
    let removed = store.remove_discount(&mut repo, combined)?;
    let next = store.add_discount_on_entire_store(&mut repo, percent(5), Condition::always())?;

    assert!(removed.starts_with("Any one of the following discounts:"));
    assert!(removed.ends_with("then: get discount 5% on entire baskets, with no end date; minimum size of basket: 1"));
    assert!(combined > first);
    assert!(next > combined);
    assert_eq!(repo.live(RuleKind::Discount).len(), 2);

    Ok(())
}
