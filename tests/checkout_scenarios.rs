//! Checkout scenarios: pricing store baskets through the discount tree and
//! checking them against the policy tree.

use decimal_percentage::Percentage;
use jiff::{Zoned, civil::date, tz::TimeZone};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::USD};
use testresult::TestResult;

use souk::prelude::*;

fn percent(points: i64) -> Percentage {
    Percentage::from(Decimal::new(points, 2))
}

fn usd(minor: i64) -> Price {
    Money::from_minor(minor, USD)
}

fn friday_noon() -> TestResult<Zoned> {
    Ok(date(2026, 10, 16).at(12, 0, 0, 0).to_zoned(TimeZone::UTC)?)
}

fn catalog() -> Catalog {
    Catalog::with_products([
        CatalogProduct {
            name: "pen".to_string(),
            categories: Categories::from_strs(&["stationery"]),
            price: usd(1000),
        },
        CatalogProduct {
            name: "pad".to_string(),
            categories: Categories::from_strs(&["stationery"]),
            price: usd(1000),
        },
        CatalogProduct {
            name: "milk".to_string(),
            categories: Categories::from_strs(&["dairy"]),
            price: usd(1000),
        },
        CatalogProduct {
            name: "mug".to_string(),
            categories: Categories::from_strs(&["kitchen"]),
            price: usd(5000),
        },
    ])
}

fn store(repo: &mut InMemoryRuleRepository) -> TestResult<StoreRules> {
    Ok(StoreRules::new(repo, USD, catalog())?)
}

fn line(product: &str, quantity: u32, unit_minor: i64, category: &str) -> TestResult<BasketLine> {
    Ok(BasketLine::new(
        product,
        quantity,
        usd(unit_minor),
        Categories::from_strs(&[category]),
    )?)
}

#[test]
fn whole_basket_percentage_discount() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    store.add_discount_on_entire_store(&mut repo, percent(10), Condition::always())?;

    let basket = Basket::with_lines([line("mug", 2, 5000, "kitchen")?], USD)?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.basket.total(), usd(9000));
    assert_eq!(application.outcome, Outcome::Applied { total: usd(9000) });
    assert_eq!(basket.total(), usd(10_000));

    Ok(())
}

#[test]
fn free_per_x_applies_once_per_complete_round() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    store.add_free_per_x_product_discount(&mut repo, "pen", 1, 3, true, Condition::always())?;

    let basket = Basket::with_lines([line("pen", 4, 1000, "stationery")?], USD)?;
    let priced = store.apply_discount_on_basket_at(&basket, &friday_noon()?).basket;

    assert_eq!(priced.line("pen").map(BasketLine::total), Some(&usd(3000)));

    Ok(())
}

#[test]
fn failed_category_threshold_leaves_basket_unchanged() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let condition = ComboCondition::new().with_category_price_min("dairy", usd(5000))?;
    store.add_simple_category_discount(&mut repo, "dairy", percent(50), condition.into())?;

    let basket = Basket::with_lines([line("milk", 4, 1000, "dairy")?], USD)?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.basket, basket);
    assert_eq!(application.outcome, Outcome::NotApplicable);

    Ok(())
}

#[test]
fn empty_and_policy_accepts_any_basket() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let store = store(&mut repo)?;

    let basket = Basket::with_lines([line("mug", 99, 5000, "kitchen")?], USD)?;

    assert!(store.apply_policies_on_basket_at(&basket, &friday_noon()?));
    assert!(store.apply_policies_on_basket_at(&Basket::new(USD), &friday_noon()?));

    Ok(())
}

#[test]
fn removing_a_combination_retires_its_members() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let pads = store.add_simple_product_discount(&mut repo, "pad", percent(20), Condition::always())?;

    let both = store.combine_discounts(&mut repo, &[pens, pads], CompositeOp::And, None)?;

    assert_eq!(store.discounts().children_of(both), &[pens, pads]);

    let description = store.remove_discount(&mut repo, both)?;

    assert!(description.starts_with("ALL of the following discount conditions must be answered:"));
    assert!(store.discounts().children_of(store.discounts().root()).is_empty());

    for id in [pens, pads, both] {
        assert!(!store.discounts().contains(id));
        assert!(!store.index().mentions(RuleKind::Discount, id));
    }

    let records = repo.get_by_ids(RuleKind::Discount, &[pens, pads])?;

    assert_eq!(records.len(), 2);
    assert!(records.values().all(RuleRecord::is_deleted));

    Ok(())
}

#[test]
fn xor_tie_picks_first_inserted_child() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let pads = store.add_simple_product_discount(&mut repo, "pad", percent(10), Condition::always())?;

    store.combine_discounts(&mut repo, &[pens, pads], CompositeOp::Xor, None)?;

    let basket = Basket::with_lines(
        [line("pen", 1, 1000, "stationery")?, line("pad", 1, 1000, "stationery")?],
        USD,
    )?;
    let priced = store.apply_discount_on_basket_at(&basket, &friday_noon()?).basket;

    assert_eq!(priced.line("pen").map(BasketLine::total), Some(&usd(900)));
    assert_eq!(priced.line("pad").map(BasketLine::total), Some(&usd(1000)));

    Ok(())
}

#[test]
fn xor_picks_cheapest_child() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let pads = store.add_simple_product_discount(&mut repo, "pad", percent(30), Condition::always())?;

    store.combine_discounts(&mut repo, &[pens, pads], CompositeOp::Xor, None)?;

    let basket = Basket::with_lines(
        [line("pen", 1, 1000, "stationery")?, line("pad", 1, 1000, "stationery")?],
        USD,
    )?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.basket.total(), usd(1700));
    assert_eq!(application.outcome, Outcome::Applied { total: usd(1700) });

    Ok(())
}

#[test]
fn and_with_a_failing_child_changes_nothing() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let everything =
        store.add_discount_on_entire_store(&mut repo, percent(10), Condition::always())?;
    let big_baskets = store.add_simple_product_discount(
        &mut repo,
        "pen",
        percent(20),
        ComboCondition::new().with_basket_size_min(100).into(),
    )?;

    store.combine_discounts(&mut repo, &[everything, big_baskets], CompositeOp::And, None)?;

    let basket = Basket::with_lines([line("pen", 3, 1000, "stationery")?], USD)?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.basket, basket);
    assert!(!application.outcome.is_applied());

    Ok(())
}

#[test]
fn independent_discounts_stack_under_the_root() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    store.add_simple_product_discount(&mut repo, "pen", percent(50), Condition::always())?;
    store.add_discount_on_entire_store(&mut repo, percent(10), Condition::always())?;

    let basket = Basket::with_lines(
        [line("pen", 2, 1000, "stationery")?, line("mug", 1, 5000, "kitchen")?],
        USD,
    )?;
    let priced = store.apply_discount_on_basket_at(&basket, &friday_noon()?).basket;

    // pen: 2000 -> 1000 -> 900, mug: 5000 -> 4500
    assert_eq!(priced.total(), usd(5400));

    Ok(())
}

#[test]
fn expired_discount_is_not_applicable() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let ended = date(2026, 10, 1).at(0, 0, 0, 0).to_zoned(TimeZone::UTC)?.timestamp();
    store.add_discount_on_entire_store(&mut repo, percent(10), Condition::until(ended))?;

    let basket = Basket::with_lines([line("mug", 1, 5000, "kitchen")?], USD)?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.outcome, Outcome::NotApplicable);
    assert_eq!(application.basket.total(), usd(5000));

    Ok(())
}

#[test]
fn wrapper_applies_after_resolved_children() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    let pens = store.add_simple_product_discount(&mut repo, "pen", percent(10), Condition::always())?;
    let pads = store.add_simple_product_discount(&mut repo, "pad", percent(20), Condition::always())?;

    let wrapper = DiscountRule::unconditional(Strategy::basket_percent(percent(50))?);
    store.combine_discounts(&mut repo, &[pens, pads], CompositeOp::Xor, Some(wrapper))?;

    let basket = Basket::with_lines(
        [line("pen", 1, 1000, "stationery")?, line("pad", 1, 1000, "stationery")?],
        USD,
    )?;
    let priced = store.apply_discount_on_basket_at(&basket, &friday_noon()?).basket;

    // xor picks pad (1800), then half off everything
    assert_eq!(priced.total(), usd(900));

    Ok(())
}

#[test]
fn basket_in_another_currency_is_not_priced() -> TestResult {
    let mut repo = InMemoryRuleRepository::new();
    let mut store = store(&mut repo)?;

    store.add_discount_on_entire_store(&mut repo, percent(10), Condition::always())?;

    let basket = Basket::with_lines(
        [BasketLine::new(
            "mug",
            1,
            Money::from_minor(5000, rusty_money::iso::GBP),
            Categories::from_strs(&["kitchen"]),
        )?],
        rusty_money::iso::GBP,
    )?;
    let application = store.apply_discount_on_basket_at(&basket, &friday_noon()?);

    assert_eq!(application.outcome, Outcome::NotApplicable);
    assert_eq!(application.basket, basket);

    Ok(())
}

#[test]
fn bundled_campus_fixture_checks_out() -> TestResult {
    let mut fixture = Fixture::from_set("campus")?;
    let basket = fixture.basket()?.clone();
    let store = fixture.store()?;
    let now = friday_noon()?;

    let application = store.apply_discount_on_basket_at(&basket, &now);
    let receipt = Receipt::new(&basket, &application, store.apply_policies_on_basket_at(&basket, &now))?;

    assert!(receipt.total().to_minor_units() < receipt.subtotal().to_minor_units());
    assert!(receipt.accepted());

    Ok(())
}
