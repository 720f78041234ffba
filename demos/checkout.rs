//! Checkout Example
//!
//! Prices a fixture basket with the store's discounts and checks it against the store's policies.
//!
//! Use `-f` to load a fixture set by name
//! Use `-d` to check out on a given date (YYYY-MM-DD)
//! Use `-r` to print the rule trees first
//! Set `RUST_LOG=souk=debug` to follow rule evaluation

use std::io;

use anyhow::Result;
use clap::Parser;
use souk::{fixtures::Fixture, receipt::Receipt, store::RuleSummary, utils::CheckoutArgs};
use tracing_subscriber::EnvFilter;

/// Checkout Example
#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .compact()
        .init();

    let args = CheckoutArgs::parse();
    let now = args.checkout_time()?;

    let mut fixture = Fixture::from_set(&args.fixture)?;
    let basket = fixture.basket()?.clone();
    let store = fixture.store()?;

    if args.rules {
        println!("Discounts:");
        print_rules(&store.fetch_all_discounts());

        println!("\nPolicies:");
        print_rules(&store.fetch_policies());
    }

    let application = store.apply_discount_on_basket_at(&basket, &now);
    let accepted = store.apply_policies_on_basket_at(&basket, &now);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Receipt::new(&basket, &application, accepted)?.write_to(&mut handle)?;

    println!("Checked out at {}", now.strftime("%A %d-%m-%Y %H:%M %Z"));

    Ok(())
}

#[expect(clippy::print_stdout, reason = "Example code")]
fn print_rules(rules: &[RuleSummary]) {
    for rule in rules {
        let indent = "  ".repeat(rule.depth + 1);

        println!("{indent}{}: {}", rule.id, rule.description);
    }
}
