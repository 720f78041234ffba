//! Utils

use clap::Parser;
use jiff::{Zoned, civil::Date, tz::TimeZone};

/// Arguments for the checkout demo
#[derive(Debug, Parser)]
pub struct CheckoutArgs {
    /// Fixture set to use for products, basket, discounts & policies
    #[clap(short, long, default_value = "campus")]
    pub fixture: String,

    /// Check out on this date (YYYY-MM-DD) instead of today
    #[clap(short, long)]
    pub date: Option<Date>,

    /// Print the discount and policy trees before the receipt
    #[clap(short, long)]
    pub rules: bool,
}

impl CheckoutArgs {
    /// Instant to evaluate rules at: midday on `date` in UTC, or now.
    ///
    /// # Errors
    ///
    /// Returns an error if the date cannot be placed on the time line.
    pub fn checkout_time(&self) -> Result<Zoned, jiff::Error> {
        match self.date {
            Some(date) => date.at(12, 0, 0, 0).to_zoned(TimeZone::UTC),
            None => Ok(Zoned::now()),
        }
    }
}
