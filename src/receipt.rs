//! Receipt

use std::io;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{MoneyError, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    basket::Basket,
    categories::Categories,
    discounts::rule::{Application, Outcome},
    pricing::{Price, format_price, percent_points},
};

/// Errors that can occur when building or printing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// The priced basket does not line up with the original one.
    #[error("Priced basket line {index} is {found}, expected {expected}")]
    LineMismatch {
        /// Line position.
        index: usize,
        /// Product found in the priced basket.
        found: String,
        /// Product in the original basket.
        expected: String,
    },

    /// The priced basket has a different number of lines.
    #[error("Priced basket has {found} lines, expected {expected}")]
    LineCount {
        /// Lines in the priced basket.
        found: usize,
        /// Lines in the original basket.
        expected: usize,
    },

    /// IO error
    #[error("IO error")]
    IO,
}

/// One basket line before and after discounts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    /// Product name.
    pub product: String,

    /// Units bought.
    pub quantity: u32,

    /// Product categories.
    pub categories: Categories,

    /// Line total before discounts.
    pub base_total: Price,

    /// Line total after discounts.
    pub final_total: Price,
}

impl ReceiptLine {
    /// Amount taken off this line.
    ///
    /// # Errors
    ///
    /// Returns an error if the two totals have different currencies.
    pub fn savings(&self) -> Result<Price, MoneyError> {
        self.base_total.sub(self.final_total)
    }
}

/// Checkout summary for one store basket.
#[derive(Debug, Clone)]
pub struct Receipt {
    lines: Vec<ReceiptLine>,

    /// Total cost before discounts
    subtotal: Price,

    /// Total cost after discounts
    total: Price,

    outcome: Outcome,

    /// Whether the store policies accept the basket
    accepted: bool,

    currency: &'static Currency,
}

impl Receipt {
    /// Pair each original line with its priced counterpart.
    ///
    /// # Errors
    ///
    /// Returns an error if the priced basket does not have the same products in the same order.
    pub fn new(
        original: &Basket,
        application: &Application,
        accepted: bool,
    ) -> Result<Self, ReceiptError> {
        let priced = &application.basket;

        if priced.len() != original.len() {
            return Err(ReceiptError::LineCount {
                found: priced.len(),
                expected: original.len(),
            });
        }

        let lines = original
            .lines()
            .iter()
            .zip(priced.lines())
            .enumerate()
            .map(|(index, (before, after))| {
                if before.product() != after.product() {
                    return Err(ReceiptError::LineMismatch {
                        index,
                        found: after.product().to_string(),
                        expected: before.product().to_string(),
                    });
                }

                Ok(ReceiptLine {
                    product: before.product().to_string(),
                    quantity: before.quantity(),
                    categories: before.categories().clone(),
                    base_total: *before.total(),
                    final_total: *after.total(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            lines,
            subtotal: original.total(),
            total: priced.total(),
            outcome: application.outcome.clone(),
            accepted,
            currency: original.currency(),
        })
    }

    /// Lines in basket order.
    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }

    /// Total cost before discounts
    pub fn subtotal(&self) -> Price {
        self.subtotal
    }

    /// Total cost after discounts
    pub fn total(&self) -> Price {
        self.total
    }

    /// What the discount tree did.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Whether the store policies accept the basket.
    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// Currency of every amount on the receipt.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Amount saved by discounts.
    ///
    /// # Errors
    ///
    /// Returns an error if subtotal and total currencies differ.
    pub fn savings(&self) -> Result<Price, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// Savings as a fraction of the subtotal.
    ///
    /// # Errors
    ///
    /// Returns an error if subtotal and total currencies differ.
    pub fn savings_percent(&self) -> Result<Percentage, MoneyError> {
        let savings = self.savings()?;
        let subtotal_minor = self.subtotal.to_minor_units();

        if subtotal_minor == 0 {
            return Ok(Percentage::from(0.0));
        }

        Ok(Percentage::from(
            Decimal::from(savings.to_minor_units()) / Decimal::from(subtotal_minor),
        ))
    }

    /// Print the receipt as a table followed by a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Categories", "Qty", "Base Price", "Discounted Price", "Savings"]);

        for line in &self.lines {
            builder.push_record(line_cells(line)?);
        }

        write_table(&mut out, builder)?;
        self.write_summary(&mut out)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let savings = self.savings()?;
        let savings_points = percent_points(&self.savings_percent()?);

        let rows = [
            ("Subtotal:", format_price(&self.subtotal)),
            ("Total:", format_price(&self.total)),
            ("Savings:", format!("({savings_points}%) {}", format_price(&savings))),
            ("Discounts:", describe_outcome(&self.outcome)),
            ("Policies:", if self.accepted { "accepted" } else { "rejected" }.to_string()),
        ];

        let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        for (label, value) in rows {
            writeln!(out, " {label:>label_width$}  {value}").map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}

fn line_cells(line: &ReceiptLine) -> Result<[String; 6], ReceiptError> {
    let categories = line.categories.iter().collect::<Vec<_>>().join(", ");

    // Unchanged lines leave both discount columns blank.
    let (final_price, savings) = if line.final_total == line.base_total {
        (String::new(), String::new())
    } else {
        (
            format_price(&line.final_total),
            format!("-{}", format_price(&line.savings()?)),
        )
    };

    Ok([
        line.product.clone(),
        categories,
        line.quantity.to_string(),
        format_price(&line.base_total),
        final_price,
        savings,
    ])
}

fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::NotApplicable => "not applicable".to_string(),
        Outcome::NoEffect => "no effect".to_string(),
        Outcome::Applied { total } => format!("applied, total {}", format_price(total)),
    }
}

fn write_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..6), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}
