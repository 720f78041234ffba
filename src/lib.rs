//! Souk
//!
//! Souk is the discount and shopping-policy rule engine of a campus marketplace: composable,
//! persisted rule trees that price a store basket and decide whether it may be bought.

pub mod basket;
pub mod catalog;
pub mod categories;
pub mod discounts;
pub mod fixtures;
pub mod ids;
pub mod index;
pub mod persistence;
pub mod policies;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod scope;
pub mod store;
pub mod tree;
pub mod utils;
pub mod validation;
