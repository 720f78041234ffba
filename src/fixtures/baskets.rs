//! Basket Fixtures

use serde::Deserialize;

/// Basket from YAML; prices and categories come from the loaded products
#[derive(Debug, Deserialize)]
pub struct BasketFixture {
    /// Lines in basket order
    pub lines: Vec<LineFixture>,
}

/// One basket line
#[derive(Debug, Deserialize)]
pub struct LineFixture {
    /// Product name
    pub product: String,

    /// Units bought
    pub quantity: u32,
}
