use serde::{Deserialize, Serialize};

/// Provider-neutral quote fields, as reported by the source. Fractions are not yet scaled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    pub current_price: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    /// Fraction, e.g. `0.25` for 25%.
    pub return_on_equity: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    /// Fraction.
    pub dividend_yield: Option<f64>,
    pub short_name: Option<String>,
    pub industry: Option<String>,
}
