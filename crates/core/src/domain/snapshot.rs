use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One constituent of the index membership list. List order is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRow {
    pub symbol: String,
    pub name: String,
    pub sector: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Normalized fundamentals for one ticker. Built through
/// [`RawQuote::into_snapshot`](crate::ingest::types::RawQuote::into_snapshot), never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub symbol: String,
    pub display_name: String,
    pub industry: Option<String>,
    pub price: f64,
    /// Analyst mean target. `0.0` means unavailable.
    pub target_price: f64,
    /// Percent, e.g. `23.5` for 23.5%.
    pub return_on_equity: f64,
    pub price_to_earnings: f64,
    pub price_to_book: f64,
    /// Percent.
    pub dividend_yield_pct: f64,
    pub price_history: Vec<PricePoint>,
    pub fetched_at: DateTime<Utc>,
}

impl FundamentalSnapshot {
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && !self.symbol.is_empty()
    }
}
