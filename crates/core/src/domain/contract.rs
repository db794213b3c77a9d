use crate::domain::snapshot::{FundamentalSnapshot, PricePoint};
use crate::ingest::types::RawQuote;
use anyhow::ensure;
use chrono::Utc;

impl RawQuote {
    /// Validates a provider quote and normalizes it into a snapshot.
    ///
    /// Fails when the quote carries no positive market price; such a quote must never be scored.
    /// Ratio fields that are absent, zero or non-finite become `0.0`. Fractions (ROE, dividend
    /// yield) are scaled to percent, and every ratio is rounded to two decimals before scoring.
    pub fn into_snapshot(
        self,
        symbol: &str,
        price_history: Vec<PricePoint>,
    ) -> anyhow::Result<FundamentalSnapshot> {
        let symbol = symbol.trim().to_uppercase();
        ensure!(!symbol.is_empty(), "symbol must be non-empty");

        let price = self
            .current_price
            .or(self.regular_market_price)
            .filter(|p| p.is_finite());
        let Some(price) = price else {
            anyhow::bail!("no market price for {symbol}");
        };
        ensure!(price > 0.0, "non-positive market price for {symbol}: {price}");

        let display_name = self
            .short_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.clone());

        let industry = self
            .industry
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let target_price = self
            .target_mean_price
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(0.0);

        Ok(FundamentalSnapshot {
            symbol,
            display_name,
            industry,
            price,
            target_price,
            return_on_equity: percent(self.return_on_equity),
            price_to_earnings: ratio(self.trailing_pe),
            price_to_book: ratio(self.price_to_book),
            dividend_yield_pct: percent(self.dividend_yield),
            price_history,
            fetched_at: Utc::now(),
        })
    }
}

fn percent(fraction: Option<f64>) -> f64 {
    ratio(fraction.map(|f| f * 100.0))
}

fn ratio(v: Option<f64>) -> f64 {
    match v {
        Some(v) if v.is_finite() && v != 0.0 => round2(v),
        _ => 0.0,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
