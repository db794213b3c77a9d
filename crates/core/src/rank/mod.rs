use crate::domain::{FundamentalSnapshot, MembershipRow};
use crate::scoring::{ScoreResult, Verdict};
use crate::service::error::ScanError;
use serde::Serialize;
use std::time::Duration;

/// Where the ranking loop gets snapshots from. `None` means the symbol has no usable data.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, symbol: &str) -> Option<FundamentalSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankOptions {
    /// Only the first `limit` rows (in list order) are fetched. `None` scans every row.
    pub limit: Option<usize>,
    /// Number of rows kept after sorting. Values below 1 behave as 1.
    pub top: usize,
    /// Politeness delay between consecutive fetches.
    pub delay: Duration,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            limit: Some(crate::config::DEFAULT_SCAN_LIMIT),
            top: crate::config::DEFAULT_SCAN_TOP,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub score: u32,
    pub verdict: Verdict,
    pub margin_pct: Option<f64>,
    pub price: f64,
    pub return_on_equity: f64,
    pub price_to_earnings: f64,
    pub price_to_book: f64,
}

/// Fetches, scores and ranks `rows`, best score first.
///
/// Rows run sequentially in list order. A row whose fetch fails, or whose snapshot has no
/// positive price, is dropped without a placeholder. Sorting is stable, so equal scores keep
/// their fetch order. An empty result is reported as [`ScanError::NoData`].
pub async fn rank_rows<S, F>(
    rows: &[MembershipRow],
    source: &S,
    score_fn: F,
    opts: &RankOptions,
) -> Result<Vec<ScoredRow>, ScanError>
where
    S: SnapshotSource + ?Sized,
    F: Fn(&FundamentalSnapshot) -> ScoreResult,
{
    let targets = match opts.limit {
        Some(limit) => &rows[..rows.len().min(limit)],
        None => rows,
    };
    let total = targets.len();

    let mut scored = Vec::with_capacity(total);
    let mut skipped: usize = 0;

    for (idx, row) in targets.iter().enumerate() {
        if idx != 0 && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }

        let snapshot = match source.snapshot(&row.symbol).await {
            Some(s) if s.is_valid() => s,
            Some(s) => {
                skipped += 1;
                tracing::warn!(ticker = %row.symbol, price = s.price, "invalid snapshot; skipping row");
                continue;
            }
            None => {
                skipped += 1;
                tracing::debug!(ticker = %row.symbol, "no data; skipping row");
                continue;
            }
        };

        let result = score_fn(&snapshot);
        scored.push(ScoredRow {
            symbol: row.symbol.clone(),
            name: snapshot.display_name,
            sector: row.sector.clone(),
            score: result.score,
            verdict: result.verdict,
            margin_pct: result.margin_pct,
            price: snapshot.price,
            return_on_equity: snapshot.return_on_equity,
            price_to_earnings: snapshot.price_to_earnings,
            price_to_book: snapshot.price_to_book,
        });
    }

    tracing::info!(total, scored = scored.len(), skipped, "ranking pass finished");

    if scored.is_empty() {
        return Err(ScanError::NoData);
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(opts.top.max(1));
    Ok(scored)
}
