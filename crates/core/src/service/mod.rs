pub mod error;

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::domain::{FundamentalSnapshot, MembershipRow};
use crate::ingest::provider::{with_retry, FundamentalsProvider, MembershipProvider, RetryPolicy};
use crate::ingest::sp500::WikipediaSp500;
use crate::ingest::yahoo::YahooClient;
use crate::rank::{rank_rows, RankOptions, ScoredRow, SnapshotSource};
use crate::resolve::resolve;
use crate::scoring::{score, ScoreResult};
use error::{LookupError, ScanError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct Lookup {
    pub query: String,
    pub symbol: String,
    pub snapshot: FundamentalSnapshot,
    pub result: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorSummary {
    pub name: String,
    pub count: usize,
}

/// Resolve → fetch → score, plus sector ranking, over cached provider data.
pub struct Analyzer {
    membership: Arc<dyn MembershipProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    retry: RetryPolicy,
    history_months: u32,
    membership_cache: TtlCache<(), Arc<Vec<MembershipRow>>>,
    snapshot_cache: TtlCache<String, FundamentalSnapshot>,
}

impl Analyzer {
    pub fn new(
        membership: Arc<dyn MembershipProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            membership,
            fundamentals,
            retry: settings.retry_policy(),
            history_months: settings.history_months,
            membership_cache: TtlCache::new(settings.cache_ttl()),
            snapshot_cache: TtlCache::new(settings.cache_ttl()),
        }
    }

    /// Wikipedia S&P 500 membership and Yahoo Finance fundamentals.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let membership = WikipediaSp500::new(settings.membership_url.clone())?;
        let fundamentals = YahooClient::from_env()?;
        Ok(Self::new(
            Arc::new(membership),
            Arc::new(fundamentals),
            settings,
        ))
    }

    pub async fn membership(&self) -> Result<Arc<Vec<MembershipRow>>, ScanError> {
        if let Some(rows) = self.membership_cache.get(&()) {
            return Ok(rows);
        }

        let provider = self.membership.provider_name();
        match with_retry(&self.retry, provider, || self.membership.list_membership()).await {
            Ok(rows) => {
                let rows = Arc::new(rows);
                self.membership_cache.insert((), Arc::clone(&rows));
                Ok(rows)
            }
            Err(err) => {
                tracing::warn!(provider, error = %err, "membership list unavailable");
                Err(ScanError::EmptyMembership)
            }
        }
    }

    pub async fn lookup(&self, query: &str) -> Result<Lookup, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        // Without membership, resolution degrades to aliases and the raw ticker.
        let membership = self.membership().await.ok();
        let symbol = resolve(query, membership.as_ref().map(|rows| rows.as_slice()));
        tracing::info!(query, ticker = %symbol, "resolved query");

        let snapshot = self
            .snapshot(&symbol)
            .await
            .ok_or_else(|| LookupError::DataUnavailable {
                symbol: symbol.clone(),
            })?;
        let result = score(&snapshot);

        Ok(Lookup {
            query: query.to_string(),
            symbol,
            snapshot,
            result,
        })
    }

    /// Sectors present in the membership list, sorted by name.
    pub async fn sectors(&self) -> Result<Vec<SectorSummary>, ScanError> {
        let rows = self.membership().await?;
        let mut counts = BTreeMap::<&str, usize>::new();
        for row in rows.iter() {
            *counts.entry(row.sector.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| SectorSummary {
                name: name.to_string(),
                count,
            })
            .collect())
    }

    /// Ranks `sector` (case-insensitive), or the whole list when `sector` is `None`.
    pub async fn scan(
        &self,
        sector: Option<&str>,
        opts: &RankOptions,
    ) -> Result<Vec<ScoredRow>, ScanError> {
        let membership = self.membership().await?;

        let rows: Vec<MembershipRow> = match sector.map(str::trim) {
            Some(sector) => {
                let rows: Vec<_> = membership
                    .iter()
                    .filter(|r| r.sector.eq_ignore_ascii_case(sector))
                    .cloned()
                    .collect();
                if rows.is_empty() {
                    return Err(ScanError::UnknownSector(sector.to_string()));
                }
                rows
            }
            None => membership.to_vec(),
        };

        tracing::info!(
            sector = sector.unwrap_or("*"),
            rows = rows.len(),
            limit = ?opts.limit,
            top = opts.top,
            "starting ranking pass"
        );
        rank_rows(&rows, self, score, opts).await
    }

    async fn load_snapshot(&self, symbol: &str) -> Option<FundamentalSnapshot> {
        let quote = match with_retry(&self.retry, "quote", || self.fundamentals.fetch_quote(symbol))
            .await
        {
            Ok(q) => q,
            Err(err) => {
                tracing::warn!(ticker = %symbol, error = %err, "quote fetch failed");
                return None;
            }
        };

        // A missing chart does not invalidate the fundamentals.
        let history = match with_retry(&self.retry, "history", || {
            self.fundamentals.fetch_history(symbol, self.history_months)
        })
        .await
        {
            Ok(h) => h,
            Err(err) => {
                tracing::warn!(ticker = %symbol, error = %err, "history fetch failed; continuing without it");
                Vec::new()
            }
        };

        match quote.into_snapshot(symbol, history) {
            Ok(s) => Some(s),
            Err(err) => {
                tracing::warn!(ticker = %symbol, error = %err, "discarding invalid snapshot");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for Analyzer {
    async fn snapshot(&self, symbol: &str) -> Option<FundamentalSnapshot> {
        let key = symbol.trim().to_uppercase();
        if key.is_empty() {
            return None;
        }
        if let Some(s) = self.snapshot_cache.get(key.as_str()) {
            return Some(s);
        }

        let snapshot = self.load_snapshot(&key).await?;
        self.snapshot_cache.insert(key, snapshot.clone());
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use crate::ingest::types::RawQuote;
    use crate::scoring::Verdict;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMembership {
        rows: Option<Vec<MembershipRow>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MembershipProvider for FakeMembership {
        fn provider_name(&self) -> &'static str {
            "fake_membership"
        }

        async fn list_membership(&self) -> anyhow::Result<Vec<MembershipRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rows.clone().ok_or_else(|| anyhow::anyhow!("listing down"))
        }
    }

    struct FakeFundamentals {
        quotes: HashMap<String, RawQuote>,
        history_fails: bool,
        quote_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl FundamentalsProvider for FakeFundamentals {
        fn provider_name(&self) -> &'static str {
            "fake_fundamentals"
        }

        async fn fetch_quote(&self, symbol: &str) -> anyhow::Result<RawQuote> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            self.quotes
                .get(symbol)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("unknown symbol {symbol}"))
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            _period_months: u32,
        ) -> anyhow::Result<Vec<PricePoint>> {
            if self.history_fails {
                anyhow::bail!("chart down");
            }
            Ok(vec![PricePoint {
                date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                close: 100.0,
            }])
        }
    }

    fn row(symbol: &str, name: &str, sector: &str) -> MembershipRow {
        MembershipRow {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
        }
    }

    fn quote(price: f64, roe: f64, pbr: f64, per: f64, div: f64) -> RawQuote {
        RawQuote {
            current_price: Some(price),
            return_on_equity: Some(roe / 100.0),
            price_to_book: Some(pbr),
            trailing_pe: Some(per),
            dividend_yield: Some(div / 100.0),
            ..RawQuote::default()
        }
    }

    struct Fixture {
        analyzer: Analyzer,
        membership: Arc<FakeMembership>,
        fundamentals: Arc<FakeFundamentals>,
    }

    fn fixture(rows: Option<Vec<MembershipRow>>, history_fails: bool) -> Fixture {
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote(190.0, 150.0, 45.0, 29.0, 0.5));
        quotes.insert("AVY".to_string(), quote(180.0, 31.0, 7.0, 21.0, 1.9));
        quotes.insert("A".to_string(), quote(50.0, 19.9, 1.5, 15.0, 1.5));
        quotes.insert("B".to_string(), quote(75.0, 20.0, 1.5, 15.0, 1.5));
        quotes.insert("ZERO".to_string(), quote(0.0, 30.0, 1.0, 10.0, 2.0));

        let membership = Arc::new(FakeMembership {
            rows,
            calls: AtomicUsize::new(0),
        });
        let fundamentals = Arc::new(FakeFundamentals {
            quotes,
            history_fails,
            quote_calls: AtomicUsize::new(0),
        });
        let settings = Settings {
            fetch_max_attempts: 2,
            fetch_backoff_ms: 0,
            ..Settings::default()
        };
        let analyzer = Analyzer::new(membership.clone(), fundamentals.clone(), &settings);
        Fixture {
            analyzer,
            membership,
            fundamentals,
        }
    }

    fn sp500() -> Option<Vec<MembershipRow>> {
        Some(vec![
            row("AAPL", "Apple Inc.", "Information Technology"),
            row("AVY", "Avery Dennison Corporation", "Materials"),
            row("A", "Alpha Industries", "Industrials"),
            row("B", "Beta Industries", "Industrials"),
            row("C", "Gamma Industries", "Industrials"),
        ])
    }

    #[tokio::test]
    async fn lookup_by_alias_scores_and_caches() {
        let f = fixture(sp500(), false);

        let first = f.analyzer.lookup("애플").await.unwrap();
        assert_eq!(first.symbol, "AAPL");
        // ROE 150 -> 50, PBR 45 -> 0, PER 29 -> 0, DIV 0.5 -> 0
        assert_eq!(first.result.score, 50);
        assert_eq!(first.snapshot.price_history.len(), 1);

        let second = f.analyzer.lookup("aapl").await.unwrap();
        assert_eq!(second.result, first.result);
        assert_eq!(f.fundamentals.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.membership.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_by_name_fragment() {
        let f = fixture(sp500(), false);
        let out = f.analyzer.lookup("  Avery ").await.unwrap();
        assert_eq!(out.query, "Avery");
        assert_eq!(out.symbol, "AVY");
        // ROE 31 -> 50, PBR 7 -> 0, PER 21 -> 10, DIV 1.9 -> 10
        assert_eq!(out.result.score, 70);
        assert_eq!(out.result.verdict, Verdict::Buy);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let f = fixture(sp500(), false);
        assert_eq!(
            f.analyzer.lookup("   ").await.unwrap_err(),
            LookupError::EmptyQuery
        );
        assert_eq!(f.membership.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_symbol_is_data_unavailable_after_retries() {
        let f = fixture(sp500(), false);
        let err = f.analyzer.lookup("ZZZZ").await.unwrap_err();
        assert_eq!(
            err,
            LookupError::DataUnavailable {
                symbol: "ZZZZ".to_string()
            }
        );
        assert_eq!(f.fundamentals.quote_calls.load(Ordering::SeqCst), 2);

        // Failures are not cached.
        let _ = f.analyzer.lookup("ZZZZ").await;
        assert_eq!(f.fundamentals.quote_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_price_is_data_unavailable() {
        let f = fixture(sp500(), false);
        let err = f.analyzer.lookup("ZERO").await.unwrap_err();
        assert!(matches!(err, LookupError::DataUnavailable { .. }));
    }

    #[tokio::test]
    async fn lookup_survives_membership_outage() {
        let f = fixture(None, false);
        let out = f.analyzer.lookup("aapl").await.unwrap();
        assert_eq!(out.symbol, "AAPL");

        // Name search is unavailable, so the fragment passes through uppercased.
        let err = f.analyzer.lookup("Avery").await.unwrap_err();
        assert_eq!(
            err,
            LookupError::DataUnavailable {
                symbol: "AVERY".to_string()
            }
        );
    }

    #[tokio::test]
    async fn history_failure_keeps_snapshot() {
        let f = fixture(sp500(), true);
        let out = f.analyzer.lookup("AVY").await.unwrap();
        assert!(out.snapshot.price_history.is_empty());
        assert_eq!(out.result.score, 70);
    }

    #[tokio::test]
    async fn sector_scan_ranks_and_drops_missing_rows() {
        let f = fixture(sp500(), false);
        let out = f
            .analyzer
            .scan(Some("industrials"), &RankOptions::default())
            .await
            .unwrap();

        let ranked: Vec<_> = out.iter().map(|r| (r.symbol.as_str(), r.score)).collect();
        assert_eq!(ranked, [("B", 100), ("A", 80)]);
        assert!(out.iter().all(|r| r.sector == "Industrials"));
    }

    #[tokio::test]
    async fn unfiltered_scan_covers_the_whole_list() {
        let f = fixture(sp500(), false);
        let out = f
            .analyzer
            .scan(None, &RankOptions::default())
            .await
            .unwrap();
        let ranked: Vec<_> = out.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(ranked, ["B", "A", "AVY", "AAPL"]);
    }

    #[tokio::test]
    async fn unknown_sector_and_outage_are_distinct() {
        let f = fixture(sp500(), false);
        assert_eq!(
            f.analyzer
                .scan(Some("Utilities"), &RankOptions::default())
                .await
                .unwrap_err(),
            ScanError::UnknownSector("Utilities".to_string())
        );

        let down = fixture(None, false);
        assert_eq!(
            down.analyzer
                .scan(Some("Industrials"), &RankOptions::default())
                .await
                .unwrap_err(),
            ScanError::EmptyMembership
        );
        assert_eq!(
            down.analyzer.sectors().await.unwrap_err(),
            ScanError::EmptyMembership
        );
        // Outages are retried on the next call rather than cached.
        assert_eq!(down.membership.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn sector_where_every_fetch_fails_is_no_data() {
        let rows = Some(vec![
            row("C", "Gamma Industries", "Industrials"),
            row("D", "Delta Industries", "Industrials"),
        ]);
        let f = fixture(rows, false);
        assert_eq!(
            f.analyzer
                .scan(Some("Industrials"), &RankOptions::default())
                .await
                .unwrap_err(),
            ScanError::NoData
        );
    }

    #[tokio::test]
    async fn sectors_are_counted_and_sorted() {
        let f = fixture(sp500(), false);
        let sectors = f.analyzer.sectors().await.unwrap();
        assert_eq!(
            sectors,
            vec![
                SectorSummary {
                    name: "Industrials".to_string(),
                    count: 3
                },
                SectorSummary {
                    name: "Information Technology".to_string(),
                    count: 1
                },
                SectorSummary {
                    name: "Materials".to_string(),
                    count: 1
                },
            ]
        );
    }
}
