use crate::domain::PricePoint;
use crate::ingest::provider::FundamentalsProvider;
use crate::ingest::types::RawQuote;
use anyhow::{Context, Result};
use chrono::{DateTime, Months, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_QUOTE_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const QUOTE_MODULES: &str = "price,financialData,summaryDetail,defaultKeyStatistics,assetProfile";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Yahoo Finance quoteSummary (fundamentals) and chart (history) client.
///
/// quoteSummary needs a cookie + crumb pair. The crumb is fetched lazily, kept for the life of
/// the process, and dropped whenever Yahoo answers 401/403 so the next attempt re-authenticates.
#[derive(Debug)]
pub struct YahooClient {
    http: reqwest::Client,
    quote_base_url: String,
    chart_base_url: String,
    crumb_cache: tokio::sync::Mutex<Option<String>>,
}

impl YahooClient {
    pub fn from_env() -> Result<Self> {
        let quote_base_url = std::env::var("YAHOO_QUOTE_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUOTE_BASE_URL.to_string());
        let chart_base_url = std::env::var("YAHOO_CHART_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHART_BASE_URL.to_string());
        let timeout_secs = std::env::var("YAHOO_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(
            quote_base_url,
            chart_base_url,
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn new(quote_base_url: String, chart_base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build yahoo http client")?;

        Ok(Self {
            http,
            quote_base_url: quote_base_url.trim_end_matches('/').to_string(),
            chart_base_url: chart_base_url.trim_end_matches('/').to_string(),
            crumb_cache: tokio::sync::Mutex::new(None),
        })
    }

    async fn crumb(&self) -> Result<String> {
        let mut guard = self.crumb_cache.lock().await;
        if let Some(crumb) = guard.as_ref() {
            return Ok(crumb.clone());
        }

        // fc.yahoo.com answers 404 but sets the session cookies we need.
        self.http
            .get(COOKIE_URL)
            .send()
            .await
            .context("yahoo session cookie request failed")?;

        let crumb = self
            .http
            .get(format!("{}/v1/test/getcrumb", self.quote_base_url))
            .send()
            .await
            .context("yahoo crumb request failed")?
            .text()
            .await
            .context("failed to read yahoo crumb")?;
        let crumb = crumb.trim().to_string();

        if crumb.is_empty() || crumb.contains("Unauthorized") || crumb.contains("Too Many") {
            anyhow::bail!("yahoo crumb rejected: {crumb}");
        }

        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb_cache.lock().await = None;
    }

    /// 401/403 means the session expired: the crumb is dropped before the error is returned.
    /// 404 carries a Yahoo error body and is left to the parser.
    async fn check_quote_status(&self, status: StatusCode, symbol: &str, text: &str) -> Result<()> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_crumb().await;
            anyhow::bail!("yahoo quoteSummary HTTP {status} for {symbol}; crumb dropped");
        }
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            anyhow::bail!("yahoo quoteSummary HTTP {status} for {symbol}: {text}");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FundamentalsProvider for YahooClient {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote> {
        let crumb = self.crumb().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}",
            self.quote_base_url,
            yahoo_symbol(symbol)
        );

        let res = self
            .http
            .get(url)
            .query(&[("modules", QUOTE_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .with_context(|| format!("yahoo quoteSummary request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read yahoo quoteSummary response")?;

        self.check_quote_status(status, symbol, &text).await?;
        parse_quote_summary(&text).with_context(|| format!("quoteSummary for {symbol}"))
    }

    async fn fetch_history(&self, symbol: &str, period_months: u32) -> Result<Vec<PricePoint>> {
        let now = Utc::now();
        let start = now
            .checked_sub_months(Months::new(period_months))
            .unwrap_or(now);
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.chart_base_url,
            yahoo_symbol(symbol)
        );

        let res = self
            .http
            .get(url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("yahoo chart request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read yahoo chart response")?;
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            anyhow::bail!("yahoo chart HTTP {status} for {symbol}: {text}");
        }

        parse_chart(&text).with_context(|| format!("chart for {symbol}"))
    }
}

/// Yahoo spells class shares with a dash (`BRK-B`) where index lists use a dot (`BRK.B`).
pub fn yahoo_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: ResultBody<QuoteSummaryModules>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ResultBody<ChartSeries>,
}

#[derive(Debug, Deserialize)]
struct ResultBody<T> {
    result: Option<Vec<T>>,
    error: Option<YahooError>,
}

impl<T> ResultBody<T> {
    fn first(self) -> Result<T> {
        if let Some(err) = self.error {
            anyhow::bail!("yahoo error {}: {}", err.code, err.description);
        }
        self.result
            .and_then(|r| r.into_iter().next())
            .context("yahoo response has no result")
    }
}

#[derive(Debug, Deserialize)]
struct YahooError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryModules {
    price: Option<PriceModule>,
    financial_data: Option<FinancialData>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    regular_market_price: Option<YahooValue>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    current_price: Option<YahooValue>,
    target_mean_price: Option<YahooValue>,
    return_on_equity: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<YahooValue>,
    dividend_yield: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    price_to_book: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    industry: Option<String>,
}

/// Yahoo wraps numbers as {"raw": 123.45, "fmt": "123.45"}; `raw` is occasionally a string
/// such as "Infinity", or the object is empty.
#[derive(Debug, Deserialize)]
struct YahooValue {
    #[serde(default)]
    raw: Option<Value>,
}

fn raw(v: &Option<YahooValue>) -> Option<f64> {
    v.as_ref()?.raw.as_ref()?.as_f64()
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_quote_summary(text: &str) -> Result<RawQuote> {
    let envelope = serde_json::from_str::<QuoteSummaryEnvelope>(text)
        .with_context(|| format!("yahoo quoteSummary response is not valid JSON: {text}"))?;
    let modules = envelope.quote_summary.first()?;

    let price = modules.price.as_ref();
    let financial = modules.financial_data.as_ref();
    let summary = modules.summary_detail.as_ref();

    Ok(RawQuote {
        current_price: financial.and_then(|f| raw(&f.current_price)),
        regular_market_price: price.and_then(|p| raw(&p.regular_market_price)),
        target_mean_price: financial.and_then(|f| raw(&f.target_mean_price)),
        return_on_equity: financial.and_then(|f| raw(&f.return_on_equity)),
        trailing_pe: summary.and_then(|s| raw(&s.trailing_pe)),
        price_to_book: modules
            .default_key_statistics
            .as_ref()
            .and_then(|k| raw(&k.price_to_book)),
        dividend_yield: summary.and_then(|s| raw(&s.dividend_yield)),
        short_name: price.and_then(|p| p.short_name.clone()),
        industry: modules.asset_profile.and_then(|a| a.industry),
    })
}

fn parse_chart(text: &str) -> Result<Vec<PricePoint>> {
    let envelope = serde_json::from_str::<ChartEnvelope>(text)
        .with_context(|| format!("yahoo chart response is not valid JSON: {text}"))?;
    let series = envelope.chart.first()?;

    let closes = series
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut out = Vec::with_capacity(series.timestamp.len());
    for (ts, close) in series.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            continue;
        };
        let Some(dt) = DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        out.push(PricePoint {
            date: dt.date_naive(),
            close,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn parses_quote_summary_modules() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": {
                        "regularMarketPrice": {"raw": 101.5, "fmt": "101.50"},
                        "shortName": "Avery Dennison Corporation"
                    },
                    "financialData": {
                        "currentPrice": {"raw": 101.25, "fmt": "101.25"},
                        "targetMeanPrice": {"raw": 120.0, "fmt": "120.00"},
                        "returnOnEquity": {"raw": 0.3123, "fmt": "31.23%"}
                    },
                    "summaryDetail": {
                        "trailingPE": {"raw": "Infinity", "fmt": "∞"},
                        "dividendYield": {"raw": 0.0175, "fmt": "1.75%"}
                    },
                    "defaultKeyStatistics": {
                        "priceToBook": {}
                    },
                    "assetProfile": {"industry": "Packaging & Containers"}
                }],
                "error": null
            }
        })
        .to_string();

        let q = parse_quote_summary(&body).unwrap();
        assert_eq!(q.current_price, Some(101.25));
        assert_eq!(q.regular_market_price, Some(101.5));
        assert_eq!(q.target_mean_price, Some(120.0));
        assert_eq!(q.return_on_equity, Some(0.3123));
        assert_eq!(q.trailing_pe, None);
        assert_eq!(q.price_to_book, None);
        assert_eq!(q.dividend_yield, Some(0.0175));
        assert_eq!(q.short_name.as_deref(), Some("Avery Dennison Corporation"));
        assert_eq!(q.industry.as_deref(), Some("Packaging & Containers"));
    }

    #[test]
    fn quote_summary_without_error_field_parses() {
        let body = json!({
            "quoteSummary": {"result": [{"price": {"regularMarketPrice": {"raw": 42.0}}}]}
        })
        .to_string();

        let q = parse_quote_summary(&body).unwrap();
        assert_eq!(q.regular_market_price, Some(42.0));
        assert_eq!(q.current_price, None);
    }

    fn client() -> YahooClient {
        YahooClient::new(
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    async fn cached_crumb(client: &YahooClient) -> Option<String> {
        client.crumb_cache.lock().await.clone()
    }

    #[tokio::test]
    async fn auth_rejection_drops_cached_crumb() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let client = client();
            *client.crumb_cache.lock().await = Some("abc".to_string());

            let err = client
                .check_quote_status(status, "AAPL", "")
                .await
                .unwrap_err();
            assert!(err.to_string().contains("crumb dropped"));
            assert_eq!(cached_crumb(&client).await, None);
        }
    }

    #[tokio::test]
    async fn other_statuses_keep_cached_crumb() {
        let client = client();
        *client.crumb_cache.lock().await = Some("abc".to_string());

        assert!(client
            .check_quote_status(StatusCode::OK, "AAPL", "")
            .await
            .is_ok());
        assert!(client
            .check_quote_status(StatusCode::NOT_FOUND, "ZZZZ", "")
            .await
            .is_ok());
        let err = client
            .check_quote_status(StatusCode::INTERNAL_SERVER_ERROR, "AAPL", "boom")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(cached_crumb(&client).await.as_deref(), Some("abc"));
    }

    #[test]
    fn quote_summary_error_is_reported() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}
            }
        })
        .to_string();

        let err = parse_quote_summary(&body).unwrap_err();
        assert!(format!("{err:#}").contains("Not Found"));
    }

    #[test]
    fn parses_chart_and_skips_null_closes() {
        // 2025-01-02 14:30 UTC, 2025-01-03 14:30 UTC, 2025-01-06 14:30 UTC
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [1735828200, 1735914600, 1736173800],
                    "indicators": {"quote": [{"close": [243.85, null, 245.0]}]}
                }],
                "error": null
            }
        })
        .to_string();

        let points = parse_chart(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(points[0].close, 243.85);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    }

    #[test]
    fn chart_without_timestamps_is_empty_history() {
        let body = json!({
            "chart": {"result": [{"indicators": {"quote": [{}]}}], "error": null}
        })
        .to_string();
        assert!(parse_chart(&body).unwrap().is_empty());
    }

    #[test]
    fn translates_class_share_symbols() {
        assert_eq!(yahoo_symbol("brk.b"), "BRK-B");
        assert_eq!(yahoo_symbol(" AAPL "), "AAPL");
    }
}
