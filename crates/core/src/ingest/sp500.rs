use crate::domain::MembershipRow;
use crate::ingest::provider::MembershipProvider;
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

pub const DEFAULT_SP500_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// S&P 500 constituents scraped from the Wikipedia list page.
#[derive(Debug, Clone)]
pub struct WikipediaSp500 {
    http: reqwest::Client,
    url: String,
}

impl WikipediaSp500 {
    pub fn new(url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent("valuecard/0.1")
            .build()
            .context("failed to build membership http client")?;

        Ok(Self {
            http,
            url: url.unwrap_or_else(|| DEFAULT_SP500_URL.to_string()),
        })
    }
}

#[async_trait::async_trait]
impl MembershipProvider for WikipediaSp500 {
    fn provider_name(&self) -> &'static str {
        "wikipedia_sp500"
    }

    async fn list_membership(&self) -> Result<Vec<MembershipRow>> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("membership page request failed")?;
        let status = res.status();
        let html = res
            .text()
            .await
            .context("failed to read membership page")?;
        if !status.is_success() {
            anyhow::bail!("membership page HTTP {status}");
        }

        let rows = parse_constituents(&html)?;
        anyhow::ensure!(!rows.is_empty(), "membership table has no rows");
        tracing::info!(rows = rows.len(), url = %self.url, "fetched index membership");
        Ok(rows)
    }
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {css}: {e:?}"))
}

fn cell_text(cell: &ElementRef<'_>, a_sel: &Selector) -> String {
    // Prefer the link text so footnote markers in the cell are left out.
    cell.select(a_sel)
        .next()
        .map(|a| a.text().collect::<String>())
        .unwrap_or_else(|| cell.text().collect::<String>())
        .trim()
        .to_string()
}

/// Parses the constituents table. Columns are located by header text; rows keep page order.
pub fn parse_constituents(html: &str) -> Result<Vec<MembershipRow>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table#constituents, table.wikitable.sortable")?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;

    let table = document
        .select(&table_sel)
        .next()
        .context("could not find the constituents table")?;

    let mut rows = table.select(&tr_sel);
    let header: Vec<String> = rows
        .next()
        .map(|tr| {
            tr.select(&th_sel)
                .map(|th| th.text().collect::<String>().trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let column = |name: &str, fallback: usize| {
        header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .unwrap_or(fallback)
    };
    let symbol_col = column("Symbol", 0);
    let name_col = column("Security", 1);
    let sector_col = column("GICS Sector", 2);
    let min_cells = symbol_col.max(name_col).max(sector_col) + 1;

    let mut out = Vec::new();
    for tr in rows {
        let cells: Vec<_> = tr.select(&td_sel).collect();
        if cells.len() < min_cells {
            continue;
        }

        let symbol = cell_text(&cells[symbol_col], &a_sel).to_uppercase();
        let name = cell_text(&cells[name_col], &a_sel);
        let sector = cells[sector_col].text().collect::<String>().trim().to_string();

        if symbol.is_empty() || sector.is_empty() {
            continue;
        }
        out.push(MembershipRow {
            symbol,
            name,
            sector,
        });
    }

    Ok(out)
}
