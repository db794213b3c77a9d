use std::fmt::Write;
use valuecard_core::domain::PricePoint;
use valuecard_core::rank::ScoredRow;
use valuecard_core::service::Lookup;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub first: PricePoint,
    pub last: PricePoint,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
}

pub fn summarize_history(points: &[PricePoint]) -> Option<HistorySummary> {
    let first = *points.first()?;
    let last = *points.last()?;
    let high = points.iter().map(|p| p.close).fold(f64::MIN, f64::max);
    let low = points.iter().map(|p| p.close).fold(f64::MAX, f64::min);
    let change_pct = if first.close > 0.0 {
        (last.close - first.close) / first.close * 100.0
    } else {
        0.0
    };
    Some(HistorySummary {
        first,
        last,
        change_pct,
        high,
        low,
    })
}

fn margin(m: Option<f64>) -> String {
    match m {
        Some(m) => format!("{m:+.1}%"),
        None => "n/a".to_string(),
    }
}

pub fn render_lookup(lookup: &Lookup) -> String {
    let s = &lookup.snapshot;
    let r = &lookup.result;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", s.display_name, lookup.symbol);
    let _ = writeln!(
        out,
        "Industry: {}",
        s.industry.as_deref().unwrap_or("ETF/Others")
    );
    let _ = writeln!(out, "Score: {}/100  {}", r.score, r.verdict.label());
    let _ = writeln!(
        out,
        "Price ${:.2}  ROE {}%  PER {}x  PBR {}x  DIV {}%",
        s.price, s.return_on_equity, s.price_to_earnings, s.price_to_book, s.dividend_yield_pct
    );
    if s.target_price > 0.0 {
        let _ = writeln!(
            out,
            "Target ${:.2}  Safety margin {}",
            s.target_price,
            margin(r.margin_pct)
        );
    } else {
        let _ = writeln!(out, "Safety margin n/a");
    }

    match summarize_history(&s.price_history) {
        Some(h) => {
            let _ = writeln!(
                out,
                "12M: {} ${:.2} -> {} ${:.2} ({:+.1}%), high ${:.2}, low ${:.2}",
                h.first.date, h.first.close, h.last.date, h.last.close, h.change_pct, h.high, h.low
            );
        }
        None => {
            let _ = writeln!(out, "12M: price history unavailable");
        }
    }

    if r.reasons.is_empty() {
        let _ = writeln!(
            out,
            "No value factors met (growth stock or priced high)."
        );
    } else {
        for reason in &r.reasons {
            let _ = writeln!(out, "- {}", reason.label);
        }
    }
    out
}

pub fn render_scan(sector: Option<&str>, rows: &[ScoredRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Top {} - {}", rows.len(), sector.unwrap_or("all sectors"));
    let _ = writeln!(
        out,
        "{:>3}  {:<7} {:<28} {:>5}  {:<10} {:>10} {:>8} {:>7} {:>7} {:>8}",
        "#", "Ticker", "Name", "Score", "Verdict", "Price", "ROE", "PER", "PBR", "Margin"
    );
    for (i, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<7} {:<28} {:>5}  {:<10} {:>10.2} {:>7.2}% {:>7.2} {:>7.2} {:>8}",
            i + 1,
            row.symbol,
            truncate(&row.name, 28),
            row.score,
            row.verdict.label(),
            row.price,
            row.return_on_equity,
            row.price_to_earnings,
            row.price_to_book,
            margin(row.margin_pct),
        );
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}
