use crate::domain::FundamentalSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Profitability,
    Asset,
    Valuation,
    Dividend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reason {
    pub category: ReasonCategory,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongBuy,
    Buy,
    Hold,
    Avoid,
}

impl Verdict {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Verdict::StrongBuy,
            60..=79 => Verdict::Buy,
            40..=59 => Verdict::Hold,
            _ => Verdict::Avoid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::StrongBuy => "Strong Buy",
            Verdict::Buy => "Buy",
            Verdict::Hold => "Hold",
            Verdict::Avoid => "Avoid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: u32,
    pub reasons: Vec<Reason>,
    /// `None` when no analyst target is available.
    pub margin_pct: Option<f64>,
    pub verdict: Verdict,
}

/// Point rule table. Each metric is an else-if chain (only the first matching tier counts);
/// the four metrics add up independently. Lower tiers earn points without a reason.
pub fn score(snapshot: &FundamentalSnapshot) -> ScoreResult {
    let mut points: u32 = 0;
    let mut reasons = Vec::new();
    let mut reason = |category, label| reasons.push(Reason { category, label });

    let roe = snapshot.return_on_equity;
    if roe >= 20.0 {
        points += 50;
        reason(ReasonCategory::Profitability, "ROE at or above 20% (exceptional)");
    } else if roe >= 15.0 {
        points += 30;
        reason(ReasonCategory::Profitability, "ROE at or above 15% (strong)");
    } else if roe >= 10.0 {
        points += 10;
    }

    let pbr = snapshot.price_to_book;
    if pbr > 0.0 && pbr <= 1.5 {
        points += 20;
        reason(ReasonCategory::Asset, "PBR at or below 1.5x (undervalued)");
    } else if pbr > 0.0 && pbr <= 4.0 {
        points += 10;
    }

    let per = snapshot.price_to_earnings;
    if per > 0.0 && per <= 15.0 {
        points += 20;
        reason(ReasonCategory::Valuation, "PER at or below 15x (undervalued)");
    } else if per > 0.0 && per <= 25.0 {
        points += 10;
    }

    if snapshot.dividend_yield_pct >= 1.5 {
        points += 10;
        reason(ReasonCategory::Dividend, "Dividend yield at or above 1.5%");
    }

    ScoreResult {
        score: points,
        reasons,
        margin_pct: safety_margin(snapshot.price, snapshot.target_price),
        verdict: Verdict::from_score(points),
    }
}

/// Percent gap between the analyst target and the current price. `price` must be positive.
pub fn safety_margin(price: f64, target_price: f64) -> Option<f64> {
    if target_price > 0.0 {
        Some((target_price - price) / price * 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(roe: f64, pbr: f64, per: f64, div: f64) -> FundamentalSnapshot {
        FundamentalSnapshot {
            symbol: "TEST".to_string(),
            display_name: "Test Corp".to_string(),
            industry: None,
            price: 100.0,
            target_price: 0.0,
            return_on_equity: roe,
            price_to_earnings: per,
            price_to_book: pbr,
            dividend_yield_pct: div,
            price_history: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn top_tiers_reach_max_score() {
        let r = score(&snapshot(20.0, 1.5, 15.0, 1.5));
        assert_eq!(r.score, 100);
        assert_eq!(r.verdict, Verdict::StrongBuy);
        let categories: Vec<_> = r.reasons.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            [
                ReasonCategory::Profitability,
                ReasonCategory::Asset,
                ReasonCategory::Valuation,
                ReasonCategory::Dividend,
            ]
        );
    }

    #[test]
    fn roe_just_below_boundary_drops_one_tier() {
        let r = score(&snapshot(19.9, 1.5, 15.0, 1.5));
        assert_eq!(r.score, 30 + 20 + 20 + 10);
    }

    #[test]
    fn roe_contribution_is_monotonic() {
        let contributions: Vec<u32> = [9.0, 11.0, 16.0, 21.0]
            .into_iter()
            .map(|roe| score(&snapshot(roe, 0.0, 0.0, 0.0)).score)
            .collect();
        assert_eq!(contributions, [0, 10, 30, 50]);
    }

    #[test]
    fn lower_tiers_score_without_reasons() {
        let r = score(&snapshot(12.0, 3.0, 20.0, 1.0));
        assert_eq!(r.score, 30);
        assert!(r.reasons.is_empty());
        assert_eq!(r.verdict, Verdict::Avoid);
    }

    #[test]
    fn zero_or_negative_ratios_earn_nothing() {
        assert_eq!(score(&snapshot(-5.0, 0.0, -12.0, 0.0)).score, 0);
        assert_eq!(score(&snapshot(0.0, 4.01, 25.01, 1.49)).score, 0);
    }

    #[test]
    fn identical_input_identical_result() {
        let s = snapshot(17.0, 2.0, 14.0, 2.5);
        assert_eq!(score(&s), score(&s));
    }

    #[test]
    fn margin_sign_and_availability() {
        let m = safety_margin(100.0, 120.0).unwrap();
        assert!((m - 20.0).abs() < 1e-9);
        assert!(safety_margin(100.0, 80.0).unwrap() < 0.0);
        assert_eq!(safety_margin(100.0, 0.0), None);
    }

    #[test]
    fn margin_does_not_change_score() {
        let mut s = snapshot(20.0, 1.5, 15.0, 1.5);
        let without = score(&s);
        s.target_price = 150.0;
        let with = score(&s);
        assert_eq!(without.score, with.score);
        assert_eq!(without.margin_pct, None);
        assert!(with.margin_pct.is_some());
    }

    #[test]
    fn verdict_bands() {
        assert_eq!(Verdict::from_score(100), Verdict::StrongBuy);
        assert_eq!(Verdict::from_score(80), Verdict::StrongBuy);
        assert_eq!(Verdict::from_score(79), Verdict::Buy);
        assert_eq!(Verdict::from_score(60), Verdict::Buy);
        assert_eq!(Verdict::from_score(59), Verdict::Hold);
        assert_eq!(Verdict::from_score(40), Verdict::Hold);
        assert_eq!(Verdict::from_score(39), Verdict::Avoid);
        assert_eq!(Verdict::from_score(0), Verdict::Avoid);
    }
}
