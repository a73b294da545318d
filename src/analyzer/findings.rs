// Cross-risk-factor classification of trend results
use crate::model::{EarlyLateContrast, TrendDirection, TrendResult, TrendSignificance};
use serde::Serialize;

/// Mean of early and late significance percentages at or above this marks a
/// consistent association.
pub const CONSISTENCY_PCT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignificanceShift {
    /// Never significant early, significant at some later age.
    Emerging,
    /// Significant early, never significant later.
    Disappearing,
}

/// How a significant trend changes the association between early and late ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationShift {
    StrengtheningNegative,
    WeakeningNegative,
    StrengtheningPositive,
    WeakeningPositive,
    NegativeToPositive,
    PositiveToNegative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftFinding<T> {
    pub risk_factor: String,
    pub shift: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendFindings {
    pub fitted: usize,
    pub significant: usize,
    pub increasing: usize,
    pub decreasing: usize,
    pub mean_early_sig_pct: f64,
    pub mean_late_sig_pct: f64,
    /// Risk factors by |slope| descending; unfitted ones last, in input order.
    pub ranked: Vec<String>,
    pub consistent: Vec<String>,
    pub significance_shifts: Vec<ShiftFinding<SignificanceShift>>,
    pub association_shifts: Vec<ShiftFinding<AssociationShift>>,
}

impl TrendFindings {
    /// Share of fitted trends that are significant, 0-100.
    pub fn pct_significant(&self) -> Option<f64> {
        (self.fitted > 0).then(|| self.significant as f64 / self.fitted as f64 * 100.0)
    }
}

pub fn summarize_trends(trends: &[TrendResult]) -> TrendFindings {
    let fitted: Vec<&TrendResult> = trends.iter().filter(|t| t.is_fitted()).collect();
    let count_direction = |d: TrendDirection| fitted.iter().filter(|t| t.direction == Some(d)).count();

    let contrasts: Vec<_> = fitted.iter().filter_map(|t| t.contrast.as_ref()).collect();
    let mean_pct = |pick: fn(&EarlyLateContrast) -> f64| {
        if contrasts.is_empty() {
            0.0
        } else {
            contrasts.iter().map(|c| pick(c)).sum::<f64>() / contrasts.len() as f64
        }
    };

    let mut ranked: Vec<&TrendResult> = trends.iter().collect();
    // stable sort keeps input order among unfitted results
    ranked.sort_by(|a, b| {
        let key = |t: &TrendResult| t.slope().map(f64::abs).unwrap_or(0.0);
        key(b).total_cmp(&key(a))
    });
    let ranked_order: Vec<&TrendResult> = ranked
        .iter()
        .copied()
        .filter(|t| t.is_fitted())
        .chain(ranked.iter().copied().filter(|t| !t.is_fitted()))
        .collect();

    TrendFindings {
        fitted: fitted.len(),
        significant: fitted
            .iter()
            .filter(|t| t.significance == TrendSignificance::Significant)
            .count(),
        increasing: count_direction(TrendDirection::Increasing),
        decreasing: count_direction(TrendDirection::Decreasing),
        mean_early_sig_pct: mean_pct(|c| c.early_sig_pct),
        mean_late_sig_pct: mean_pct(|c| c.late_sig_pct),
        ranked: ranked_order.iter().map(|t| t.risk_factor.clone()).collect(),
        consistent: ranked_order
            .iter()
            .filter(|t| is_consistent(t))
            .map(|t| t.risk_factor.clone())
            .collect(),
        significance_shifts: ranked_order
            .iter()
            .filter_map(|t| {
                significance_shift(t).map(|shift| ShiftFinding {
                    risk_factor: t.risk_factor.clone(),
                    shift,
                })
            })
            .collect(),
        association_shifts: ranked_order
            .iter()
            .filter_map(|t| {
                association_shift(t).map(|shift| ShiftFinding {
                    risk_factor: t.risk_factor.clone(),
                    shift,
                })
            })
            .collect(),
    }
}

pub fn is_consistent(trend: &TrendResult) -> bool {
    trend
        .contrast
        .as_ref()
        .is_some_and(|c| (c.early_sig_pct + c.late_sig_pct) / 2.0 >= CONSISTENCY_PCT)
}

pub fn significance_shift(trend: &TrendResult) -> Option<SignificanceShift> {
    let c = trend.contrast.as_ref()?;
    if c.early_sig_pct == 0.0 && c.late_sig_pct > 0.0 {
        Some(SignificanceShift::Emerging)
    } else if c.early_sig_pct > 0.0 && c.late_sig_pct == 0.0 {
        Some(SignificanceShift::Disappearing)
    } else {
        None
    }
}

/// Only significant trends with both an early and a late mean are classified;
/// a zero mean on either side gives no classification.
pub fn association_shift(trend: &TrendResult) -> Option<AssociationShift> {
    if trend.significance != TrendSignificance::Significant {
        return None;
    }
    let c = trend.contrast.as_ref()?;
    let (early, late) = c.early_mean.zip(c.late_mean)?;
    let direction = trend.direction?;

    let shift = match (direction, early < 0.0, late < 0.0, early > 0.0, late > 0.0) {
        (TrendDirection::Increasing, true, true, _, _) => AssociationShift::WeakeningNegative,
        (TrendDirection::Increasing, true, _, _, true) => AssociationShift::NegativeToPositive,
        (TrendDirection::Increasing, _, _, true, true) => AssociationShift::StrengtheningPositive,
        (TrendDirection::Decreasing, true, true, _, _) => AssociationShift::StrengtheningNegative,
        (TrendDirection::Decreasing, _, true, true, _) => AssociationShift::PositiveToNegative,
        (TrendDirection::Decreasing, _, _, true, true) => AssociationShift::WeakeningPositive,
        _ => return None,
    };
    Some(shift)
}
