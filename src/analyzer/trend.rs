use crate::analyzer::regression::linear_regression;
use crate::classifier::{category_of, Category, CATEGORY_TABLE};
use crate::model::{
    EarlyLateContrast, LinearFit, NormalizedRow, NormalizedTable, TrendDirection, TrendResult,
    TrendSignificance,
};
use crate::normalizer::SIGNIFICANCE_ALPHA;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const MIN_TREND_POINTS: usize = 3;

/// Ages up to and including this one count as "early". Independent of the
/// developmental-period bins.
pub const EARLY_AGE_MAX: u32 = 15;

/// One trend result per risk factor, ordered by risk factor. Risk factors
/// with only no-fit ages still get an insufficient-data result with `n = 0`.
pub fn estimate_trends(table: &NormalizedTable) -> Vec<TrendResult> {
    let mut groups: BTreeMap<&str, Vec<&NormalizedRow>> = BTreeMap::new();
    for entry in &table.no_fit {
        groups.entry(entry.risk_factor.as_str()).or_default();
    }
    for row in &table.rows {
        groups.entry(row.risk_factor.as_str()).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(risk_factor, members)| estimate_trend(risk_factor, members))
        .collect()
}

/// Fits coefficient against age for one risk factor's rows.
pub fn estimate_trend(risk_factor: &str, mut rows: Vec<&NormalizedRow>) -> TrendResult {
    rows.sort_by_key(|r| r.age);
    let n = rows.len();

    let insufficient = || TrendResult {
        risk_factor: risk_factor.to_string(),
        n,
        fit: None,
        direction: None,
        significance: TrendSignificance::InsufficientData,
        contrast: None,
    };

    if n < MIN_TREND_POINTS {
        debug!("{}: {} point(s), not enough for a trend", risk_factor, n);
        return insufficient();
    }

    let ages: Vec<f64> = rows.iter().map(|r| r.age as f64).collect();
    let coefficients: Vec<f64> = rows.iter().map(|r| r.coefficient()).collect();
    let Some(fit) = linear_regression(&ages, &coefficients) else {
        debug!("{}: all observations share one age, no trend", risk_factor);
        return insufficient();
    };

    let direction = if fit.slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    let significance = if fit.p_value < SIGNIFICANCE_ALPHA {
        TrendSignificance::Significant
    } else {
        TrendSignificance::NonSignificant
    };

    TrendResult {
        risk_factor: risk_factor.to_string(),
        n,
        fit: Some(fit),
        direction: Some(direction),
        significance,
        contrast: Some(early_late_contrast(&rows)),
    }
}

/// Coefficient-on-age fit pooled over all risk factors of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub category: Category,
    pub n: usize,
    pub fit: Option<LinearFit>,
}

/// One entry per clinical category, in display order. Categories with too
/// few rows or a single distinct age have no fit.
pub fn category_trends(rows: &[NormalizedRow]) -> Vec<CategoryTrend> {
    CATEGORY_TABLE
        .iter()
        .map(|(category, _)| {
            let members: Vec<&NormalizedRow> = rows
                .iter()
                .filter(|r| category_of(&r.risk_factor) == *category)
                .collect();
            let ages: Vec<f64> = members.iter().map(|r| r.age as f64).collect();
            let coefficients: Vec<f64> = members.iter().map(|r| r.coefficient()).collect();
            let fit = linear_regression(&ages, &coefficients);
            if fit.is_none() {
                debug!("{}: {} row(s), no category trajectory", category, members.len());
            }
            CategoryTrend {
                category: *category,
                n: members.len(),
                fit,
            }
        })
        .collect()
}

pub fn early_late_contrast(rows: &[&NormalizedRow]) -> EarlyLateContrast {
    let (early, late): (Vec<&NormalizedRow>, Vec<&NormalizedRow>) =
        rows.iter().copied().partition(|r| r.age <= EARLY_AGE_MAX);
    let early_mean = mean_coefficient(&early);
    let late_mean = mean_coefficient(&late);

    EarlyLateContrast {
        early_mean,
        late_mean,
        early_late_diff: early_mean.zip(late_mean).map(|(e, l)| l - e),
        early_sig_pct: pct_significant(&early),
        late_sig_pct: pct_significant(&late),
    }
}

fn mean_coefficient(rows: &[&NormalizedRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    Some(rows.iter().map(|r| r.coefficient()).sum::<f64>() / rows.len() as f64)
}

fn pct_significant(rows: &[&NormalizedRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().filter(|r| r.significant).count() as f64 / rows.len() as f64 * 100.0
}
