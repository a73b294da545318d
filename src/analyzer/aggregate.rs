use crate::classifier::{category_of, period_of, Category, Period};
use crate::model::NormalizedRow;
use serde::Serialize;
use std::collections::BTreeMap;

/// Descriptive statistics for one group of normalized rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow<K> {
    pub key: K,
    pub count: usize,
    pub mean_coefficient: f64,
    /// Sample standard deviation (n - 1); absent for single-row groups.
    pub std_coefficient: Option<f64>,
    pub min_coefficient: f64,
    pub max_coefficient: f64,
    pub mean_abs_coefficient: f64,
    /// Share of significant rows, 0-100.
    pub pct_significant: f64,
    pub mean_p_value: f64,
    pub mean_r_squared: f64,
    pub mean_sample_size: f64,
}

/// Groups rows by `key` and summarizes each group.
///
/// Output is in ascending key order; groups with no rows never appear.
pub fn aggregate_by<'a, K, F>(rows: impl IntoIterator<Item = &'a NormalizedRow>, key: F) -> Vec<AggregateRow<K>>
where
    K: Ord,
    F: Fn(&NormalizedRow) -> K,
{
    let mut groups: BTreeMap<K, Vec<&NormalizedRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(key, members)| summarize(key, &members))
        .collect()
}

fn summarize<K>(key: K, rows: &[&NormalizedRow]) -> AggregateRow<K> {
    let count = rows.len();
    let n = count as f64;
    let coefficients: Vec<f64> = rows.iter().map(|r| r.coefficient()).collect();
    let mean = coefficients.iter().sum::<f64>() / n;
    let std = (count > 1).then(|| {
        let variance = coefficients.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    });
    let mean_of = |f: fn(&NormalizedRow) -> f64| rows.iter().map(|r| f(r)).sum::<f64>() / n;

    AggregateRow {
        key,
        count,
        mean_coefficient: mean,
        std_coefficient: std,
        min_coefficient: coefficients.iter().copied().fold(f64::INFINITY, f64::min),
        max_coefficient: coefficients.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_abs_coefficient: coefficients.iter().map(|c| c.abs()).sum::<f64>() / n,
        pct_significant: rows.iter().filter(|r| r.significant).count() as f64 / n * 100.0,
        mean_p_value: mean_of(|r| r.fit.p_value),
        mean_r_squared: mean_of(|r| r.fit.r_squared),
        mean_sample_size: mean_of(|r| r.fit.sample_size as f64),
    }
}

pub fn by_age(rows: &[NormalizedRow]) -> Vec<AggregateRow<u32>> {
    aggregate_by(rows, |r| r.age)
}

pub fn by_risk_factor(rows: &[NormalizedRow]) -> Vec<AggregateRow<String>> {
    aggregate_by(rows, |r| r.risk_factor.clone())
}

pub fn by_period(rows: &[NormalizedRow]) -> Vec<AggregateRow<Period>> {
    aggregate_by(rows, |r| period_of(r.age))
}

pub fn by_category(rows: &[NormalizedRow]) -> Vec<AggregateRow<Category>> {
    aggregate_by(rows, |r| category_of(&r.risk_factor))
}

pub fn by_risk_factor_period(rows: &[NormalizedRow]) -> Vec<AggregateRow<(String, Period)>> {
    aggregate_by(rows, |r| (r.risk_factor.clone(), period_of(r.age)))
}

pub fn by_category_period(rows: &[NormalizedRow]) -> Vec<AggregateRow<(Category, Period)>> {
    aggregate_by(rows, |r| (category_of(&r.risk_factor), period_of(r.age)))
}
