use crate::model::{
    NoFitEntry, NormalizedRow, NormalizedTable, Observation, RiskFactorBlock, SignificanceTier,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// p-value thresholds for `*`, `**` and `***`, strictest first.
const TIER_THRESHOLDS: [(f64, SignificanceTier); 3] = [
    (0.001, SignificanceTier::High),
    (0.01, SignificanceTier::Medium),
    (0.05, SignificanceTier::Low),
];

/// Internal risk-factor codes and their display labels.
pub const DEFAULT_RISK_FACTORS: [(&str, &str); 11] = [
    ("bmi", "Body Mass Index"),
    ("wc", "Waist Circumference"),
    ("bp_sys", "Systolic Blood Pressure"),
    ("bp_dia", "Diastolic Blood Pressure"),
    ("chol", "Total Cholesterol"),
    ("hdl", "High-density Lipoprotein"),
    ("ldl", "Low-Density Lipoprotein"),
    ("trig", "Triglycerides"),
    ("glc_meta", "Glucose Metabolism"),
    ("insul", "Insulin"),
    ("cfpwv", "Carotid Femoral PWV"),
];

/// Legacy labels that need correcting after code lookup.
pub const DEFAULT_LABEL_REMAPS: [(&str, &str); 2] = [
    ("bp_di", "Diastolic Blood Pressure"),
    ("glc_met", "Glucose Metabolism"),
];

pub fn is_significant(p_value: Option<f64>) -> bool {
    matches!(p_value, Some(p) if p < SIGNIFICANCE_ALPHA)
}

pub fn significance_tier(p_value: Option<f64>) -> SignificanceTier {
    let Some(p) = p_value else {
        return SignificanceTier::None;
    };
    TIER_THRESHOLDS
        .iter()
        .find(|(threshold, _)| p < *threshold)
        .map(|(_, tier)| *tier)
        .unwrap_or(SignificanceTier::None)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessRow {
    pub risk_factor: String,
    pub fitted: usize,
    pub no_fit: usize,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    labels: HashMap<String, String>,
    remaps: HashMap<String, String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_RISK_FACTORS.iter().map(|(c, l)| (c.to_string(), l.to_string())).collect(),
            DEFAULT_LABEL_REMAPS.iter().map(|(c, l)| (c.to_string(), l.to_string())).collect(),
        )
    }
}

impl Normalizer {
    pub fn new(labels: HashMap<String, String>, remaps: HashMap<String, String>) -> Self {
        Self { labels, remaps }
    }

    /// Code lookup first, then the remap table over the resulting label.
    pub fn resolve_label(&self, code: &str) -> String {
        let label = self.labels.get(code).map(String::as_str).unwrap_or(code);
        self.remap(label)
    }

    fn remap(&self, label: &str) -> String {
        self.remaps
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    /// Flattens parsed blocks into one table; `NO_DATA` rows go to `no_fit`.
    pub fn normalize(&self, blocks: &[RiskFactorBlock]) -> NormalizedTable {
        let mut table = NormalizedTable::default();
        for block in blocks {
            let label = self.resolve_label(&block.code);
            for observation in &block.observations {
                self.push_observation(&mut table, &block.code, &label, observation);
            }
        }
        debug!(
            "Normalized {} rows ({} without a model fit)",
            table.rows.len(),
            table.no_fit.len()
        );
        table
    }

    fn push_observation(
        &self,
        table: &mut NormalizedTable,
        code: &str,
        label: &str,
        observation: &Observation,
    ) {
        match &observation.fit {
            Some(fit) => table.rows.push(NormalizedRow {
                code: code.to_string(),
                risk_factor: label.to_string(),
                age: observation.age,
                fit: fit.clone(),
                significant: is_significant(Some(fit.p_value)),
                tier: significance_tier(Some(fit.p_value)),
            }),
            None => table.no_fit.push(NoFitEntry {
                code: code.to_string(),
                risk_factor: label.to_string(),
                age: observation.age,
            }),
        }
    }

    /// Re-applies the remap table and recomputes significance on a table that
    /// has already been normalized.
    pub fn renormalize(&self, table: &NormalizedTable) -> NormalizedTable {
        let rows = table
            .rows
            .iter()
            .map(|row| NormalizedRow {
                risk_factor: self.remap(&row.risk_factor),
                significant: is_significant(Some(row.fit.p_value)),
                tier: significance_tier(Some(row.fit.p_value)),
                ..row.clone()
            })
            .collect();
        let no_fit = table
            .no_fit
            .iter()
            .map(|entry| NoFitEntry {
                risk_factor: self.remap(&entry.risk_factor),
                ..entry.clone()
            })
            .collect();
        NormalizedTable { rows, no_fit }
    }
}

/// Fitted and no-fit age counts per risk factor, ordered by risk factor.
pub fn completeness(table: &NormalizedTable) -> Vec<CompletenessRow> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in &table.rows {
        counts.entry(row.risk_factor.as_str()).or_default().0 += 1;
    }
    for entry in &table.no_fit {
        counts.entry(entry.risk_factor.as_str()).or_default().1 += 1;
    }
    counts
        .into_iter()
        .map(|(risk_factor, (fitted, no_fit))| CompletenessRow {
            risk_factor: risk_factor.to_string(),
            fitted,
            no_fit,
        })
        .collect()
}
