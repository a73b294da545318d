// Analyzer module: grouped summaries, trend fits and findings over a normalized table.

pub mod age_profile;
pub mod aggregate;
pub mod findings;
pub mod regression;
pub mod trend;

use crate::classifier::{Category, Period};
use crate::model::{LinearFit, NormalizedTable, TrendResult};
use crate::normalizer::{completeness, CompletenessRow};
use age_profile::AgeProfile;
use aggregate::AggregateRow;
use findings::TrendFindings;
use trend::CategoryTrend;
use serde::Serialize;
use tracing::{info, warn};

/// Trait defining the interface for a normalized-table analyzer.
pub trait Analyzer {
    fn aggregate(&self, table: &NormalizedTable) -> Aggregates;
    fn trends(&self, table: &NormalizedTable) -> Vec<TrendResult>;
    fn analyze(&self, table: &NormalizedTable) -> AnalysisResult;
}

/// Every grouped summary the reports read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub by_age: Vec<AggregateRow<u32>>,
    pub by_risk_factor: Vec<AggregateRow<String>>,
    pub by_period: Vec<AggregateRow<Period>>,
    pub by_risk_factor_period: Vec<AggregateRow<(String, Period)>>,
    pub by_category: Vec<AggregateRow<Category>>,
    pub by_category_period: Vec<AggregateRow<(Category, Period)>>,
}

/// Structure representing the overall analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub aggregates: Aggregates,
    pub age_profiles: Vec<AgeProfile>,
    /// Trend of the per-age percentage of significant associations.
    pub significance_trend: Option<LinearFit>,
    pub trends: Vec<TrendResult>,
    /// Pooled trajectory of each clinical category.
    pub category_trends: Vec<CategoryTrend>,
    pub findings: TrendFindings,
    pub completeness: Vec<CompletenessRow>,
}

/// Implementation of the table analyzer.
pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for AnalyzerImpl {
    fn aggregate(&self, table: &NormalizedTable) -> Aggregates {
        let rows = &table.rows;
        Aggregates {
            by_age: aggregate::by_age(rows),
            by_risk_factor: aggregate::by_risk_factor(rows),
            by_period: aggregate::by_period(rows),
            by_risk_factor_period: aggregate::by_risk_factor_period(rows),
            by_category: aggregate::by_category(rows),
            by_category_period: aggregate::by_category_period(rows),
        }
    }

    fn trends(&self, table: &NormalizedTable) -> Vec<TrendResult> {
        trend::estimate_trends(table)
    }

    /// Runs every derivation over one normalized table.
    fn analyze(&self, table: &NormalizedTable) -> AnalysisResult {
        let aggregates = self.aggregate(table);
        if let Some(unclassified) = aggregates.by_period.iter().find(|a| a.key == Period::Unclassified) {
            warn!(
                "{} row(s) fall outside the developmental periods",
                unclassified.count
            );
        }

        let age_profiles = age_profile::age_profiles(&table.rows);
        let significance_trend = age_profile::significance_trend(&age_profiles);
        let trends = self.trends(table);
        let findings = findings::summarize_trends(&trends);
        info!(
            "Trends: {} fitted, {} significant ({:.1}%), {} increasing, {} decreasing",
            findings.fitted,
            findings.significant,
            findings.pct_significant().unwrap_or(0.0),
            findings.increasing,
            findings.decreasing
        );

        AnalysisResult {
            aggregates,
            age_profiles,
            significance_trend,
            trends,
            category_trends: trend::category_trends(&table.rows),
            findings,
            completeness: completeness(table),
        }
    }
}
