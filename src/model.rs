// Core structs: Observation, NormalizedRow, TrendResult and the error types
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Regression statistics for one risk factor at one age.
///
/// Either every field is present or the whole fit is absent (`NO_DATA`),
/// which is why `Observation` holds an `Option<ModelFit>` instead of
/// optional scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFit {
    pub coefficient: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub p_value: f64,
    pub r_squared: f64,
    pub sample_size: u32,
    pub missing_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub risk_factor: String,
    pub age: u32,
    pub fit: Option<ModelFit>,
}

impl Observation {
    pub fn coefficient(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.coefficient)
    }

    pub fn p_value(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.p_value)
    }

    pub fn is_no_data(&self) -> bool {
        self.fit.is_none()
    }
}

/// All observations parsed from one `DepVar: [code]` block.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskFactorBlock {
    pub code: String,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SignificanceTier {
    #[serde(rename = "")]
    None,
    #[serde(rename = "*")]
    Low,
    #[serde(rename = "**")]
    Medium,
    #[serde(rename = "***")]
    High,
}

impl SignificanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceTier::None => "",
            SignificanceTier::Low => "*",
            SignificanceTier::Medium => "**",
            SignificanceTier::High => "***",
        }
    }
}

impl fmt::Display for SignificanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fitted observation after label resolution and significance derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub code: String,
    pub risk_factor: String,
    pub age: u32,
    pub fit: ModelFit,
    pub significant: bool,
    pub tier: SignificanceTier,
}

impl NormalizedRow {
    pub fn coefficient(&self) -> f64 {
        self.fit.coefficient
    }
}

/// A risk-factor/age pair for which no model could be fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoFitEntry {
    pub code: String,
    pub risk_factor: String,
    pub age: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub rows: Vec<NormalizedRow>,
    pub no_fit: Vec<NoFitEntry>,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendSignificance {
    #[serde(rename = "significant")]
    Significant,
    #[serde(rename = "non-significant")]
    NonSignificant,
    #[serde(rename = "insufficient data")]
    InsufficientData,
}

impl TrendSignificance {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendSignificance::Significant => "significant",
            TrendSignificance::NonSignificant => "non-significant",
            TrendSignificance::InsufficientData => "insufficient data",
        }
    }
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

/// Ordinary least-squares fit of y on x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub std_err: f64,
}

/// Early (age <= 15) versus late (age > 15) comparison for one risk factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyLateContrast {
    pub early_mean: Option<f64>,
    pub late_mean: Option<f64>,
    pub early_late_diff: Option<f64>,
    pub early_sig_pct: f64,
    pub late_sig_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub risk_factor: String,
    pub n: usize,
    pub fit: Option<LinearFit>,
    pub direction: Option<TrendDirection>,
    pub significance: TrendSignificance,
    pub contrast: Option<EarlyLateContrast>,
}

impl TrendResult {
    pub fn slope(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.slope)
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }
}

/// One pipeline run over a single input, as recorded in storage.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub source: String,
    pub rows: usize,
    pub no_fit: usize,
    pub parse_failures: usize,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid age in `{0}`")]
    InvalidAge(String),
    #[error("invalid number for `{field}`: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("malformed confidence interval `{0}`")]
    MalformedInterval(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("block `{risk_factor}`, line {line_number}: {reason} (line: `{line}`)")]
pub struct ParseError {
    pub risk_factor: String,
    pub line_number: usize,
    pub line: String,
    pub reason: ParseFailure,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config lists no inputs")]
    NoInputs,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize table: {0}")]
    Json(#[from] serde_json::Error),
}
