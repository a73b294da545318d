// Row shapes handed to the reporting layer
use crate::classifier::{category_of, period_of, Category, Period};
use crate::model::{NormalizedTable, Observation, RiskFactorBlock, SignificanceTier};
use serde::Serialize;

/// One age of one risk factor, exactly as parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailRow {
    pub age: u32,
    pub coefficient: Option<f64>,
    #[serde(rename = "CI_Lower")]
    pub ci_lower: Option<f64>,
    #[serde(rename = "CI_Upper")]
    pub ci_upper: Option<f64>,
    #[serde(rename = "P_value")]
    pub p_value: Option<f64>,
    #[serde(rename = "R2")]
    pub r_squared: Option<f64>,
    #[serde(rename = "N")]
    pub sample_size: Option<u32>,
    pub missing: Option<u32>,
}

impl From<&Observation> for DetailRow {
    fn from(observation: &Observation) -> Self {
        let fit = observation.fit.as_ref();
        DetailRow {
            age: observation.age,
            coefficient: fit.map(|f| f.coefficient),
            ci_lower: fit.map(|f| f.ci_lower),
            ci_upper: fit.map(|f| f.ci_upper),
            p_value: fit.map(|f| f.p_value),
            r_squared: fit.map(|f| f.r_squared),
            sample_size: fit.map(|f| f.sample_size),
            missing: fit.map(|f| f.missing_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailTable {
    pub code: String,
    pub rows: Vec<DetailRow>,
}

pub fn detail_tables(blocks: &[RiskFactorBlock]) -> Vec<DetailTable> {
    blocks
        .iter()
        .map(|block| DetailTable {
            code: block.code.clone(),
            rows: block.observations.iter().map(DetailRow::from).collect(),
        })
        .collect()
}

/// Combined row across risk factors; numeric fields keep full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Risk Factor")]
    pub risk_factor: String,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Coefficient")]
    pub coefficient: f64,
    #[serde(rename = "CI_Lower")]
    pub ci_lower: f64,
    #[serde(rename = "CI_Upper")]
    pub ci_upper: f64,
    #[serde(rename = "P_value")]
    pub p_value: f64,
    #[serde(rename = "Significance")]
    pub tier: SignificanceTier,
    #[serde(rename = "R2")]
    pub r_squared: f64,
    #[serde(rename = "N")]
    pub sample_size: u32,
    #[serde(rename = "Period")]
    pub period: Period,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Coefficient (95% CI)")]
    pub coefficient_ci: String,
}

/// `0.0123 (-0.0045 to 0.0291)**`
pub fn format_coefficient_ci(coefficient: f64, lower: f64, upper: f64, tier: SignificanceTier) -> String {
    format!("{:.4} ({:.4} to {:.4}){}", coefficient, lower, upper, tier)
}

/// Summary rows sorted by risk factor then age.
pub fn summary_rows(table: &NormalizedTable) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = table
        .rows
        .iter()
        .map(|row| SummaryRow {
            risk_factor: row.risk_factor.clone(),
            age: row.age,
            coefficient: row.fit.coefficient,
            ci_lower: row.fit.ci_lower,
            ci_upper: row.fit.ci_upper,
            p_value: row.fit.p_value,
            tier: row.tier,
            r_squared: row.fit.r_squared,
            sample_size: row.fit.sample_size,
            period: period_of(row.age),
            category: category_of(&row.risk_factor),
            coefficient_ci: format_coefficient_ci(
                row.fit.coefficient,
                row.fit.ci_lower,
                row.fit.ci_upper,
                row.tier,
            ),
        })
        .collect();
    rows.sort_by(|a, b| a.risk_factor.cmp(&b.risk_factor).then(a.age.cmp(&b.age)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFit;
    use crate::normalizer::Normalizer;

    fn blocks() -> Vec<RiskFactorBlock> {
        let fit = |coefficient: f64, p_value: f64| ModelFit {
            coefficient,
            ci_lower: coefficient - 0.01,
            ci_upper: coefficient + 0.01,
            p_value,
            r_squared: 0.05,
            sample_size: 800,
            missing_count: 12,
        };
        vec![
            RiskFactorBlock {
                code: "trig".into(),
                observations: vec![
                    Observation { risk_factor: "trig".into(), age: 9, fit: None },
                    Observation { risk_factor: "trig".into(), age: 10, fit: Some(fit(0.012345, 0.004)) },
                ],
            },
            RiskFactorBlock {
                code: "bmi".into(),
                observations: vec![Observation {
                    risk_factor: "bmi".into(),
                    age: 17,
                    fit: Some(fit(-0.02, 0.2)),
                }],
            },
        ]
    }

    #[test]
    fn test_detail_rows_keep_no_data() {
        let tables = detail_tables(&blocks());
        assert_eq!(tables[0].code, "trig");
        assert_eq!(tables[0].rows[0].coefficient, None);
        assert_eq!(tables[0].rows[0].missing, None);
        assert_eq!(tables[0].rows[1].sample_size, Some(800));
        assert_eq!(tables[0].rows[1].missing, Some(12));
    }

    #[test]
    fn test_detail_row_column_names() {
        let json = serde_json::to_value(&detail_tables(&blocks())[0].rows[1]).unwrap();
        for column in ["Age", "Coefficient", "CI_Lower", "CI_Upper", "P_value", "R2", "N", "Missing"] {
            assert!(json.get(column).is_some(), "missing column {}", column);
        }
    }

    #[test]
    fn test_summary_rows_sorted_and_formatted() {
        let table = Normalizer::default().normalize(&blocks());
        let rows = summary_rows(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].risk_factor, "Body Mass Index");
        assert_eq!(rows[0].period, Period::EarlyAdulthood);
        assert_eq!(rows[1].risk_factor, "Triglycerides");
        assert_eq!(rows[1].coefficient, 0.012345);
        assert_eq!(rows[1].category, Category::LipidProfile);
        assert_eq!(rows[1].coefficient_ci, "0.0123 (0.0023 to 0.0223)**");
        assert_eq!(rows[0].coefficient_ci, "-0.0200 (-0.0300 to -0.0100)");
    }
}
