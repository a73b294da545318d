use crate::analyzer::regression::linear_regression;
use crate::model::{LinearFit, NormalizedRow};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrongestAssociation {
    pub risk_factor: String,
    pub coefficient: f64,
    pub p_value: f64,
}

/// Cross-risk-factor summary at one age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeProfile {
    pub age: u32,
    pub total: usize,
    pub significant: usize,
    pub pct_significant: f64,
    pub negative: usize,
    pub positive: usize,
    pub mean_abs_coefficient: f64,
    pub strongest: StrongestAssociation,
}

pub fn age_profiles(rows: &[NormalizedRow]) -> Vec<AgeProfile> {
    let mut groups: BTreeMap<u32, Vec<&NormalizedRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.age).or_default().push(row);
    }
    groups
        .into_iter()
        .filter_map(|(age, members)| profile(age, &members))
        .collect()
}

fn profile(age: u32, rows: &[&NormalizedRow]) -> Option<AgeProfile> {
    // first row wins on equal magnitude
    let strongest = rows.iter().copied().reduce(|best, row| {
        if row.coefficient().abs() > best.coefficient().abs() {
            row
        } else {
            best
        }
    })?;
    let total = rows.len();
    let significant = rows.iter().filter(|r| r.significant).count();

    Some(AgeProfile {
        age,
        total,
        significant,
        pct_significant: significant as f64 / total as f64 * 100.0,
        negative: rows.iter().filter(|r| r.coefficient() < 0.0).count(),
        positive: rows.iter().filter(|r| r.coefficient() > 0.0).count(),
        mean_abs_coefficient: rows.iter().map(|r| r.coefficient().abs()).sum::<f64>() / total as f64,
        strongest: StrongestAssociation {
            risk_factor: strongest.risk_factor.clone(),
            coefficient: strongest.coefficient(),
            p_value: strongest.fit.p_value,
        },
    })
}

/// Linear trend of the per-age percentage of significant associations.
pub fn significance_trend(profiles: &[AgeProfile]) -> Option<LinearFit> {
    let ages: Vec<f64> = profiles.iter().map(|p| p.age as f64).collect();
    let pcts: Vec<f64> = profiles.iter().map(|p| p.pct_significant).collect();
    linear_regression(&ages, &pcts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFit;
    use crate::normalizer::{is_significant, significance_tier};

    fn row(risk_factor: &str, age: u32, coefficient: f64, p_value: f64) -> NormalizedRow {
        NormalizedRow {
            code: risk_factor.to_string(),
            risk_factor: risk_factor.to_string(),
            age,
            fit: ModelFit {
                coefficient,
                ci_lower: coefficient - 0.05,
                ci_upper: coefficient + 0.05,
                p_value,
                r_squared: 0.1,
                sample_size: 100,
                missing_count: 0,
            },
            significant: is_significant(Some(p_value)),
            tier: significance_tier(Some(p_value)),
        }
    }

    #[test]
    fn test_profile_counts() {
        let rows = vec![
            row("Body Mass Index", 9, -0.03, 0.001),
            row("Insulin", 9, 0.01, 0.3),
            row("Triglycerides", 9, -0.02, 0.04),
            row("Triglycerides", 10, 0.0, 0.9),
        ];
        let profiles = age_profiles(&rows);
        assert_eq!(profiles.len(), 2);
        let p9 = &profiles[0];
        assert_eq!(p9.age, 9);
        assert_eq!(p9.total, 3);
        assert_eq!(p9.significant, 2);
        assert!((p9.pct_significant - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(p9.negative, 2);
        assert_eq!(p9.positive, 1);
        assert!((p9.mean_abs_coefficient - 0.02).abs() < 1e-12);
        assert_eq!(p9.strongest.risk_factor, "Body Mass Index");
        assert_eq!(p9.strongest.p_value, 0.001);

        let p10 = &profiles[1];
        assert_eq!(p10.negative, 0);
        assert_eq!(p10.positive, 0);
    }

    #[test]
    fn test_strongest_tie_keeps_first() {
        let rows = vec![row("A", 12, 0.05, 0.5), row("B", 12, -0.05, 0.5)];
        assert_eq!(age_profiles(&rows)[0].strongest.risk_factor, "A");
    }

    #[test]
    fn test_significance_trend() {
        let rows = vec![
            row("A", 9, 0.1, 0.5),
            row("A", 10, 0.1, 0.01),
            row("B", 10, 0.1, 0.5),
            row("A", 11, 0.1, 0.01),
        ];
        let fit = significance_trend(&age_profiles(&rows)).unwrap();
        assert!((fit.slope - 50.0).abs() < 1e-9);
        assert!(significance_trend(&[]).is_none());
    }
}
