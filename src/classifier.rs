// Developmental-period and risk-category lookups
use serde::Serialize;
use std::fmt;

/// Half-open `(lower, upper]` age bins, in display order.
pub const PERIOD_BINS: [(u32, u32, Period); 3] = [
    (8, 12, Period::Childhood),
    (12, 16, Period::Adolescence),
    (16, 25, Period::EarlyAdulthood),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Period {
    #[serde(rename = "Childhood (9-12)")]
    Childhood,
    #[serde(rename = "Adolescence (13-16)")]
    Adolescence,
    #[serde(rename = "Early Adulthood (17-24)")]
    EarlyAdulthood,
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Period::Childhood => "Childhood (9-12)",
            Period::Adolescence => "Adolescence (13-16)",
            Period::EarlyAdulthood => "Early Adulthood (17-24)",
            Period::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Anthropometric,
    #[serde(rename = "Blood Pressure")]
    BloodPressure,
    #[serde(rename = "Lipid Profile")]
    LipidProfile,
    #[serde(rename = "Glucose Metabolism")]
    GlucoseMetabolism,
    #[serde(rename = "Arterial Stiffness")]
    ArterialStiffness,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Anthropometric => "Anthropometric",
            Category::BloodPressure => "Blood Pressure",
            Category::LipidProfile => "Lipid Profile",
            Category::GlucoseMetabolism => "Glucose Metabolism",
            Category::ArterialStiffness => "Arterial Stiffness",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Risk-factor display labels per clinical category, in display order.
pub const CATEGORY_TABLE: [(Category, &[&str]); 5] = [
    (Category::Anthropometric, &["Body Mass Index", "Waist Circumference"]),
    (
        Category::BloodPressure,
        &["Systolic Blood Pressure", "Diastolic Blood Pressure"],
    ),
    (
        Category::LipidProfile,
        &[
            "Total Cholesterol",
            "High-Density Lipoprotein",
            "Low-Density Lipoprotein",
            "Triglycerides",
        ],
    ),
    (Category::GlucoseMetabolism, &["Glucose Metabolism", "Insulin"]),
    (Category::ArterialStiffness, &["Carotid Femoral PWV"]),
];

pub fn period_of(age: u32) -> Period {
    PERIOD_BINS
        .iter()
        .find(|(lower, upper, _)| age > *lower && age <= *upper)
        .map(|(_, _, period)| *period)
        .unwrap_or(Period::Unclassified)
}

/// Labels are matched ignoring ASCII case, so `High-density Lipoprotein`
/// and `High-Density Lipoprotein` land in the same category.
pub fn category_of(risk_factor: &str) -> Category {
    CATEGORY_TABLE
        .iter()
        .find(|(_, labels)| labels.iter().any(|l| l.eq_ignore_ascii_case(risk_factor.trim())))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
