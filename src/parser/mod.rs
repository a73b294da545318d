// Parsing of regression-output logs into typed observations

pub mod regression_log;

pub use regression_log::{ParsedDocument, Parser, RegressionLogParser, NO_DATA};
