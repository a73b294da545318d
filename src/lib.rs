//! Developmental trend analysis of age-stratified cardiovascular risk-factor
//! regressions: parse the results log, normalize it, then aggregate, fit
//! trends and summarize findings.

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod storage;
pub mod tables;
pub mod utils;
