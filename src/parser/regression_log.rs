// Regression-log parsing: `DepVar: [code]` blocks of per-age result lines
use crate::model::{ModelFit, Observation, ParseError, ParseFailure, RiskFactorBlock};
use tracing::{debug, warn};

/// Marker for a risk-factor/age pair where no model could be fit.
pub const NO_DATA: &str = "NO_DATA";

const BLOCK_HEADER: &str = "DepVar: [";
const COLUMN_HEADER: &str = "DepVar,";

const FIELD_NAMES: [&str; 6] = [
    "label_age",
    "coefficient (CI)",
    "p_value",
    "r_squared",
    "n",
    "missing",
];

pub trait Parser {
    /// Parses the text of one risk factor's block into observations sorted by age.
    fn parse_block(&self, risk_factor: &str, text: &str) -> Result<Vec<Observation>, ParseError>;
}

#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub blocks: Vec<RiskFactorBlock>,
    pub failures: Vec<ParseError>,
}

pub struct RegressionLogParser;

impl RegressionLogParser {
    pub fn new() -> Self {
        Self
    }

    /// Splits a whole results file into blocks and parses each one.
    ///
    /// A malformed line only discards its own block; the failure is kept in
    /// `failures` and every other block is still returned, in input order.
    pub fn parse_document(&self, text: &str) -> ParsedDocument {
        let mut document = ParsedDocument::default();
        let mut current: Option<(String, Vec<(usize, &str)>)> = None;
        let mut orphaned = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if let Some(code) = header_code(line) {
                if let Some((code, lines)) = current.take() {
                    self.finish_block(&mut document, code, lines);
                }
                current = Some((code.to_string(), Vec::new()));
                continue;
            }
            if line.is_empty() || line.starts_with(COLUMN_HEADER) {
                continue;
            }
            match current.as_mut() {
                Some((_, lines)) => lines.push((index + 1, line)),
                None => orphaned += 1,
            }
        }
        if let Some((code, lines)) = current.take() {
            self.finish_block(&mut document, code, lines);
        }

        if orphaned > 0 {
            warn!("Skipped {} line(s) before the first block header", orphaned);
        }
        document
    }

    fn finish_block(&self, document: &mut ParsedDocument, code: String, lines: Vec<(usize, &str)>) {
        if lines.is_empty() {
            debug!("Block {} has no result lines, skipping", code);
            return;
        }
        match parse_lines(&code, lines) {
            Ok(observations) => {
                let block = RiskFactorBlock { code, observations };
                match document.blocks.iter().position(|b| b.code == block.code) {
                    Some(pos) => {
                        warn!("Duplicate block {}, keeping the later one", block.code);
                        document.blocks[pos] = block;
                    }
                    None => document.blocks.push(block),
                }
            }
            Err(e) => {
                warn!("Parse error: {}", e);
                document.failures.push(e);
            }
        }
    }
}

impl Parser for RegressionLogParser {
    fn parse_block(&self, risk_factor: &str, text: &str) -> Result<Vec<Observation>, ParseError> {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with(COLUMN_HEADER));
        parse_lines(risk_factor, lines)
    }
}

fn header_code(line: &str) -> Option<&str> {
    line.strip_prefix(BLOCK_HEADER)
        .map(|rest| rest.trim_end_matches(']').trim())
}

fn parse_lines<'a>(
    risk_factor: &str,
    lines: impl IntoIterator<Item = (usize, &'a str)>,
) -> Result<Vec<Observation>, ParseError> {
    let mut observations = lines
        .into_iter()
        .map(|(number, line)| parse_line(risk_factor, number, line))
        .collect::<Result<Vec<_>, _>>()?;
    // sort_by_key is stable, so duplicate ages keep their input order
    observations.sort_by_key(|o| o.age);
    Ok(observations)
}

fn parse_line(risk_factor: &str, line_number: usize, line: &str) -> Result<Observation, ParseError> {
    let fail = |reason: ParseFailure| ParseError {
        risk_factor: risk_factor.to_string(),
        line_number,
        line: line.to_string(),
        reason,
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let age = parse_age(fields[0]).ok_or_else(|| fail(ParseFailure::InvalidAge(fields[0].to_string())))?;

    if line.contains(NO_DATA) {
        return Ok(Observation {
            risk_factor: risk_factor.to_string(),
            age,
            fit: None,
        });
    }

    if fields.len() < FIELD_NAMES.len() {
        return Err(fail(ParseFailure::MissingField(FIELD_NAMES[fields.len()])));
    }

    let (coefficient, ci_lower, ci_upper) = parse_coefficient_interval(fields[1]).map_err(fail)?;
    let fit = ModelFit {
        coefficient,
        ci_lower,
        ci_upper,
        p_value: parse_number("p_value", fields[2]).map_err(fail)?,
        r_squared: parse_number("r_squared", fields[3]).map_err(fail)?,
        sample_size: parse_count("n", fields[4]).map_err(fail)?,
        missing_count: parse_count("missing", fields[5]).map_err(fail)?,
    };

    Ok(Observation {
        risk_factor: risk_factor.to_string(),
        age,
        fit: Some(fit),
    })
}

/// The age is the integer after the last underscore of the first field.
fn parse_age(field: &str) -> Option<u32> {
    field.rsplit('_').next()?.trim().parse().ok()
}

/// Parses `<coef>(<lower> to <upper>)`.
fn parse_coefficient_interval(field: &str) -> Result<(f64, f64, f64), ParseFailure> {
    let malformed = || ParseFailure::MalformedInterval(field.to_string());
    let (coef, interval) = field.split_once('(').ok_or_else(malformed)?;
    let interval = interval.trim_end().strip_suffix(')').ok_or_else(malformed)?;
    let (lower, upper) = interval.split_once(" to ").ok_or_else(malformed)?;
    Ok((
        parse_number("coefficient", coef)?,
        parse_number("ci_lower", lower)?,
        parse_number("ci_upper", upper)?,
    ))
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseFailure> {
    value.trim().parse().map_err(|_| ParseFailure::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_count(field: &'static str, value: &str) -> Result<u32, ParseFailure> {
    value.trim().parse().map_err(|_| ParseFailure::InvalidNumber {
        field,
        value: value.to_string(),
    })
}
