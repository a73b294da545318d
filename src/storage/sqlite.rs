use crate::classifier::{category_of, period_of};
use crate::model::{
    ModelFit, NoFitEntry, NormalizedRow, NormalizedTable, RunRecord, SignificanceTier,
    StorageError, TrendResult,
};
use crate::normalizer::{is_significant, significance_tier};
use rusqlite::{params, Connection, Row};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database and creates the tables if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS observations (
                source TEXT NOT NULL,
                seq INTEGER NOT NULL,
                risk_factor TEXT NOT NULL,
                code TEXT NOT NULL,
                age INTEGER NOT NULL,
                coefficient REAL,
                ci_lower REAL,
                ci_upper REAL,
                p_value REAL,
                r_squared REAL,
                sample_size INTEGER,
                missing_count INTEGER,
                significant INTEGER NOT NULL DEFAULT 0,
                tier TEXT NOT NULL DEFAULT '',
                period TEXT NOT NULL,
                category TEXT NOT NULL,
                PRIMARY KEY (source, seq)
            );

            CREATE TABLE IF NOT EXISTS trend_results (
                source TEXT NOT NULL,
                risk_factor TEXT NOT NULL,
                n INTEGER NOT NULL,
                slope REAL,
                intercept REAL,
                r_squared REAL,
                p_value REAL,
                std_err REAL,
                direction TEXT,
                significance TEXT NOT NULL,
                early_mean REAL,
                late_mean REAL,
                early_late_diff REAL,
                early_sig_pct REAL,
                late_sig_pct REAL,
                PRIMARY KEY (source, risk_factor)
            );

            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                rows INTEGER NOT NULL,
                no_fit INTEGER NOT NULL,
                parse_failures INTEGER NOT NULL,
                finished_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    /// Replaces the stored observations of `source`. Rows are keyed by their
    /// position in the table, so same-age or same-label rows are all kept.
    pub fn save_table(&mut self, source: &str, table: &NormalizedTable) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM observations WHERE source = ?1", params![source])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO observations (
                    source, seq, risk_factor, code, age, coefficient, ci_lower, ci_upper,
                    p_value, r_squared, sample_size, missing_count,
                    significant, tier, period, category
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            let mut seq: i64 = 0;
            for row in &table.rows {
                seq += 1;
                stmt.execute(params![
                    source,
                    seq,
                    &row.risk_factor,
                    &row.code,
                    row.age,
                    row.fit.coefficient,
                    row.fit.ci_lower,
                    row.fit.ci_upper,
                    row.fit.p_value,
                    row.fit.r_squared,
                    row.fit.sample_size,
                    row.fit.missing_count,
                    row.significant,
                    row.tier.as_str(),
                    period_of(row.age).label(),
                    category_of(&row.risk_factor).label(),
                ])?;
            }
            for entry in &table.no_fit {
                seq += 1;
                stmt.execute(params![
                    source,
                    seq,
                    &entry.risk_factor,
                    &entry.code,
                    entry.age,
                    None::<f64>,
                    None::<f64>,
                    None::<f64>,
                    None::<f64>,
                    None::<f64>,
                    None::<u32>,
                    None::<u32>,
                    false,
                    "",
                    period_of(entry.age).label(),
                    category_of(&entry.risk_factor).label(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Reads the observations of `source` back in the order they were saved.
    pub fn load_table(&self, source: &str) -> Result<NormalizedTable, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT risk_factor, code, age, coefficient, ci_lower, ci_upper,
                    p_value, r_squared, sample_size, missing_count, tier
             FROM observations WHERE source = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![source], Self::map_observation)?;

        let mut table = NormalizedTable::default();
        for row in rows {
            match row? {
                StoredObservation::Fitted(row) => table.rows.push(row),
                StoredObservation::NoFit(entry) => table.no_fit.push(entry),
            }
        }
        Ok(table)
    }

    pub fn save_trends(&mut self, source: &str, trends: &[TrendResult]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM trend_results WHERE source = ?1", params![source])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trend_results (
                    source, risk_factor, n, slope, intercept, r_squared, p_value, std_err,
                    direction, significance, early_mean, late_mean, early_late_diff,
                    early_sig_pct, late_sig_pct
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for trend in trends {
                let fit = trend.fit.as_ref();
                let contrast = trend.contrast.as_ref();
                stmt.execute(params![
                    source,
                    &trend.risk_factor,
                    trend.n as i64,
                    fit.map(|f| f.slope),
                    fit.map(|f| f.intercept),
                    fit.map(|f| f.r_squared),
                    fit.map(|f| f.p_value),
                    fit.map(|f| f.std_err),
                    trend.direction.map(|d| d.as_str()),
                    trend.significance.as_str(),
                    contrast.and_then(|c| c.early_mean),
                    contrast.and_then(|c| c.late_mean),
                    contrast.and_then(|c| c.early_late_diff),
                    contrast.map(|c| c.early_sig_pct),
                    contrast.map(|c| c.late_sig_pct),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns the stored slope and significance label for a risk factor.
    pub fn get_trend(
        &self,
        source: &str,
        risk_factor: &str,
    ) -> Result<Option<(Option<f64>, String)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT slope, significance FROM trend_results WHERE source = ?1 AND risk_factor = ?2",
        )?;
        let mut rows = stmt.query(params![source, risk_factor])?;
        if let Some(row) = rows.next()? {
            Ok(Some((row.get(0)?, row.get(1)?)))
        } else {
            Ok(None)
        }
    }

    pub fn record_run(&self, run: &RunRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO runs (source, rows, no_fit, parse_failures, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &run.source,
                run.rows as i64,
                run.no_fit as i64,
                run.parse_failures as i64,
                &run.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent run for a source, if any.
    pub fn last_run(&self, source: &str) -> Result<Option<RunRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT rows, no_fit, parse_failures, finished_at FROM runs
             WHERE source = ?1 ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![source])?;
        if let Some(row) = rows.next()? {
            let finished_at: String = row.get(3)?;
            let finished_at = finished_at
                .parse()
                .map_err(|e| StorageError::InvalidValue(format!("finished_at: {}", e)))?;
            Ok(Some(RunRecord {
                source: source.to_string(),
                rows: row.get::<_, i64>(0)? as usize,
                no_fit: row.get::<_, i64>(1)? as usize,
                parse_failures: row.get::<_, i64>(2)? as usize,
                finished_at,
            }))
        } else {
            Ok(None)
        }
    }

    fn map_observation(row: &Row) -> Result<StoredObservation, rusqlite::Error> {
        let risk_factor: String = row.get(0)?;
        let code: String = row.get(1)?;
        let age: u32 = row.get(2)?;
        let coefficient: Option<f64> = row.get(3)?;

        let Some(coefficient) = coefficient else {
            return Ok(StoredObservation::NoFit(NoFitEntry { code, risk_factor, age }));
        };

        let fit = ModelFit {
            coefficient,
            ci_lower: row.get(4)?,
            ci_upper: row.get(5)?,
            p_value: row.get(6)?,
            r_squared: row.get(7)?,
            sample_size: row.get(8)?,
            missing_count: row.get(9)?,
        };
        let stored_tier: String = row.get(10)?;
        let tier = significance_tier(Some(fit.p_value));
        if stored_tier != tier.as_str() {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                10,
                rusqlite::types::Type::Text,
                format!("tier `{}` does not match p-value {}", stored_tier, fit.p_value).into(),
            ));
        }

        Ok(StoredObservation::Fitted(NormalizedRow {
            code,
            risk_factor,
            age,
            significant: is_significant(Some(fit.p_value)),
            tier,
            fit,
        }))
    }
}

enum StoredObservation {
    Fitted(NormalizedRow),
    NoFit(NoFitEntry),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EarlyLateContrast, LinearFit, TrendDirection, TrendSignificance};
    use chrono::Utc;

    fn table() -> NormalizedTable {
        NormalizedTable {
            rows: vec![NormalizedRow {
                code: "bmi".into(),
                risk_factor: "Body Mass Index".into(),
                age: 9,
                fit: ModelFit {
                    coefficient: -0.0123,
                    ci_lower: -0.02,
                    ci_upper: -0.004,
                    p_value: 0.002,
                    r_squared: 0.03,
                    sample_size: 4500,
                    missing_count: 300,
                },
                significant: true,
                tier: SignificanceTier::Medium,
            }],
            no_fit: vec![NoFitEntry {
                code: "bmi".into(),
                risk_factor: "Body Mass Index".into(),
                age: 10,
            }],
        }
    }

    #[test]
    fn test_table_round_trip() {
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        storage.save_table("a.csv", &table()).unwrap();
        assert_eq!(storage.load_table("a.csv").unwrap(), table());
        assert!(storage.load_table("b.csv").unwrap().is_empty());
    }

    #[test]
    fn test_save_table_replaces_previous_run() {
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        storage.save_table("a.csv", &table()).unwrap();
        storage.save_table("a.csv", &table()).unwrap();
        let loaded = storage.load_table("a.csv").unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.no_fit.len(), 1);
    }

    #[test]
    fn test_trends_are_stored() {
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        let trends = vec![
            TrendResult {
                risk_factor: "Insulin".into(),
                n: 2,
                fit: None,
                direction: None,
                significance: TrendSignificance::InsufficientData,
                contrast: None,
            },
            TrendResult {
                risk_factor: "Triglycerides".into(),
                n: 8,
                fit: Some(LinearFit {
                    slope: 0.002,
                    intercept: -0.03,
                    r_value: 0.7,
                    r_squared: 0.49,
                    p_value: 0.03,
                    std_err: 0.0007,
                }),
                direction: Some(TrendDirection::Increasing),
                significance: TrendSignificance::Significant,
                contrast: Some(EarlyLateContrast {
                    early_mean: Some(-0.01),
                    late_mean: None,
                    early_late_diff: None,
                    early_sig_pct: 25.0,
                    late_sig_pct: 0.0,
                }),
            },
        ];
        storage.save_trends("a.csv", &trends).unwrap();
        assert_eq!(
            storage.get_trend("a.csv", "Insulin").unwrap(),
            Some((None, "insufficient data".to_string()))
        );
        assert_eq!(
            storage.get_trend("a.csv", "Triglycerides").unwrap(),
            Some((Some(0.002), "significant".to_string()))
        );
        assert_eq!(storage.get_trend("a.csv", "Missing").unwrap(), None);
    }

    #[test]
    fn test_runs_are_recorded() {
        let storage = SqliteStorage::new(":memory:").unwrap();
        assert!(storage.last_run("a.csv").unwrap().is_none());
        let run = RunRecord {
            source: "a.csv".into(),
            rows: 80,
            no_fit: 6,
            parse_failures: 1,
            finished_at: Utc::now(),
        };
        storage.record_run(&run).unwrap();
        let last = storage.last_run("a.csv").unwrap().unwrap();
        assert_eq!(last.rows, 80);
        assert_eq!(last.no_fit, 6);
        assert_eq!(last.parse_failures, 1);
        assert_eq!(last.finished_at, run.finished_at);
    }

    #[test]
    fn test_colliding_rows_are_all_kept() {
        let fitted = |code: &str, age: u32, coefficient: f64| NormalizedRow {
            code: code.into(),
            risk_factor: "Diastolic Blood Pressure".into(),
            age,
            fit: ModelFit {
                coefficient,
                ci_lower: coefficient - 0.01,
                ci_upper: coefficient + 0.01,
                p_value: 0.2,
                r_squared: 0.01,
                sample_size: 1000,
                missing_count: 5,
            },
            significant: false,
            tier: SignificanceTier::None,
        };
        let table = NormalizedTable {
            rows: vec![fitted("bp_dia", 9, 0.1), fitted("bp_dia", 9, 0.2), fitted("bp_di", 10, 0.3)],
            no_fit: vec![NoFitEntry {
                code: "bp_dia".into(),
                risk_factor: "Diastolic Blood Pressure".into(),
                age: 10,
            }],
        };
        let mut storage = SqliteStorage::new(":memory:").unwrap();
        storage.save_table("a.csv", &table).unwrap();
        let loaded = storage.load_table("a.csv").unwrap();
        assert_eq!(loaded.rows.len(), 3);
        assert_eq!(loaded.no_fit.len(), 1);
        assert_eq!(loaded, table);
    }
}
