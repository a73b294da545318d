use chrono::Utc;
use clap::Parser;
use cvrisk_trends::analyzer::{Analyzer, AnalyzerImpl};
use cvrisk_trends::config::{load_config, AppConfig};
use cvrisk_trends::model::{OutputError, RunRecord};
use cvrisk_trends::normalizer::Normalizer;
use cvrisk_trends::parser::RegressionLogParser;
use cvrisk_trends::storage::SqliteStorage;
use cvrisk_trends::tables::{detail_tables, summary_rows};
use cvrisk_trends::utils::{output_slugs, to_snake_case};
use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cvrisk-trends", version, about = "Developmental trends in risk-factor regressions")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Input files to analyze instead of the configured ones
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Directory for the JSON tables
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut config: AppConfig = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !cli.input.is_empty() {
        config.inputs = cli.input;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    let config = Arc::new(config);

    let storage = match SqliteStorage::new(&config.database_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let parser = RegressionLogParser::new();
    let normalizer = config.normalizer();
    let analyzer = AnalyzerImpl::new();

    info!("Inputs to process: {}", config.inputs.len());
    let slugs = output_slugs(&config.inputs);
    let tasks: Vec<_> = config
        .inputs
        .iter()
        .zip(slugs.iter())
        .map(|(input, slug)| {
            process_input(
                input,
                slug,
                &parser,
                &normalizer,
                &analyzer,
                storage.clone(),
                config.clone(),
            )
        })
        .collect();
    let outcomes = join_all(tasks).await;

    let failed = outcomes.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        error!("{} of {} input(s) failed", failed, outcomes.len());
        return ExitCode::FAILURE;
    }
    info!("All inputs processed");
    ExitCode::SUCCESS
}

/// Runs the whole pipeline for one input file. Returns `false` if the input
/// could not be read, written out or stored.
async fn process_input(
    input: &Path,
    slug: &str,
    parser: &RegressionLogParser,
    normalizer: &Normalizer,
    analyzer: &AnalyzerImpl,
    storage: Arc<Mutex<SqliteStorage>>,
    config: Arc<AppConfig>,
) -> bool {
    let source = input.display().to_string();
    info!("Processing input: {}", source);

    {
        let storage_guard = storage.lock().await;
        if let Ok(Some(prev)) = storage_guard.last_run(&source) {
            info!(
                "Previous run: {} rows, {} without fit | Finished: {}",
                prev.rows, prev.no_fit, prev.finished_at
            );
        }
    }

    let text = match tokio::fs::read_to_string(input).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to read {}: {}", source, e);
            return false;
        }
    };

    info!("Parsing regression log...");
    let document = parser.parse_document(&text);
    for failure in &document.failures {
        warn!("Parse error: {}", failure);
    }
    info!(
        "Parsed {} block(s), {} failed",
        document.blocks.len(),
        document.failures.len()
    );

    let table = normalizer.normalize(&document.blocks);
    info!("Normalized {} rows, {} without fit", table.rows.len(), table.no_fit.len());
    if table.rows.is_empty() {
        warn!("No fitted observations in {}", source);
    }

    let analysis = analyzer.analyze(&table);

    let out_dir = config.output_dir.join(slug);
    if let Err(e) = tokio::fs::create_dir_all(&out_dir).await {
        warn!("Failed to create output folder {}: {}", out_dir.display(), e);
        return false;
    }

    let mut written = true;
    for detail in detail_tables(&document.blocks) {
        let name = format!("{}_results", to_snake_case(&detail.code));
        written &= save_table(&out_dir, &name, &detail.rows).await;
    }
    written &= save_table(&out_dir, "all_results_summary", &summary_rows(&table)).await;
    written &= save_table(&out_dir, "completeness", &analysis.completeness).await;
    written &= save_table(&out_dir, "by_age", &analysis.aggregates.by_age).await;
    written &= save_table(&out_dir, "by_risk_factor", &analysis.aggregates.by_risk_factor).await;
    written &= save_table(&out_dir, "by_period", &analysis.aggregates.by_period).await;
    written &= save_table(
        &out_dir,
        "by_risk_factor_period",
        &analysis.aggregates.by_risk_factor_period,
    )
    .await;
    written &= save_table(&out_dir, "by_category", &analysis.aggregates.by_category).await;
    written &= save_table(
        &out_dir,
        "by_category_period",
        &analysis.aggregates.by_category_period,
    )
    .await;
    written &= save_table(&out_dir, "age_profiles", &analysis.age_profiles).await;
    written &= save_table(&out_dir, "significance_trend", &analysis.significance_trend).await;
    written &= save_table(&out_dir, "trend_summary", &analysis.trends).await;
    written &= save_table(&out_dir, "category_trends", &analysis.category_trends).await;
    written &= save_table(&out_dir, "trend_findings", &analysis.findings).await;

    info!("Saving results to storage...");
    let mut storage_guard = storage.lock().await;
    if let Err(e) = storage_guard.save_table(&source, &table) {
        warn!("DB save error: {}", e);
        return false;
    }
    if let Err(e) = storage_guard.save_trends(&source, &analysis.trends) {
        warn!("Trend save error: {}", e);
        return false;
    }
    let run = RunRecord {
        source: source.clone(),
        rows: table.rows.len(),
        no_fit: table.no_fit.len(),
        parse_failures: document.failures.len(),
        finished_at: Utc::now(),
    };
    if let Err(e) = storage_guard.record_run(&run) {
        warn!("Run record failed: {}", e);
    }

    info!("Finished processing input: {}", source);
    written
}

/// Writes one table as pretty JSON, logging the outcome.
async fn save_table<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> bool {
    match write_json(dir, name, value).await {
        Ok(path) => {
            info!("Saved table: {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to save {}: {}", name, e);
            false
        }
    }
}

async fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<PathBuf, OutputError> {
    let json = serde_json::to_string_pretty(value)?;
    let path = dir.join(format!("{}.json", name));
    tokio::fs::write(&path, json).await?;
    Ok(path)
}
