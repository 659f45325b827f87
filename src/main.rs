use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use aerors::import::ImportManager;
use aerors::logging::{init_logging, LogLevel};
use aerors::{
    AccuracyLevel, AeroAnalysis, AeroAnalyzer, AeroRsError, AppConfig, CdaAssessment,
    NormalizedPowerCalculator, NormalizedPowerConfig, ReferenceCda,
};

/// aerors - Cycling aerodynamics analysis CLI
///
/// Splits measured power into aerodynamic, rolling and gravitational demand,
/// estimates CdA by regression and checks the model against measured power.
#[derive(Parser)]
#[command(name = "aerors")]
#[command(author = "aerors Contributors")]
#[command(version)]
#[command(about = "Cycling aerodynamics analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one activity file
    Analyze {
        /// Input file path (CSV)
        #[arg(short, long)]
        file: PathBuf,

        /// Reference CdA in m² to cross-validate the estimate against
        #[arg(short, long)]
        reference_cda: Option<f64>,

        /// Write the full analysis as JSON to this path
        #[arg(long, value_name = "OUT")]
        json: Option<PathBuf>,
    },

    /// Analyze every activity file in a directory in parallel
    Batch {
        /// Directory to scan
        #[arg(short, long)]
        dir: PathBuf,

        /// Write all successful analyses as a JSON array to this path
        #[arg(long, value_name = "OUT")]
        json: Option<PathBuf>,
    },

    /// Compute Normalized Power of an activity file
    Np {
        /// Input file path (CSV)
        #[arg(short, long)]
        file: PathBuf,

        /// Rolling window in samples
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Show or create the configuration file
    Config {
        /// Print the effective configuration as TOML
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,

        /// Overwrite an existing file on --init
        #[arg(long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: &str, value: String) -> Self {
        Self {
            metric: metric.to_string(),
            value,
        }
    }
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "CdA (m²)")]
    cda: String,
    #[tabled(rename = "R²")]
    r_squared: String,
    #[tabled(rename = "MAE (W)")]
    mae: String,
    #[tabled(rename = "NP (W)")]
    np: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };
    config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Analyze {
            file,
            reference_cda,
            json,
        } => {
            let activity = import_single(&file)?;
            let analyzer = AeroAnalyzer::from_config(&config);

            let analysis = match reference_cda {
                Some(value) => {
                    analyzer.analyze_with_reference(&activity, Some(ReferenceCda::supplied(value)))
                }
                None => analyzer.analyze(&activity),
            }
            .map_err(|e| anyhow::anyhow!(AeroRsError::from(e).user_message()))
            .with_context(|| format!("Analysis of {} failed", file.display()))?;

            print_analysis(&analysis);

            if let Some(out) = json {
                write_json(&out, &analysis)?;
            }
        }

        Commands::Batch { dir, json } => {
            let manager = ImportManager::new();
            let imports = manager.import_directory(&dir, true)?;

            let mut activities = Vec::new();
            for import in imports {
                match import.result {
                    Ok(mut found) => activities.append(&mut found),
                    Err(e) => eprintln!(
                        "{} {}: {}",
                        "✗".red(),
                        import.file_path.display(),
                        AeroRsError::from(e).user_message()
                    ),
                }
            }

            let analyzer = AeroAnalyzer::from_config(&config);
            let results = analyzer.analyze_batch(&activities);

            let mut rows = Vec::new();
            let mut succeeded = Vec::new();
            for (activity, result) in activities.iter().zip(results) {
                match result {
                    Ok(analysis) => {
                        rows.push(BatchRow {
                            activity: activity.id.clone(),
                            cda: format!("{:.3}", analysis.regression.cda_estimate_m2),
                            r_squared: format!("{:.3}", analysis.regression.r_squared),
                            mae: format!("{:.1}", analysis.validation.mean_absolute_error_w),
                            np: analysis
                                .power_summary
                                .map(|s| format!("{:.0}", s.normalized_power_w))
                                .unwrap_or_else(|| "-".to_string()),
                            accuracy: colorize_accuracy(analysis.accuracy),
                        });
                        succeeded.push(analysis);
                    }
                    Err(e) => eprintln!(
                        "{} {}: {}",
                        "✗".red(),
                        activity.id,
                        AeroRsError::from(e).user_message()
                    ),
                }
            }

            println!("{}", "Batch analysis".cyan().bold());
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!(
                "{} of {} activities analyzed",
                succeeded.len().to_string().green(),
                activities.len()
            );

            if let Some(out) = json {
                write_json(&out, &succeeded)?;
            }
        }

        Commands::Np { file, window } => {
            let activity = import_single(&file)?;
            let np_config = window
                .map(NormalizedPowerConfig::with_window)
                .unwrap_or(config.normalized_power);
            np_config.validate().map_err(AeroRsError::Validation)?;

            let summary =
                NormalizedPowerCalculator::summarize(&activity.power_series(), &np_config)
                    .with_context(|| format!("No power samples in {}", file.display()))?;

            let rows = vec![
                MetricRow::new("Samples", summary.sample_count.to_string()),
                MetricRow::new("Window", format!("{} samples", np_config.window)),
                MetricRow::new("Average power", format!("{:.1} W", summary.average_power_w)),
                MetricRow::new(
                    "Normalized Power",
                    format!("{:.1} W", summary.normalized_power_w),
                ),
                MetricRow::new(
                    "Variability index",
                    summary
                        .variability_index
                        .map(|vi| format!("{:.3}", vi))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ];
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Config { show, init, force } => {
            if init {
                let target = cli
                    .config
                    .clone()
                    .unwrap_or_else(AppConfig::default_config_path);
                if target.exists() && !force {
                    anyhow::bail!(
                        "Config file already exists: {} (use --force to overwrite)",
                        target.display()
                    );
                }
                let mut fresh = AppConfig::default();
                let path = match &cli.config {
                    Some(path) => {
                        fresh.save_to_file(path)?;
                        path.clone()
                    }
                    None => fresh.save_default()?,
                };
                println!("{} {}", "✓ Wrote".green(), path.display());
            }
            if show || !init {
                let content = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{}", content);
            }
        }
    }

    Ok(())
}

fn import_single(file: &Path) -> Result<aerors::Activity> {
    let mut activities = ImportManager::new()
        .import_file(file)
        .map_err(|e| anyhow::anyhow!(AeroRsError::from(e).user_message()))
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if activities.is_empty() {
        anyhow::bail!("No activities found in {}", file.display());
    }
    Ok(activities.remove(0))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} {}", "✓ JSON written to".green(), path.display());
    Ok(())
}

fn colorize_accuracy(level: AccuracyLevel) -> String {
    match level {
        AccuracyLevel::Excellent => level.to_string().green().to_string(),
        AccuracyLevel::Good => level.to_string().yellow().to_string(),
        AccuracyLevel::Acceptable => level.to_string().red().to_string(),
    }
}

fn colorize_assessment(assessment: CdaAssessment) -> String {
    match assessment {
        CdaAssessment::Excellent | CdaAssessment::VeryGood => {
            assessment.to_string().green().to_string()
        }
        CdaAssessment::Good => assessment.to_string().yellow().to_string(),
        CdaAssessment::NeedsImprovement => assessment.to_string().red().to_string(),
    }
}

fn print_analysis(analysis: &AeroAnalysis) {
    println!(
        "{} {}",
        "Aerodynamic analysis:".cyan().bold(),
        analysis.activity_id
    );

    let breakdown = &analysis.breakdown;
    let mut rows = vec![
        MetricRow::new("Moving samples", breakdown.moving_samples.to_string()),
        MetricRow::new(
            "Aero power",
            format!("{:.1} W ({:.1} %)", breakdown.avg_aero_w, breakdown.aero_pct),
        ),
        MetricRow::new(
            "Rolling power",
            format!("{:.1} W ({:.1} %)", breakdown.avg_rolling_w, breakdown.rolling_pct),
        ),
        MetricRow::new(
            "Gravity power",
            format!("{:.1} W ({:.1} %)", breakdown.avg_gravity_w, breakdown.gravity_pct),
        ),
        MetricRow::new("Measured power", format!("{:.1} W", breakdown.avg_measured_w)),
        MetricRow::new(
            "CdA source",
            format!("{:?} ({} sensor samples)", breakdown.cda_source, breakdown.sensor_cda_samples),
        ),
    ];

    if let Some(summary) = &analysis.power_summary {
        rows.push(MetricRow::new(
            "Normalized Power",
            format!("{:.1} W", summary.normalized_power_w),
        ));
    }

    let regression = &analysis.regression;
    rows.push(MetricRow::new(
        "CdA estimate",
        if regression.clamped {
            format!(
                "{:.3} m² (clamped from {:.3})",
                regression.cda_estimate_m2, regression.unclamped_cda_m2
            )
        } else {
            format!("{:.3} m²", regression.cda_estimate_m2)
        },
    ));
    rows.push(MetricRow::new("R²", format!("{:.3}", regression.r_squared)));
    rows.push(MetricRow::new(
        "Regression samples",
        regression.sample_count.to_string(),
    ));

    let validation = &analysis.validation;
    rows.push(MetricRow::new(
        "MAE / RMSE",
        format!(
            "{:.1} W / {:.1} W",
            validation.mean_absolute_error_w, validation.rmse_w
        ),
    ));
    rows.push(MetricRow::new(
        "Within 5/10/20 W",
        format!(
            "{:.1} % / {:.1} % / {:.1} %",
            validation.coverage_within_5w,
            validation.coverage_within_10w,
            validation.coverage_within_20w
        ),
    ));
    rows.push(MetricRow::new(
        "Correlation",
        validation
            .correlation
            .map(|r| format!("{:.3}", r))
            .unwrap_or_else(|| "undefined".to_string()),
    ));
    rows.push(MetricRow::new(
        "Model accuracy",
        colorize_accuracy(analysis.accuracy),
    ));

    if let (Some(reference), Some(cross)) = (&analysis.reference, &analysis.cross_validation) {
        rows.push(MetricRow::new(
            "Reference CdA",
            format!("{:.3} m² ({:?})", reference.cda_m2, reference.source),
        ));
        rows.push(MetricRow::new(
            "CdA error",
            format!(
                "{:.4} m² ({:.1} %)",
                cross.absolute_error_m2, cross.relative_error_pct
            ),
        ));
        rows.push(MetricRow::new(
            "CdA assessment",
            colorize_assessment(cross.assessment),
        ));
    }

    println!("{}", Table::new(rows).with(Style::rounded()));
}
