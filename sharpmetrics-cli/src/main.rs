//! sharpmetrics CLI - object-oriented metrics and code smells for C#

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Results go to stdout (or --output); progress and logs go to stderr

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sharpmetrics_core::config::{self, ResolvedConfig};
use sharpmetrics_core::smells::{self, select_rules};
use sharpmetrics_core::{
    read_annotations, render_console, render_json, save_to_file, write_csv,
    ClassMetricCalculator, MethodMetricCalculator, MetricCalculator, MetricRecord,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sharpmetrics")]
#[command(about = "Object-oriented metrics and code smell detection for C# projects")]
#[command(version = env!("SHARPMETRICS_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one row of class metrics per class
    Classes {
        /// Solution, project, source file or directory
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compute one row of method metrics per method
    Methods {
        /// Solution, project, source file or directory
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// CSV of labelled methods; only those methods are measured
        #[arg(long)]
        annotations: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Report code smells
    Smells {
        /// Solution, project, source file or directory
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Run only these rules (repeatable; default: all)
        #[arg(
            long = "rule",
            value_parser = ["feature-envy", "refused-bequest", "data-class", "method-call"]
        )]
        rules: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: SmellFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format
    #[arg(long, default_value = "csv")]
    format: MetricFormat,

    /// Write to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MetricFormat {
    Csv,
    Console,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SmellFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG applies only without -v
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classes { paths, output } => {
            let config = load_config(&paths, output.config.as_deref())?;
            let calculator = ClassMetricCalculator::new(config);
            let records = with_spinner(&paths, "Measuring classes", || {
                calculator.calculate_many(&paths)
            });
            emit_records(&records, &output)?;
        }
        Commands::Methods {
            paths,
            annotations,
            output,
        } => {
            let config = load_config(&paths, output.config.as_deref())?;
            let annotations = annotations
                .map(|path| {
                    read_annotations(
                        &path,
                        &config.annotation_id_column,
                        &config.annotation_label_column,
                    )
                })
                .transpose()?;
            let calculator = MethodMetricCalculator::new(config, annotations);
            let records = with_spinner(&paths, "Measuring methods", || {
                calculator.calculate_many(&paths)
            });
            emit_records(&records, &output)?;
        }
        Commands::Smells {
            paths,
            rules,
            format,
            config: config_path,
        } => {
            let config = load_config(&paths, config_path.as_deref())?;
            let rules = select_rules(&rules)?;
            let diagnostics = with_spinner(&paths, "Detecting smells", || {
                let mut diagnostics = Vec::new();
                for path in &paths {
                    match smells::detect_smells(path, &rules, &config) {
                        Ok(found) => diagnostics.extend(found),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "skipping path")
                        }
                    }
                }
                diagnostics
            });
            match format {
                SmellFormat::Text => print!("{}", smells::render_text(&diagnostics)),
                SmellFormat::Json => println!("{}", smells::render_json(&diagnostics)?),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Config discovered next to the first path, unless given explicitly
fn load_config(paths: &[PathBuf], explicit: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let anchor = paths.first().and_then(|path| {
        if path.is_dir() {
            Some(path.clone())
        } else {
            path.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
        }
    });
    let root = match anchor {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let resolved =
        config::load_and_resolve(&root, explicit).context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn with_spinner<T>(paths: &[PathBuf], label: &str, work: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{} in {} path(s)", label, paths.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = work();
    spinner.finish_and_clear();
    result
}

fn emit_records<R: MetricRecord>(records: &[R], args: &OutputArgs) -> anyhow::Result<()> {
    match (args.format, &args.output) {
        (MetricFormat::Csv, Some(path)) => {
            save_to_file(records, path)?;
            if !records.is_empty() {
                eprintln!("Wrote {} row(s) to {}", records.len(), path.display());
            }
        }
        (MetricFormat::Csv, None) => write_csv(records, std::io::stdout().lock())?,
        (MetricFormat::Console, output) => write_text(&render_console(records), output.as_deref())?,
        (MetricFormat::Json, output) => write_text(&render_json(records)?, output.as_deref())?,
    }
    Ok(())
}

fn write_text(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write output file: {}", path.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Smells:");
    println!("  feature_envy_threshold: {}", resolved.feature_envy_threshold);
    println!(
        "  system_assembly_prefixes: {}",
        resolved.system_assembly_prefixes.join(", ")
    );
    println!();
    println!("Annotations:");
    println!("  id_column: {}", resolved.annotation_id_column);
    println!("  label_column: {}", resolved.annotation_label_column);
    println!();
    println!("Filters:");
    println!(
        "  include: {}",
        if resolved.include.is_some() {
            "custom patterns"
        } else {
            "all files"
        }
    );
    println!(
        "  exclude: active ({} patterns)",
        if resolved.config_path.is_some() {
            "custom"
        } else {
            "default"
        }
    );
}
