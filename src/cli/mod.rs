//! Command-line interface for the cleaning and preparation stages

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::pipeline::{CleaningReport, CleaningStage, PreparationReport, PreparationStage};
use crate::preprocessing::PipelineConfig;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_item(msg: &str) {
    println!("    {} {}", accent("›"), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none found".to_string()
    } else {
        items.join(", ")
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cicflow-prep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Condition CICIDS flow captures into balanced, scaled training artifacts")]
#[command(long_about = None)]
pub struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest, sanitize and prune the raw captures into the cleaned artifact
    Clean {
        /// Directory holding the raw capture files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Print the class dictionary of the cleaned artifact
    Classes,

    /// Encode, split, balance and scale the cleaned artifact
    Prepare {
        /// Directory receiving the prepared artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Clean, then prepare
    Run {
        /// Directory holding the raw capture files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Directory receiving the prepared artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load_toml(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::new(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn cmd_clean(mut config: PipelineConfig, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(dir) = data_dir {
        config.cleaning.data_dir = dir;
    }

    let stage = CleaningStage::new(config.cleaning);
    let report = stage.run().context("cleaning stage failed")?;
    print_cleaning(&report);
    Ok(())
}

pub fn cmd_classes(config: PipelineConfig) -> anyhow::Result<()> {
    let stage = PreparationStage::new(config.preparation);
    let dictionary = stage.list_classes().context("listing classes failed")?;

    section("Classes");
    for (code, name) in dictionary.iter() {
        step_item(&format!("Class {} -> {}", code, name));
    }
    println!();
    Ok(())
}

pub fn cmd_prepare(mut config: PipelineConfig, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(dir) = output_dir {
        config.preparation.output_dir = dir;
    }

    let stage = PreparationStage::new(config.preparation);
    let report = stage.run().context("preparation stage failed")?;
    print_preparation(&report);
    Ok(())
}

pub fn cmd_run(
    mut config: PipelineConfig,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = data_dir {
        config.cleaning.data_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.preparation.output_dir = dir;
    }
    config.preparation.input = config.cleaning.output.clone();

    let cleaning = CleaningStage::new(config.cleaning).run().context("cleaning stage failed")?;
    print_cleaning(&cleaning);

    let preparation = PreparationStage::new(config.preparation)
        .run()
        .context("preparation stage failed")?;
    print_preparation(&preparation);
    Ok(())
}

fn print_cleaning(report: &CleaningReport) {
    section("Cleaning");
    for file in &report.ingest.files {
        let name = file.path.display().to_string();
        match file.rows {
            Some(rows) => step_item(&kv(&name, &format!("{} rows", rows))),
            None => step_item(&format!("{} {}", muted(&name), "skipped".yellow())),
        }
    }
    println!("  {}", kv("Unified", &format!("{} rows x {} columns", report.ingest.rows, report.ingest.columns)));
    println!("  {}", kv("Rows removed", &report.sanitize.rows_removed.to_string()));
    println!("  {}", kv("Zero variance", &list_or_none(&report.prune.auto_removed)));
    println!("  {}", kv("Manual", &list_or_none(&report.prune.manual_removed)));
    if !report.prune.non_numeric_removed.is_empty() {
        println!("  {}", kv("Non-numeric", &report.prune.non_numeric_removed.join(", ")));
    }
    println!("  {}", kv("Final", &format!("{} rows x {} columns", report.rows, report.columns)));
    step_ok(&format!(
        "Saved {} {}",
        report.output.display(),
        dim(&format!("({:.2}s)", report.elapsed_secs))
    ));
}

fn print_preparation(report: &PreparationReport) {
    section("Preparation");
    println!("  {}", kv("Classes", &report.classes.len().to_string()));
    println!("  {}", kv("Features", &report.features.len().to_string()));
    println!("  {}", kv("Train rows", &report.train_rows.to_string()));
    println!("  {}", kv("Test rows", &report.test_rows.to_string()));

    println!();
    println!("  {:<32} {:>10} {:>10}", muted("class"), muted("before"), muted("after"));
    for (before, after) in report.before_balancing.iter().zip(&report.after_balancing) {
        println!("  {:<32} {:>10} {:>10}", before.label, before.count, after.count);
    }
    println!();

    for path in &report.artifacts {
        step_ok(&format!("Saved {}", path.display()));
    }
    println!("  {}", dim(&format!("finished in {:.2}s", report.elapsed_secs)));
}
