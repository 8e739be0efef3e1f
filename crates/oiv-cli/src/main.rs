//! OIV - Outcome Integrity Verification CLI
//!
//! The `oiv` command runs the verifier's stateless checks against local
//! files and replays recorded measurements through the alignment analyzer.
//!
//! ## Commands
//!
//! - `scan`: Scan a change set for test-subverting code patterns
//! - `slop`: Score text for filler language
//! - `analyze`: Analyze proxy/outcome alignment of recorded measurements

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use oiv_core::metrics::METRICS;
use oiv_core::{
    report_block_reason, write_report, FileToScan, IntegrityContext, IntegrityReport, LogFormat,
    MeasurementInput, OutcomeVerifier, VerifierConfig,
};

#[derive(Parser)]
#[command(name = "oiv")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Outcome Integrity Verification (OIV)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Verifier configuration (TOML)
    #[arg(long, global = true, env = "OIV_CONFIG")]
    config: Option<PathBuf>,

    /// Also write an integrity report under this directory
    #[arg(long, global = true)]
    report_dir: Option<PathBuf>,

    /// Run ID for the written report
    #[arg(long, global = true, default_value = "local")]
    run_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files for reward hacking and test subversion
    Scan {
        /// Files to scan
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Paths modified by the change set (defaults to the scanned files)
        #[arg(long, num_args = 1..)]
        modified: Vec<String>,

        /// Number of assertions the change set removed
        #[arg(long, default_value = "0")]
        assertions_removed: usize,
    },

    /// Score text for filler language (reads stdin when no file is given)
    Slop {
        /// Text file to score
        file: Option<PathBuf>,
    },

    /// Analyze recorded measurements (JSON array)
    Analyze {
        /// Path to the measurements file
        measurements: PathBuf,

        /// Restrict analysis to one tool and run test-bypass detection for it
        #[arg(long)]
        tool: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    oiv_core::init_tracing(format, level);

    let config = load_config(cli.config.as_deref())?;
    let mut verifier = OutcomeVerifier::try_new(config).context("Invalid verifier configuration")?;

    let tool = match &cli.command {
        Commands::Analyze { tool: Some(t), .. } => t.clone(),
        _ => "-".to_string(),
    };
    let mut report = IntegrityReport::new(cli.run_id.clone(), tool);

    match cli.command {
        Commands::Scan {
            files,
            modified,
            assertions_removed,
        } => cmd_scan(&verifier, &mut report, &files, modified, assertions_removed)?,
        Commands::Slop { file } => cmd_slop(&verifier, &mut report, file.as_deref())?,
        Commands::Analyze { measurements, tool } => {
            cmd_analyze(&mut verifier, &mut report, &measurements, tool.as_deref())?
        }
    }

    if let Some(dir) = &cli.report_dir {
        let path = write_report(&report, dir)
            .with_context(|| format!("Failed to write integrity report under {:?}", dir))?;
        info!(path = %path.display(), "integrity report written");
    }

    METRICS.flush();

    if let Some(reason) = report_block_reason(&report) {
        anyhow::bail!("{}", reason);
    }
    Ok(())
}

/// Defaults when no path is given.
fn load_config(path: Option<&Path>) -> Result<VerifierConfig> {
    let Some(path) = path else {
        return Ok(VerifierConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Invalid config in {:?}", path))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn scan_context(
    files: &[PathBuf],
    modified: Vec<String>,
    assertions_removed: usize,
) -> Result<IntegrityContext> {
    let files_to_scan = files
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            Ok(FileToScan::new(path.display().to_string(), content))
        })
        .collect::<Result<Vec<_>>>()?;
    let modified_files = if modified.is_empty() {
        files_to_scan.iter().map(|f| f.path.clone()).collect()
    } else {
        modified
    };
    Ok(IntegrityContext {
        files_to_scan,
        modified_files,
        assertions_removed,
    })
}

fn cmd_scan(
    verifier: &OutcomeVerifier,
    report: &mut IntegrityReport,
    files: &[PathBuf],
    modified: Vec<String>,
    assertions_removed: usize,
) -> Result<()> {
    let context = scan_context(files, modified, assertions_removed)?;
    let result = verifier.verify_reward_integrity(&context);
    print_json(&result)?;
    report.reward_integrity = Some(result);
    Ok(())
}

fn cmd_slop(
    verifier: &OutcomeVerifier,
    report: &mut IntegrityReport,
    file: Option<&Path>,
) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let result = verifier.run_slop_test(&text);
    print_json(&result)?;
    report.slop = Some(result);
    Ok(())
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    recorded: usize,
    alignment: &'a oiv_core::AlignmentAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_bypass: Option<&'a oiv_core::TestBypassResult>,
}

fn cmd_analyze(
    verifier: &mut OutcomeVerifier,
    report: &mut IntegrityReport,
    path: &Path,
    tool: Option<&str>,
) -> Result<()> {
    let inputs: Vec<MeasurementInput> = read_json_file(path)?;
    let recorded = inputs.len();
    for input in inputs {
        verifier.record_input(input);
    }

    let alignment = verifier.analyze_alignment(tool);
    let test_bypass = tool.map(|t| verifier.detect_test_bypass(t));
    print_json(&AnalyzeOutput {
        recorded,
        alignment: &alignment,
        test_bypass: test_bypass.as_ref(),
    })?;

    report.alignment = Some(alignment);
    report.test_bypass = test_bypass;
    Ok(())
}
