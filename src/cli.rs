use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    analysis::{self, AnalysisError},
    cleanup::UploadGuard,
    loader::LoadOutcome,
    report::{AnalysisReport, InputInfo, RunReport},
    sniff,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Repair VCF/BCF files and compute variant summary statistics", long_about = None)]
struct Cli {
    /// Logging verbosity (e.g. error, warn, info, debug)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that a file can be read, repairing it if needed
    Validate {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Accept inputs without a .vcf, .vcf.gz or .bcf suffix
        #[arg(long)]
        force: bool,
    },
    /// Compute distributions and summary statistics
    Analyze {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Write the JSON report here instead of stdout (single input only)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Size of the worker pool for multiple inputs
        #[arg(long)]
        workers: Option<usize>,

        /// Delete each input and its repaired copy once analysed
        #[arg(long)]
        remove_input: bool,

        /// Include raw distributions in the report
        #[arg(long)]
        include_raw: bool,

        /// Accept inputs without a .vcf, .vcf.gz or .bcf suffix
        #[arg(long)]
        force: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    execute(cli.command)
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Validate { input, force } => {
            check_upload_name(&input, force)?;
            let _repaired = UploadGuard::repaired_copy(&input);
            let result = analysis::validate(&input);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.valid {
                bail!("{} is not a readable variant file", input.display());
            }
        }
        Command::Analyze {
            inputs,
            output,
            workers,
            remove_input,
            include_raw,
            force,
        } => {
            for input in &inputs {
                check_upload_name(input, force)?;
            }
            if output.is_some() && inputs.len() > 1 {
                bail!("--output requires a single input");
            }

            let workers = workers.unwrap_or_else(analysis::default_workers);
            // Repaired copies outlive the batch only until the reports are written.
            let _repaired: Vec<UploadGuard> = if remove_input {
                Vec::new()
            } else {
                inputs.iter().map(|input| UploadGuard::repaired_copy(input)).collect()
            };
            let results = if remove_input {
                analysis::process_upload_batch(&inputs, workers)
            } else {
                analysis::analyze_batch(&inputs, workers)
            }
            .context("failed to start worker pool")?;

            let mut failures = 0usize;
            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok((outcome, report)) => {
                        emit_report(input, &outcome, &report, include_raw, output.as_deref())?
                    }
                    Err(e) => {
                        failures += 1;
                        report_failure(input, &e);
                    }
                }
            }

            if failures > 0 {
                bail!("{failures} of {} inputs failed", inputs.len());
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn check_upload_name(path: &Path, force: bool) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !force && !sniff::is_allowed_upload(&name) {
        bail!(
            "{} does not look like a variant file (expected .vcf, .vcf.gz or .bcf; use --force to override)",
            path.display()
        );
    }
    Ok(())
}

fn emit_report(
    input: &Path,
    outcome: &LoadOutcome,
    report: &AnalysisReport,
    include_raw: bool,
    output: Option<&Path>,
) -> Result<()> {
    if report.is_empty() {
        tracing::warn!(path = %input.display(), "input contains no records");
    }
    let info = InputInfo::new(input, outcome);
    emit(RunReport::new(info, report, include_raw), output)
}

fn emit(run_report: RunReport<'_>, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => run_report
            .write(path)
            .with_context(|| format!("failed to write report {}", path.display())),
        None => {
            println!("{}", run_report.to_json()?);
            Ok(())
        }
    }
}

fn report_failure(input: &Path, error: &AnalysisError) {
    tracing::error!(path = %input.display(), "analysis failed");
    eprintln!("{}: {error}", input.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_with_flags() {
        let cli = Cli::parse_from([
            "variant_stats",
            "analyze",
            "a.vcf",
            "b.vcf.gz",
            "--workers",
            "2",
            "--include-raw",
        ]);
        match cli.command {
            Command::Analyze {
                inputs,
                workers,
                include_raw,
                remove_input,
                ..
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.vcf"), PathBuf::from("b.vcf.gz")]);
                assert_eq!(workers, Some(2));
                assert!(include_raw);
                assert!(!remove_input);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::parse_from(["variant_stats", "validate", "x.vcf", "--log-level", "debug"]);
        assert_eq!(cli.log_level, "debug");
    }

    const SPACED: &str = "##fileformat=VCFv4.2\n#CHROM POS ID REF ALT QUAL FILTER INFO\n1 100 . A G 50 PASS DP=10\n";

    #[test]
    fn analyze_removes_repaired_copy_but_keeps_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("spaced.vcf");
        let report = dir.path().join("report.json");
        std::fs::write(&input, SPACED).unwrap();

        execute(Command::Analyze {
            inputs: vec![input.clone()],
            output: Some(report.clone()),
            workers: None,
            remove_input: false,
            include_raw: false,
            force: false,
        })
        .unwrap();

        assert!(input.exists());
        assert!(!crate::repair::repaired_path(&input).exists());
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["input"]["repaired"], true);
        assert_eq!(json["analysis"]["record_count"], 1);
    }

    #[test]
    fn validate_removes_repaired_copy() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("spaced.vcf");
        std::fs::write(&input, SPACED).unwrap();

        execute(Command::Validate {
            input: input.clone(),
            force: false,
        })
        .unwrap();

        assert!(input.exists());
        assert!(!crate::repair::repaired_path(&input).exists());
    }

    #[test]
    fn remove_input_honours_worker_pool() {
        let dir = tempfile::TempDir::new().unwrap();
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("upload_{i}.vcf"));
                std::fs::write(&path, SPACED).unwrap();
                path
            })
            .collect();

        execute(Command::Analyze {
            inputs: inputs.clone(),
            output: None,
            workers: Some(2),
            remove_input: true,
            include_raw: false,
            force: false,
        })
        .unwrap();

        for input in &inputs {
            assert!(!input.exists());
            assert!(!crate::repair::repaired_path(input).exists());
        }
    }

    #[test]
    fn rejects_unknown_suffix_without_force() {
        assert!(check_upload_name(Path::new("notes.txt"), false).is_err());
        assert!(check_upload_name(Path::new("notes.txt"), true).is_ok());
        assert!(check_upload_name(Path::new("calls.vcf.gz"), false).is_ok());
    }
}
