// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagegraft — command-line front-end.
//
// Entry point. Initialises logging, resolves paths and configuration from the
// command line, binds Pdfium and runs one content transfer.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use pagegraft_core::error::Result;
use pagegraft_core::human_errors::{HumanError, Severity, humanize_error};
use pagegraft_core::{PagegraftError, TransferConfig, TransferMode, TransferPaths};
use pagegraft_document::{ContentTransfer, PdfiumEngine, TracingObserver, TransferReport, check_inputs};

/// Background document used when `--background` is not given.
const DEFAULT_BACKGROUND: &str = "target.pdf";
/// Directory that receives outputs when `--output` is not given.
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Exit status for failures that may clear up on their own (sysexits `EX_TEMPFAIL`).
const EXIT_TEMPORARY: u8 = 75;
/// Exit status for failures the user has to fix (missing file, bad setting).
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "pagegraft")]
#[command(version)]
#[command(about = "Place the content of a PDF onto the pages of a letterhead PDF", long_about = None)]
struct Cli {
    /// PDF whose content is transferred
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Letterhead / background PDF
    #[arg(short, long, value_name = "PDF")]
    background: Option<PathBuf>,

    /// Output PDF [default: output/<source>_output.pdf]
    #[arg(short, long, value_name = "PDF")]
    output: Option<PathBuf>,

    /// Transfer mode
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// JSON file with transfer settings; individual flags override it
    #[arg(short, long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Shift content down the page by this many points
    #[arg(long, allow_negative_numbers = true)]
    vertical_offset: Option<f32>,

    /// Rasterization scale factor
    #[arg(long)]
    scale: Option<f32>,

    /// Height of the letterhead band cut from the source page, in points
    #[arg(long)]
    logo_skip_height: Option<f32>,

    #[arg(long)]
    min_font_size: Option<f32>,

    #[arg(long)]
    max_font_size: Option<f32>,

    /// Multiplier applied to every normalized font size
    #[arg(long)]
    size_scale: Option<f32>,

    /// Pixels brighter than this (0-255) become transparent
    #[arg(long)]
    background_threshold: Option<u8>,

    /// Write a JSON report of the transfer to this file
    #[arg(long, value_name = "JSON")]
    report: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Overlay a masked image of each page
    Raster,
    /// Re-insert text runs and images
    Structured,
}

impl From<Mode> for TransferMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Raster => TransferMode::Raster,
            Mode::Structured => TransferMode::Structured,
        }
    }
}

impl Cli {
    /// Defaults, then the `--config` file, then individual flags.
    fn transfer_config(&self) -> Result<TransferConfig> {
        let mut config = match &self.config {
            Some(path) => TransferConfig::from_json_file(path)?,
            None => TransferConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(v) = self.vertical_offset {
            config.vertical_offset = v;
        }
        if let Some(v) = self.scale {
            config.scale = v;
        }
        if let Some(v) = self.logo_skip_height {
            config.logo_skip_height = v;
        }
        if let Some(v) = self.min_font_size {
            config.min_font_size = v;
        }
        if let Some(v) = self.max_font_size {
            config.max_font_size = v;
        }
        if let Some(v) = self.size_scale {
            config.size_scale_factor = v;
        }
        if let Some(v) = self.background_threshold {
            config.background_threshold = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn transfer_paths(&self) -> TransferPaths {
        TransferPaths {
            source: self.source.clone(),
            background: self
                .background
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKGROUND)),
            output: self
                .output
                .clone()
                .unwrap_or_else(|| default_output(&self.source)),
        }
    }

    fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// `output/<stem>_output.pdf` for a given source file.
fn default_output(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{}_output.pdf", stem))
}

fn run(cli: &Cli) -> Result<TransferReport> {
    let config = cli.transfer_config()?;
    let paths = cli.transfer_paths();
    check_inputs(&paths)?;

    if let Some(dir) = paths.output.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }

    let engine = PdfiumEngine::new()?;
    let report = ContentTransfer::new(config, &TracingObserver).run(&engine, &paths)?;

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }
    Ok(report)
}

fn write_report(report: &TransferReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| PagegraftError::Persist {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn exit_status(human: &HumanError) -> u8 {
    match human.severity {
        Severity::Transient => EXIT_TEMPORARY,
        Severity::ActionRequired => EXIT_USAGE,
        Severity::Permanent => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Pagegraft starting");

    match run(&cli) {
        Ok(report) => {
            if report.total_skipped() > 0 {
                eprintln!(
                    "{} element(s) could not be transferred; see the log for details.",
                    report.total_skipped()
                );
            }
            println!(
                "Content transfer completed. Output saved to {}",
                report.paths.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            if human.retriable {
                eprintln!("Running the command again may help.");
            }
            eprintln!("Details: {}", err);
            ExitCode::from(exit_status(&human))
        }
    }
}
