//! CLI entry point for exambank.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use exambank_core::{
    AcquireSettings, Acquirer, AcquisitionReport, ChromiumLauncher, ClassificationLabel,
    DocumentCache, SiteProfile, classify_file,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{AcquireArgs, Args, Command, QueryArgs};

/// Process outcome mapped onto the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Partial => ExitCode::from(2),
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

/// Maps a finished run onto the process outcome.
fn determine_exit_outcome(report: &AcquisitionReport) -> ProcessExit {
    if report.failures.is_empty() && !report.interrupted {
        ProcessExit::Success
    } else if !report.documents.is_empty() {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let file_config = match app_config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&args, file_config.as_ref());
    debug!(?args, "CLI arguments parsed");

    match run(args, file_config).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info.
fn init_tracing(args: &Args, file_config: Option<&FileConfig>) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .and_then(|cfg| cfg.verbosity)
                .map_or("info", app_config::VerbositySetting::filter),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args, file_config: Option<FileConfig>) -> Result<ProcessExit> {
    let mut settings = AcquireSettings::default();
    if let Some(cfg) = &file_config {
        cfg.apply_to(&mut settings);
    }

    match args.command {
        Command::Acquire(acquire) => run_acquire(acquire, settings).await,
        Command::Classify { files } => Ok(run_classify(&files).await),
        Command::Url(query) => run_url(&query, &settings.site),
    }
}

async fn run_acquire(args: AcquireArgs, mut settings: AcquireSettings) -> Result<ProcessExit> {
    if let Some(dir) = &args.output_dir {
        settings.documents_root.clone_from(dir);
    }
    if let Some(max_retries) = args.max_retries {
        settings.max_retries = max_retries;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency =
            usize::try_from(concurrency).context("concurrency out of range for usize")?;
    }

    let launcher = if args.headed {
        ChromiumLauncher::new().headed()
    } else {
        ChromiumLauncher::new()
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let acquirer = Acquirer::new(Arc::new(launcher), settings)
        .context("Invalid acquisition settings")?
        .with_cache(Arc::new(DocumentCache::new()))
        .with_interrupt_flag(Arc::clone(&interrupted));

    info!(subject = %args.query.subject, "exambank starting");
    let report = acquirer
        .acquire(args.query.params())
        .await
        .context("Acquisition failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_summary(&report);
    }

    Ok(determine_exit_outcome(&report))
}

fn print_summary(report: &AcquisitionReport) {
    println!(
        "{} discovered over {} page(s): {} downloaded, {} already present, {} failed",
        report.discovered,
        report.pages_visited,
        report.downloaded(),
        report.already_present(),
        report.failures.len()
    );
    println!(
        "  {} answer key(s), {} question paper(s)",
        report.count_kind(ClassificationLabel::AnswerKey),
        report.count_kind(ClassificationLabel::QuestionPaper)
    );
    for failure in &report.failures {
        println!("  failed [{}] {}: {}", failure.stage, failure.name, failure.reason);
    }
    if report.interrupted {
        println!("  interrupted; rerun to continue");
    }
}

async fn run_classify(files: &[PathBuf]) -> ProcessExit {
    let mut classified = 0_usize;
    let mut failed = 0_usize;
    for path in files {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match classify_file(path, &file_name).await {
            Ok(label) => {
                classified += 1;
                println!("{label}\t{}", path.display());
            }
            Err(error) => {
                failed += 1;
                warn!(path = %path.display(), error = %error, "cannot classify");
                println!("error\t{}", path.display());
            }
        }
    }

    if failed == 0 {
        ProcessExit::Success
    } else if classified > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

fn run_url(query: &QueryArgs, site: &SiteProfile) -> Result<ProcessExit> {
    let query = query.params().validate().context("Invalid query")?;
    let url = site
        .listing_url(&query)
        .with_context(|| format!("Invalid library URL '{}'", site.library_url))?;
    println!("{url}");
    Ok(ProcessExit::Success)
}
