//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use exambank_core::{DEFAULT_DOCUMENT_TYPE, DEFAULT_PAGES, QueryParams};

/// Build a local exam-paper bank from the library website.
///
/// Exambank walks the filtered library listing, downloads every paper it has not
/// seen before and files it as a question paper or an answer key.
#[derive(Parser, Debug)]
#[command(name = "exambank")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/exambank/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List, download, classify and place the documents for one query
    Acquire(AcquireArgs),

    /// Classify local PDFs as question papers or answer keys
    Classify {
        /// PDF files to classify
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Print the listing URL for a query without opening a browser
    Url(QueryArgs),
}

/// Filters sent to the library listing.
#[derive(ClapArgs, Debug, Clone)]
pub struct QueryArgs {
    /// Exam category, e.g. "GCE 'A' Levels"
    #[arg(long, default_value = "")]
    pub category: String,

    /// Subject, e.g. "H2 Economics"
    #[arg(short, long)]
    pub subject: String,

    /// Exam year
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Document type filter (empty for none)
    #[arg(long, default_value = DEFAULT_DOCUMENT_TYPE)]
    pub document_type: String,

    /// Listing pages to walk
    #[arg(short, long, default_value_t = DEFAULT_PAGES, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub pages: u32,
}

impl QueryArgs {
    /// Unvalidated query fields.
    #[must_use]
    pub fn params(&self) -> QueryParams {
        QueryParams {
            category: self.category.clone(),
            subject: self.subject.clone(),
            year: self.year,
            document_type: self.document_type.clone(),
            pages: self.pages,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AcquireArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Root directory for subject folders (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Download attempts per document (overrides config)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Documents fetched at once (overrides config)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..=16))]
    pub concurrency: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquire(args: &[&str]) -> AcquireArgs {
        let mut argv = vec!["exambank", "acquire"];
        argv.extend_from_slice(args);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Acquire(acquire) => acquire,
            other => panic!("expected acquire, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_acquire_defaults() {
        let args = acquire(&["--subject", "H2 Economics"]);
        assert_eq!(args.query.subject, "H2 Economics");
        assert_eq!(args.query.category, "");
        assert_eq!(args.query.document_type, "Exam Papers");
        assert_eq!(args.query.pages, 5);
        assert_eq!(args.query.year, None);
        assert!(args.output_dir.is_none());
        assert!(args.max_retries.is_none());
        assert!(!args.json);
    }

    #[test]
    fn test_cli_acquire_all_flags() {
        let args = acquire(&[
            "--category",
            "GCE 'A' Levels",
            "-s",
            "H2 Economics",
            "-y",
            "2023",
            "-p",
            "2",
            "-o",
            "/tmp/papers",
            "-r",
            "5",
            "-c",
            "4",
            "--json",
        ]);
        assert_eq!(args.query.category, "GCE 'A' Levels");
        assert_eq!(args.query.year, Some(2023));
        assert_eq!(args.query.pages, 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/papers")));
        assert_eq!(args.max_retries, Some(5));
        assert_eq!(args.concurrency, Some(4));
        assert!(args.json);
    }

    #[test]
    fn test_cli_acquire_requires_subject() {
        let err = Args::try_parse_from(["exambank", "acquire"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_zero_pages_rejected() {
        let err = Args::try_parse_from(["exambank", "acquire", "-s", "X", "-p", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_zero_retries_rejected() {
        let err = Args::try_parse_from(["exambank", "acquire", "-s", "X", "-r", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let err =
            Args::try_parse_from(["exambank", "acquire", "-s", "X", "-c", "17"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["exambank", "url", "-s", "X", "-vv", "--config", "c.toml"])
            .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(args.command, Command::Url(_)));
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["exambank", "-q", "classify", "a.pdf"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_classify_requires_files() {
        let err = Args::try_parse_from(["exambank", "classify"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_query_args_to_params() {
        let args = Args::try_parse_from(["exambank", "url", "-s", "H1 Chemistry", "--document-type", ""])
            .unwrap();
        let Command::Url(query) = args.command else {
            panic!("expected url");
        };
        let params = query.params();
        assert_eq!(params.subject, "H1 Chemistry");
        assert_eq!(params.document_type, "");
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["exambank", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["exambank", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_subcommand_returns_error() {
        let err = Args::try_parse_from(["exambank", "download"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
