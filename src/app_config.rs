//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use exambank_core::{AcquireSettings, MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Line-oriented `key = value` file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Root of the subject directories.
    pub documents_root: Option<PathBuf>,
    /// Attempts per document.
    pub max_retries: Option<u32>,
    /// Linear backoff step in milliseconds.
    pub backoff_ms: Option<u64>,
    /// Entries fetched at once.
    pub concurrency: Option<usize>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Initial listing load timeout in seconds.
    pub navigation_timeout_secs: Option<u64>,
    /// Per-page results timeout in seconds.
    pub results_timeout_secs: Option<u64>,
    /// Pagination timeout in seconds.
    pub pagination_timeout_secs: Option<u64>,
    /// Library listing URL.
    pub library_url: Option<String>,
    /// Document link prefix.
    pub document_prefix: Option<String>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_retries) = self.max_retries
            && !(1..=10).contains(&max_retries)
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 1..=10");
        }
        if let Some(backoff_ms) = self.backoff_ms
            && backoff_ms > 60_000
        {
            bail!("Invalid config value for `backoff_ms`: {backoff_ms}. Expected range: 0..=60000");
        }
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_timeout_secs("navigation_timeout_secs", self.navigation_timeout_secs)?;
        validate_timeout_secs("results_timeout_secs", self.results_timeout_secs)?;
        validate_timeout_secs("pagination_timeout_secs", self.pagination_timeout_secs)?;
        validate_absolute_url("library_url", self.library_url.as_deref())?;
        validate_absolute_url("document_prefix", self.document_prefix.as_deref())?;
        Ok(())
    }

    /// Overlays the values present in this file onto `settings`.
    pub fn apply_to(&self, settings: &mut AcquireSettings) {
        if let Some(root) = &self.documents_root {
            settings.documents_root.clone_from(root);
        }
        if let Some(max_retries) = self.max_retries {
            settings.max_retries = max_retries;
        }
        if let Some(backoff_ms) = self.backoff_ms {
            settings.backoff_step = Duration::from_millis(backoff_ms);
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.read_timeout_secs {
            settings.read_timeout_secs = secs;
        }
        if let Some(secs) = self.navigation_timeout_secs {
            settings.timeouts.navigation = Duration::from_secs(secs);
        }
        if let Some(secs) = self.results_timeout_secs {
            settings.timeouts.results = Duration::from_secs(secs);
        }
        if let Some(secs) = self.pagination_timeout_secs {
            settings.timeouts.pagination = Duration::from_secs(secs);
        }
        if let Some(url) = &self.library_url {
            settings.site.library_url.clone_from(url);
        }
        if let Some(prefix) = &self.document_prefix {
            settings.site.document_prefix.clone_from(prefix);
        }
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_absolute_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}' is not an absolute URL"))?;
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/exambank/config.toml`
/// 2. `$HOME/.config/exambank/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("exambank")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("exambank")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given, else from the default path if present.
///
/// An explicit path must exist; a missing default file is not an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return load_file_config(path).map(Some);
    }
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "documents_root" => {
                cfg.documents_root = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.max_retries = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("max_retries out of range for u32"))?,
                );
            }
            "backoff_ms" => cfg.backoff_ms = Some(parse_integer_u64(value).with_context(context)?),
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.concurrency = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("concurrency out of range for usize"))?,
                );
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "navigation_timeout_secs" => {
                cfg.navigation_timeout_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "results_timeout_secs" => {
                cfg.results_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "pagination_timeout_secs" => {
                cfg.pagination_timeout_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "library_url" => {
                cfg.library_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "document_prefix" => {
                cfg.document_prefix = Some(parse_string_literal(value).with_context(context)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
max_retries = 5
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.max_retries, Some(5));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.documents_root.is_none());
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
documents_root = "/srv/papers#1" # hash inside the string is kept
concurrency = 4 # workers
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.documents_root, Some(PathBuf::from("/srv/papers#1")));
        assert_eq!(cfg.concurrency, Some(4));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("rate_limit = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("rate_limit"));
    }

    #[test]
    fn test_parse_config_rejects_zero_retries() {
        let err = parse_config_str("max_retries = 0").expect_err("0 is below range");
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_parse_config_rejects_concurrency_out_of_range() {
        let err = parse_config_str("concurrency = 17").expect_err("17 is above range");
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_trailing_tokens() {
        let err = parse_config_str("backoff_ms = 600 ms").expect_err("trailing token");
        assert!(err.to_string().contains("backoff_ms"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout() {
        let err = parse_config_str("pagination_timeout_secs = 0").expect_err("invalid timeout");
        assert!(err.to_string().contains("pagination_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_relative_library_url() {
        let err = parse_config_str(r#"library_url = "/library""#).expect_err("relative URL");
        assert!(err.to_string().contains("library_url"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("concurrency 4").expect_err("syntax error");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_apply_to_overrides_only_present_fields() {
        let cfg = parse_config_str(
            r#"
documents_root = "/data/papers"
backoff_ms = 100
navigation_timeout_secs = 90
library_url = "http://localhost:8080/library"
"#,
        )
        .expect("config should parse");

        let mut settings = AcquireSettings::default();
        cfg.apply_to(&mut settings);

        assert_eq!(settings.documents_root, PathBuf::from("/data/papers"));
        assert_eq!(settings.backoff_step, Duration::from_millis(100));
        assert_eq!(settings.timeouts.navigation, Duration::from_secs(90));
        assert_eq!(settings.site.library_url, "http://localhost:8080/library");
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.concurrency, 1);
    }

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(VerbositySetting::Default.filter(), "info");
        assert_eq!(VerbositySetting::Verbose.filter(), "debug");
        assert_eq!(VerbositySetting::Quiet.filter(), "error");
        assert_eq!(VerbositySetting::Debug.filter(), "trace");
    }

    #[test]
    fn test_load_config_explicit_missing_file_is_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
