//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PHRASECTL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, may be absent)
//! 2. **Environment variables** - Variables prefixed with `PHRASECTL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PHRASECTL_TRANSFORMER__PROGRAM=/opt/bin/phrasing` sets the `transformer.program` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use phrasectl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Transformer**: `transformer.kind`, `transformer.program`, `transformer.timeout` - which
//!   transformer handles `/run_cpp` and how the external program is invoked
//! - **Staging**: `staging.dir`, `staging.output_suffix`, `staging.keep_files` - staged files
//!   handed to the external program
//! - **Limits**: `limits.max_body_size`, `limits.transforms` - request size and concurrency caps
//! - **CORS**: `cors.allowed_origins` - browser origins allowed to call the API
//! - **Features**: `enable_metrics`, `enable_otel_export` - optional feature toggles
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! PHRASECTL_PORT=8080
//!
//! # Use the in-process lexer instead of the external program
//! PHRASECTL_TRANSFORMER__KIND=builtin
//!
//! # Keep staged files around for debugging
//! PHRASECTL_STAGING__KEEP_FILES=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PHRASECTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty (or missing) config file yields a server on
/// `0.0.0.0:5000` that runs `./phrasing` for every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Which transformer serves `/run_cpp` and how it is invoked
    pub transformer: TransformerConfig,
    /// Where staged input/output files live and what happens to them afterwards
    pub staging: StagingConfig,
    /// Resource limits for protecting system capacity
    pub limits: LimitsConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Transformer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerKind {
    /// Shell out to `transformer.program` with staged input/output paths
    External,
    /// Run the lexer in-process
    Builtin,
}

/// Transformer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformerConfig {
    pub kind: TransformerKind,
    /// Executable invoked as `<program> [args...] <input_path> <output_path>`
    pub program: PathBuf,
    /// Extra leading arguments placed before the two staged paths
    pub args: Vec<String>,
    /// Working directory for the child process (defaults to the server's)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Upper bound on a single invocation. The child is killed when it elapses.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            kind: TransformerKind::External,
            program: PathBuf::from("./phrasing"),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Staged file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingConfig {
    /// Directory for staged files (default: platform temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Suffix appended to the staged input path to form the output path
    pub output_suffix: String,
    /// Leave staged files on disk after each request (for debugging)
    pub keep_files: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            output_suffix: ".out".to_string(),
            keep_files: false,
        }
    }
}

impl StagingConfig {
    /// The directory staged files are created in.
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Resource limits configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes for `/run_cpp`.
    /// Default: 2MB
    pub max_body_size: usize,
    /// Concurrency limits for transformer invocations
    pub transforms: TransformLimitsConfig,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024,
            transforms: TransformLimitsConfig::default(),
        }
    }
}

/// Transformer concurrency limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformLimitsConfig {
    /// Maximum number of transformer invocations running at once.
    /// Set to 0 for unlimited.
    /// Default: 0 (unlimited)
    pub max_concurrent: usize,
    /// Maximum number of requests that can wait for a slot.
    /// When this limit is reached, new requests receive HTTP 429 immediately.
    /// Set to 0 for an unlimited waiting queue.
    /// Default: 20
    pub max_waiting: usize,
    /// Maximum time to wait for a slot before returning HTTP 429.
    /// Zero rejects immediately when no slot is available.
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,
}

impl Default for TransformLimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            max_waiting: 20,
            max_wait: Duration::from_secs(30),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            transformer: TransformerConfig::default(),
            staging: StagingConfig::default(),
            limits: LimitsConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.transformer.kind == TransformerKind::External && self.transformer.program.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: transformer.program must be set when transformer.kind is external".to_string(),
            });
        }

        if self.transformer.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: transformer.timeout must be greater than zero".to_string(),
            });
        }

        if self.staging.output_suffix.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: staging.output_suffix cannot be empty, the output would overwrite the input".to_string(),
            });
        }

        if let Some(dir) = &self.staging.dir
            && !dir.is_dir()
        {
            return Err(Error::Internal {
                operation: format!("Config validation: staging.dir {} is not an existing directory", dir.display()),
            });
        }

        if self.limits.max_body_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_body_size must be greater than zero".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        // Browsers refuse credentialed requests against a wildcard origin
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
            return Err(Error::Internal {
                operation: "Config validation: cors.allow_credentials cannot be combined with a '*' origin".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // PHRASECTL_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("PHRASECTL_").ignore(&["CONFIG"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 5000);
            assert_eq!(config.transformer.kind, TransformerKind::External);
            assert_eq!(config.transformer.program, PathBuf::from("./phrasing"));
            assert_eq!(config.transformer.timeout, Duration::from_secs(30));
            assert_eq!(config.staging.output_suffix, ".out");
            assert!(!config.staging.keep_files);
            assert_eq!(config.staging.dir(), std::env::temp_dir());

            Ok(())
        });
    }

    #[test]
    fn test_transformer_config_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
transformer:
  kind: external
  program: /usr/bin/env
  args: ["phrasing"]
  timeout: 2s
staging:
  output_suffix: .result
  keep_files: true
limits:
  transforms:
    max_concurrent: 4
    max_wait: 500ms
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.transformer.program, PathBuf::from("/usr/bin/env"));
            assert_eq!(config.transformer.args, vec!["phrasing".to_string()]);
            assert_eq!(config.transformer.timeout, Duration::from_secs(2));
            assert_eq!(config.staging.output_suffix, ".result");
            assert!(config.staging.keep_files);
            assert_eq!(config.limits.transforms.max_concurrent, 4);
            assert_eq!(config.limits.transforms.max_waiting, 20); // default
            assert_eq!(config.limits.transforms.max_wait, Duration::from_millis(500));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9000
transformer:
  program: ./phrasing
"#,
            )?;

            jail.set_env("PHRASECTL_HOST", "127.0.0.1");
            jail.set_env("PHRASECTL_PORT", "8080");
            jail.set_env("PHRASECTL_TRANSFORMER__KIND", "builtin");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.transformer.kind, TransformerKind::Builtin);
            assert_eq!(config.bind_address(), "127.0.0.1:8080");

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
transformer:
  programme: ./phrasing
"#,
            )?;

            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_cors_origins() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
cors:
  allowed_origins:
    - "https://app.example.com"
  allow_credentials: true
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.cors.allowed_origins.len(), 1);
            assert!(matches!(&config.cors.allowed_origins[0], CorsOrigin::Url(url) if url.as_str() == "https://app.example.com/"));

            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_empty_suffix() {
        let mut config = Config::default();
        config.staging.output_suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let mut config = Config::default();
        config.transformer.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_missing_staging_dir() {
        let mut config = Config::default();
        config.staging.dir = Some(PathBuf::from("/definitely/not/a/real/dir"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_credentials_with_wildcard() {
        let mut config = Config::default();
        config.cors.allow_credentials = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_kind_ignores_empty_program() {
        let mut config = Config::default();
        config.transformer.kind = TransformerKind::Builtin;
        config.transformer.program = PathBuf::new();
        assert!(config.validate().is_ok());

        config.transformer.kind = TransformerKind::External;
        assert!(config.validate().is_err());
    }
}
