//! Transformers turn submitted text into the report returned by `/run_cpp`.
//!
//! The handler only sees the [`Transformer`] trait. Two implementations exist:
//!
//! - [`ExternalTransformer`] stages the text on disk and runs a separate program as
//!   `<program> [args...] <input_path> <output_path>`. Any stderr output, a timeout, or an
//!   unreadable output file is a failure. The exit status is only logged.
//! - [`BuiltinTransformer`] runs the [`crate::lexer`] in-process and produces the same report the
//!   `phrasing` program writes, without touching the filesystem.
//!
//! Which one serves requests is chosen by `transformer.kind` in the configuration.

mod builtin;
mod external;

pub use builtin::BuiltinTransformer;
pub use external::ExternalTransformer;

use std::{io, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error as ThisError;

use crate::config::{Config, TransformerKind};

/// Why a transformer invocation failed. Clients never see this detail; it is logged.
#[derive(ThisError, Debug)]
pub enum ToolFailure {
    #[error("could not stage input: {0}")]
    Staging(#[source] io::Error),

    #[error("could not start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("program reported an error: {}", stderr.trim_end())]
    Stderr { stderr: String },

    #[error("output file {} is missing or unreadable: {source}", path.display())]
    MissingOutput { path: PathBuf, source: io::Error },

    #[error("program did not finish within {}", humantime::format_duration(*after))]
    Timeout { after: Duration },

    #[error("{0}")]
    Internal(String),
}

impl ToolFailure {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolFailure::Staging(_) => "staging",
            ToolFailure::Spawn { .. } => "spawn",
            ToolFailure::Stderr { .. } => "stderr",
            ToolFailure::MissingOutput { .. } => "missing_output",
            ToolFailure::Timeout { .. } => "timeout",
            ToolFailure::Internal(_) => "internal",
        }
    }
}

/// Something that turns input text into output text.
#[async_trait]
pub trait Transformer: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and metric labels.
    fn name(&self) -> &'static str;

    async fn transform(&self, input: &str) -> Result<String, ToolFailure>;
}

/// Build the transformer selected by the configuration.
pub fn from_config(config: &Config) -> Arc<dyn Transformer> {
    match config.transformer.kind {
        TransformerKind::External => Arc::new(ExternalTransformer::new(&config.transformer, &config.staging)),
        TransformerKind::Builtin => Arc::new(BuiltinTransformer),
    }
}
