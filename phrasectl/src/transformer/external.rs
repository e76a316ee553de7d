use std::{path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::{ToolFailure, Transformer};
use crate::config::{StagingConfig, TransformerConfig};
use crate::staging::StagedFiles;

/// Runs a separate program over staged files.
#[derive(Debug, Clone)]
pub struct ExternalTransformer {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    staging: StagingConfig,
}

impl ExternalTransformer {
    pub fn new(transformer: &TransformerConfig, staging: &StagingConfig) -> Self {
        Self {
            program: transformer.program.clone(),
            args: transformer.args.clone(),
            working_dir: transformer.working_dir.clone(),
            timeout: transformer.timeout,
            staging: staging.clone(),
        }
    }

    fn command(&self, staged: &StagedFiles) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(staged.input_path())
            .arg(staged.output_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the request (timeout, disconnect, shutdown) takes the child down with it
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        command
    }
}

#[async_trait]
impl Transformer for ExternalTransformer {
    fn name(&self) -> &'static str {
        "external"
    }

    #[instrument(skip_all, fields(program = %self.program.display(), input_len = input.len()))]
    async fn transform(&self, input: &str) -> Result<String, ToolFailure> {
        // Removed on drop, whichever way this function returns
        let staged = StagedFiles::create(&self.staging, input).await.map_err(ToolFailure::Staging)?;

        let child = self.command(&staged).spawn().map_err(|source| ToolFailure::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| ToolFailure::Internal(format!("failed waiting for transformer: {e}")))?,
            Err(_) => return Err(ToolFailure::Timeout { after: self.timeout }),
        };

        if !output.stderr.is_empty() {
            return Err(ToolFailure::Stderr {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // Only stderr and the output file decide the outcome
        if !output.status.success() {
            warn!(status = %output.status, "Transformer exited unsuccessfully without writing to stderr");
        }

        if !output.stdout.is_empty() {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Transformer wrote to stdout");
        }

        tokio::fs::read_to_string(staged.output_path())
            .await
            .map_err(|source| ToolFailure::MissingOutput {
                path: staged.output_path().to_path_buf(),
                source,
            })
    }
}
