//! Staged input/output files handed to the external transformer.
//!
//! Each request gets a uniquely named input file (created through [`tempfile`]) and an output
//! path derived from it by appending the configured suffix. [`StagedFiles`] owns both and removes
//! them when dropped, so every exit path of a request (success, failure, timeout, or the request
//! future being dropped on disconnect) cleans up after itself. Setting `staging.keep_files`
//! leaves both files on disk for debugging.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::config::StagingConfig;

/// Prefix of every staged input file name.
pub const STAGED_FILE_PREFIX: &str = "phrasing-";

/// A staged input file and the output path the transformer is told to write.
#[derive(Debug)]
pub struct StagedFiles {
    input: Option<TempPath>,
    output: PathBuf,
    keep: bool,
}

impl StagedFiles {
    /// Create a fresh input file containing `input` as UTF-8 and derive its output path.
    pub async fn create(config: &StagingConfig, input: &str) -> io::Result<Self> {
        let dir = config.dir();
        let suffix = config.output_suffix.clone();
        let keep = config.keep_files;
        let text = input.to_owned();

        tokio::task::spawn_blocking(move || {
            let mut file = tempfile::Builder::new().prefix(STAGED_FILE_PREFIX).tempfile_in(&dir)?;
            file.write_all(text.as_bytes())?;
            file.flush()?;

            let input = file.into_temp_path();
            let output = output_path_for(&input, &suffix);
            debug!(input = %input.display(), output = %output.display(), "Staged transformer input");

            Ok(Self {
                input: Some(input),
                output,
                keep,
            })
        })
        .await
        .map_err(io::Error::other)?
    }

    pub fn input_path(&self) -> &Path {
        self.input.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

/// `input` with `suffix` appended to its final component, byte for byte.
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let mut output = OsString::from(input.as_os_str());
    output.push(suffix);
    PathBuf::from(output)
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        let Some(input) = self.input.take() else {
            return;
        };

        if self.keep {
            match input.keep() {
                Ok(path) => info!(input = %path.display(), output = %self.output.display(), "Keeping staged files"),
                Err(e) => warn!("Failed to keep staged input file: {}", e),
            }
            return;
        }

        match std::fs::remove_file(&self.output) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(output = %self.output.display(), "Failed to remove staged output file: {}", e),
        }

        if let Err(e) = input.close() {
            warn!("Failed to remove staged input file: {}", e);
        }
    }
}
