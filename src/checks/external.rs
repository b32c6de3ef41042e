//! User-supplied check commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Substituted with the path of the file under check.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Runs a shell command against produced text written to a scratch file.
#[derive(Debug, Clone)]
pub struct ExternalCheck {
    /// Working directory of the command
    root: PathBuf,
    /// Where scratch files are created
    tmp_dir: PathBuf,
}

impl ExternalCheck {
    pub fn new(root: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Run `command` with `{path}` pointing at a temp file holding `content`.
    ///
    /// Non-zero exit fails with the combined stdout and stderr. The temp file is removed
    /// when this returns, whatever the outcome.
    pub async fn run(&self, command: &str, content: &str) -> Result<(), String> {
        std::fs::create_dir_all(&self.tmp_dir)
            .map_err(|e| format!("failed to create {}: {e}", self.tmp_dir.display()))?;

        let mut file = tempfile::Builder::new()
            .prefix("check-")
            .suffix(".tmp")
            .tempfile_in(&self.tmp_dir)
            .map_err(|e| format!("failed to create temp file: {e}"))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| format!("failed to write temp file: {e}"))?;

        let command = substitute_path(command, file.path());
        debug!(command = %command, "Running check command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| format!("failed to spawn check command: {e}"))?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(format!(
            "external check failed: {}\n{}",
            output.status,
            combined.trim()
        ))
    }
}

fn substitute_path(command: &str, path: &Path) -> String {
    command.replace(PATH_PLACEHOLDER, &path.to_string_lossy())
}
