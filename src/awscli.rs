use crate::error::{Result, SyncError};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};

pub const DEFAULT_AWS_BIN: &str = "aws";

/// Thin wrapper around the AWS CLI v2 binary.
#[derive(Debug, Clone)]
pub struct AwsCli {
    bin: PathBuf,
}

impl AwsCli {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Resolves the binary, searching `PATH` for bare command names.
    pub fn locate(&self) -> Option<PathBuf> {
        if self.bin.components().count() > 1 {
            return self.bin.is_file().then(|| self.bin.clone());
        }
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .flat_map(|dir| candidates(&dir, &self.bin))
            .find(|p| p.is_file())
    }

    /// Runs `aws --version` and checks that it is CLI v2.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.bin)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SyncError::AwsCli(format!("cannot execute `{} --version`: {e}", self.bin.display())))?;

        if !output.status.success() {
            return Err(SyncError::AwsCli(format!(
                "`{} --version` failed: {}",
                self.bin.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // v1 prints its version on stderr
        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stderr).trim().to_string();
        }
        ensure_v2(&text)?;
        debug!("{}", text);
        Ok(text)
    }

    /// Runs the interactive `aws sso login` for `profile`.
    pub async fn sso_login(&self, profile: &str) -> Result<()> {
        trace!("Running {} sso login --profile {}", self.bin.display(), profile);
        let status = Command::new(&self.bin)
            .args(["sso", "login", "--profile", profile])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| SyncError::AwsCli(format!("cannot execute `aws sso login`: {e}")))?;

        if !status.success() {
            return Err(SyncError::AwsCli(format!(
                "`aws sso login --profile {profile}` exited with {status}"
            )));
        }
        Ok(())
    }
}

fn candidates(dir: &Path, bin: &Path) -> Vec<PathBuf> {
    let plain = dir.join(bin);
    if cfg!(windows) {
        vec![plain.with_extension("exe"), plain.with_extension("cmd"), plain]
    } else {
        vec![plain]
    }
}

pub fn ensure_v2(version_output: &str) -> Result<()> {
    if version_output.contains("aws-cli/2") {
        Ok(())
    } else {
        Err(SyncError::AwsCli(format!(
            "Required AWS CLI v2. Found {version_output}"
        )))
    }
}
