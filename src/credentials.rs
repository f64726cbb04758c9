use crate::error::{Result, SyncError};
use crate::ini::IniDocument;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// Temporary keys for one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
    pub region: String,
}

impl Credentials {
    pub fn expiration_rfc3339(&self) -> String {
        self.expiration.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

// Keep secrets out of debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .field("region", &self.region)
            .finish()
    }
}

/// The shared credentials file (`~/.aws/credentials`).
#[derive(Debug, Clone)]
pub struct CredentialsStore {
    path: PathBuf,
}

impl CredentialsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<IniDocument> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(IniDocument::parse(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(IniDocument::default()),
            Err(e) => Err(SyncError::io(&self.path, e)),
        }
    }

    /// Writes `credentials` into `section`, leaving every other section as is.
    pub fn write_section(&self, section: &str, credentials: &Credentials) -> Result<()> {
        let mut doc = self.read()?;

        doc.set(section, "region", &credentials.region);
        doc.set(section, "aws_access_key_id", &credentials.access_key_id);
        doc.set(section, "aws_secret_access_key", &credentials.secret_access_key);
        doc.set(section, "aws_session_token", &credentials.session_token);
        // older SDKs only read the security token key
        doc.set(section, "aws_security_token", &credentials.session_token);
        doc.set(section, "x_security_token_expires", credentials.expiration_rfc3339());

        self.replace_contents(&doc.to_string())?;

        debug!("Wrote [{}] to {}", section, self.path.display());
        trace!("{:?}", credentials);
        Ok(())
    }

    /// Writes a sibling temp file (0600 on unix) and renames it over the
    /// store, so a failed write never leaves a truncated credentials file.
    fn replace_contents(&self, contents: &str) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| SyncError::io(parent, e))?;
        tmp.write_all(contents.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| SyncError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| SyncError::io(&self.path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_credentials() -> Credentials {
    use chrono::TimeZone;

    Credentials {
        access_key_id: "ASIAEXAMPLE".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: "token".to_string(),
        expiration: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        region: "ap-southeast-2".to_string(),
    }
}
