use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while refreshing a single profile.
///
/// None of these abort a sync run; the orchestrator logs them and moves on
/// to the next profile.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Profile `{0}` is not specified in AWS config file")]
    ProfileNotFound(String),

    #[error("Profile `{0}` is not an SSO profile. Skipping...")]
    NotSsoProfile(String),

    #[error("Profile `{profile}` is missing `{key}`")]
    MissingSetting { profile: String, key: &'static str },

    #[error("No cached SSO login found for {start_url}. Try `aws sso login` first")]
    SsoCacheNotFound { start_url: String },

    #[error("Cached SSO login for {start_url} expired at {expires_at}. Try `aws sso login` again")]
    SsoLoginExpired {
        start_url: String,
        expires_at: String,
    },

    #[error("Invalid timestamp `{0}`")]
    InvalidTimestamp(String),

    #[error("SSO portal request failed: {0}")]
    Sso(#[from] aws_sdk_sso::Error),

    #[error("STS request failed: {0}")]
    Sts(#[from] aws_sdk_sts::Error),

    #[error("{0} returned no credentials")]
    MissingCredentials(&'static str),

    #[error("AWS CLI: {0}")]
    AwsCli(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Profiles that simply aren't SSO-backed are expected in mixed configs.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NotSsoProfile(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
