//! SSO cache lookup and role credential retrieval.
//!
//! The AWS CLI stores `aws sso login` tokens under `~/.aws/sso/cache`, named
//! after the SHA-1 of the `sso-session` name (or of the start URL for legacy
//! profiles). Those tokens are exchanged for role credentials through the SSO
//! portal API.

use crate::config::{AwsConfig, ProfileView};
use crate::credentials::Credentials;
use crate::error::{Result, SyncError};
use aws_types::region::Region;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// SSO settings resolved for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoSettings {
    pub session_name: Option<String>,
    pub start_url: String,
    pub region: String,
    pub account_id: String,
    pub role_name: String,
}

impl SsoSettings {
    /// Returns `None` when the profile is not SSO-backed at all.
    pub fn from_profile(profile: &ProfileView<'_>, config: &AwsConfig) -> Result<Option<Self>> {
        let session_name = profile.get("sso_session");
        if session_name.is_none() && profile.get("sso_start_url").is_none() {
            return Ok(None);
        }

        let lookup = |key: &'static str| -> Result<String> {
            session_name
                .and_then(|s| config.sso_session(s, key))
                .or_else(|| profile.get(key))
                .map(str::to_string)
                .ok_or_else(|| SyncError::MissingSetting {
                    profile: profile.name().to_string(),
                    key,
                })
        };

        Ok(Some(Self {
            session_name: session_name.map(str::to_string),
            start_url: lookup("sso_start_url")?,
            region: lookup("sso_region")?,
            account_id: profile.require("sso_account_id")?.to_string(),
            role_name: profile.require("sso_role_name")?.to_string(),
        }))
    }

    /// File name the AWS CLI uses for this login in the SSO cache.
    pub fn cache_key(&self) -> String {
        let source = self.session_name.as_deref().unwrap_or(&self.start_url);
        hex::encode(Sha1::digest(source.as_bytes()))
    }
}

/// One `aws sso login` token from the cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedLogin {
    pub start_url: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<String>,
}

impl CachedLogin {
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        let raw = self.expires_at.as_deref().unwrap_or_default();
        parse_expiry(raw)
    }
}

/// Accepts RFC 3339 as well as the `2024-01-01T00:00:00UTC` form older CLI
/// versions wrote.
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix("UTC").unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S")
        .map(|ts| Utc.from_utc_datetime(&ts))
        .map_err(|_| SyncError::InvalidTimestamp(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct SsoCache {
    dir: PathBuf,
}

impl SsoCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_entry(path: &Path) -> Result<CachedLogin> {
        let text = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| SyncError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Finds a valid cached login for `settings`, relative to `now`.
    pub fn login_for(&self, settings: &SsoSettings, now: DateTime<Utc>) -> Result<CachedLogin> {
        let keyed = self.dir.join(format!("{}.json", settings.cache_key()));
        trace!("Looking up SSO cache file {}", keyed.display());

        let login = if keyed.is_file() {
            Self::read_entry(&keyed)?
        } else {
            self.scan(&settings.start_url)?
        };

        let expires_at = login.expires_at()?;
        if expires_at <= now {
            return Err(SyncError::SsoLoginExpired {
                start_url: settings.start_url.clone(),
                expires_at: expires_at.to_rfc3339(),
            });
        }
        debug!("Using cached SSO login for {} (expires {})", settings.start_url, expires_at);
        Ok(login)
    }

    /// Falls back to scanning every cache entry for a matching start URL.
    fn scan(&self, start_url: &str) -> Result<CachedLogin> {
        let not_found = || SyncError::SsoCacheNotFound {
            start_url: start_url.to_string(),
        };

        let entries = fs::read_dir(&self.dir).map_err(|e| SyncError::io(&self.dir, e))?;
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| Self::read_entry(&path).ok())
            .filter(|login| login.start_url.as_deref() == Some(start_url) && login.access_token.is_some())
            .filter_map(|login| login.expires_at().ok().map(|exp| (exp, login)))
            .max_by_key(|(exp, _)| *exp)
            .map(|(_, login)| login)
            .ok_or_else(not_found)
    }
}

/// Exchanges a cached SSO token for role credentials via the SSO portal.
pub async fn fetch_role_credentials(
    settings: &SsoSettings,
    login: &CachedLogin,
    region: String,
) -> Result<Credentials> {
    let access_token = login
        .access_token
        .clone()
        .ok_or_else(|| SyncError::SsoCacheNotFound {
            start_url: settings.start_url.clone(),
        })?;

    let sdk_config = aws_config::SdkConfig::builder()
        .region(Region::new(settings.region.clone()))
        .build();
    let client = aws_sdk_sso::Client::new(&sdk_config);

    let output = client
        .get_role_credentials()
        .role_name(&settings.role_name)
        .account_id(&settings.account_id)
        .access_token(access_token)
        .send()
        .await
        .map_err(aws_sdk_sso::Error::from)?;

    let role = output
        .role_credentials()
        .ok_or(SyncError::MissingCredentials("GetRoleCredentials"))?;
    let field = |v: Option<&str>| -> Result<String> {
        v.map(str::to_string)
            .ok_or(SyncError::MissingCredentials("GetRoleCredentials"))
    };

    Ok(Credentials {
        access_key_id: field(role.access_key_id())?,
        secret_access_key: field(role.secret_access_key())?,
        session_token: field(role.session_token())?,
        expiration: Utc
            .timestamp_millis_opt(role.expiration())
            .single()
            .ok_or_else(|| SyncError::InvalidTimestamp(role.expiration().to_string()))?,
        region,
    })
}
