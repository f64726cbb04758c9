//! Refreshes the credentials of a single profile.

use crate::config::{AwsConfig, ProfileView};
use crate::credentials::{Credentials, CredentialsStore};
use crate::error::{Result, SyncError};
use crate::sso::{self, SsoCache, SsoSettings};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_types::region::Region;
use chrono::{TimeZone, Utc};
use std::env;
use std::time::SystemTime;
use tracing::{debug, info};

const FALLBACK_REGION: &str = "us-east-1";
const ROLE_SESSION_NAME_MAX: usize = 64;

/// Obtains fresh credentials for a profile and persists them.
pub trait CredentialUpdater {
    /// Writes under `rename_to` when given, otherwise under `profile`.
    async fn update(
        &self,
        profile: &str,
        config: &AwsConfig,
        rename_to: Option<&str>,
    ) -> Result<Credentials>;
}

/// Updater backed by the AWS CLI SSO cache and the shared credentials file.
#[derive(Debug, Clone)]
pub struct SsoCredentialUpdater {
    cache: SsoCache,
    store: CredentialsStore,
}

impl SsoCredentialUpdater {
    pub fn new(cache: SsoCache, store: CredentialsStore) -> Self {
        Self { cache, store }
    }

    /// Credentials for an SSO profile, or `None` if it isn't one.
    async fn sso_credentials(
        &self,
        profile: &ProfileView<'_>,
        config: &AwsConfig,
    ) -> Result<Option<Credentials>> {
        let Some(settings) = SsoSettings::from_profile(profile, config)? else {
            return Ok(None);
        };
        let login = self.cache.login_for(&settings, Utc::now())?;
        let region = profile_region(profile, Some(&settings.region));
        sso::fetch_role_credentials(&settings, &login, region)
            .await
            .map(Some)
    }

    async fn chained_credentials(
        &self,
        profile: &ProfileView<'_>,
        config: &AwsConfig,
        source_name: &str,
        role_arn: &str,
    ) -> Result<Credentials> {
        let source = config.profile(source_name)?;
        let source_credentials = self
            .sso_credentials(&source, config)
            .await?
            .ok_or_else(|| SyncError::NotSsoProfile(source_name.to_string()))?;
        debug!("Assuming {} with credentials of {}", role_arn, source_name);

        let region = profile_region(profile, Some(&source_credentials.region));
        assume_role(profile, role_arn, &source_credentials, region).await
    }
}

impl CredentialUpdater for SsoCredentialUpdater {
    async fn update(
        &self,
        profile: &str,
        config: &AwsConfig,
        rename_to: Option<&str>,
    ) -> Result<Credentials> {
        let view = config.profile(profile)?;

        let credentials = match self.sso_credentials(&view, config).await? {
            Some(credentials) => credentials,
            None => match (view.get("source_profile"), view.get("role_arn")) {
                (Some(source), Some(role_arn)) => {
                    self.chained_credentials(&view, config, source, role_arn)
                        .await?
                }
                _ => return Err(SyncError::NotSsoProfile(profile.to_string())),
            },
        };

        let target = rename_to.unwrap_or(profile);
        self.store.write_section(target, &credentials)?;

        if target == profile {
            info!("Synced profile `{}`", profile);
        } else {
            info!("Synced profile `{}` as `{}`", profile, target);
        }
        Ok(credentials)
    }
}

fn profile_region(profile: &ProfileView<'_>, fallback: Option<&str>) -> String {
    profile
        .get("region")
        .map(str::to_string)
        .or_else(|| fallback.map(str::to_string))
        .or_else(|| env::var("AWS_DEFAULT_REGION").ok())
        .or_else(|| env::var("AWS_REGION").ok())
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

pub fn role_session_name(profile: &str) -> String {
    let name: String = format!("ssosync-{profile}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "+=,.@-_".contains(c) {
                c
            } else {
                '-'
            }
        })
        .collect();
    name.chars().take(ROLE_SESSION_NAME_MAX).collect()
}

async fn assume_role(
    profile: &ProfileView<'_>,
    role_arn: &str,
    source: &Credentials,
    region: String,
) -> Result<Credentials> {
    let provider = aws_credential_types::Credentials::new(
        source.access_key_id.clone(),
        source.secret_access_key.clone(),
        Some(source.session_token.clone()),
        Some(SystemTime::from(source.expiration)),
        "ssosync",
    );
    let sdk_config = aws_config::SdkConfig::builder()
        .credentials_provider(SharedCredentialsProvider::new(provider))
        .region(Region::new(region.clone()))
        .build();
    let client = aws_sdk_sts::Client::new(&sdk_config);

    let mut request = client
        .assume_role()
        .role_arn(role_arn)
        .role_session_name(role_session_name(profile.name()));
    if let Some(external_id) = profile.get("external_id") {
        request = request.external_id(external_id);
    }
    if let Some(duration) = profile.get("duration_seconds").and_then(|d| d.parse().ok()) {
        request = request.duration_seconds(duration);
    }

    let output = request.send().await.map_err(aws_sdk_sts::Error::from)?;
    let assumed = output
        .credentials()
        .ok_or(SyncError::MissingCredentials("AssumeRole"))?;
    let field = |v: Option<&str>| -> Result<String> {
        v.map(str::to_string)
            .ok_or(SyncError::MissingCredentials("AssumeRole"))
    };
    let expiration = assumed
        .expiration()
        .and_then(|ts| Utc.timestamp_opt(ts.secs(), ts.subsec_nanos()).single())
        .ok_or(SyncError::MissingCredentials("AssumeRole"))?;

    Ok(Credentials {
        access_key_id: field(assumed.access_key_id())?,
        secret_access_key: field(assumed.secret_access_key())?,
        session_token: field(assumed.session_token())?,
        expiration,
        region,
    })
}
