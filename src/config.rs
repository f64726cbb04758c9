//! AWS file locations and read access to the AWS config file.

use crate::error::{Result, SyncError};
use crate::ini::IniDocument;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "default";
const PROFILE_PREFIX: &str = "profile ";
const SSO_SESSION_PREFIX: &str = "sso-session ";
const SERVICES_PREFIX: &str = "services ";

/// Where the AWS files live, honouring the same env vars as the AWS CLI.
#[derive(Debug, Clone)]
pub struct AwsPaths {
    pub config_file: PathBuf,
    pub credentials_file: PathBuf,
    pub sso_cache_dir: PathBuf,
}

impl AwsPaths {
    pub fn from_env() -> Self {
        let aws_dir = dirs::home_dir().unwrap_or_default().join(".aws");

        let config_file = env::var_os("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("config"));
        let credentials_file = env::var_os("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| aws_dir.join("credentials"));

        Self {
            config_file,
            credentials_file,
            sso_cache_dir: aws_dir.join("sso").join("cache"),
        }
    }
}

/// Parsed AWS config file (`~/.aws/config`).
#[derive(Debug, Clone)]
pub struct AwsConfig {
    path: PathBuf,
    doc: IniDocument,
}

impl AwsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Ok(Self::parse(path, &text))
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            doc: IniDocument::parse(text),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw section identifiers, e.g. `default`, `profile dev`, `sso-session corp`.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.doc.sections()
    }

    /// Every named profile, i.e. all profile sections except `default`.
    pub fn named_profiles(&self) -> BTreeSet<String> {
        self.sections()
            .filter(|s| !s.starts_with(SSO_SESSION_PREFIX) && !s.starts_with(SERVICES_PREFIX))
            .map(|s| s.strip_prefix(PROFILE_PREFIX).unwrap_or(s))
            .filter(|name| *name != DEFAULT_PROFILE)
            .map(str::to_string)
            .collect()
    }

    /// `default` is looked up bare first; named profiles prefixed first.
    fn profile_section(&self, profile: &str) -> Option<String> {
        let prefixed = format!("{PROFILE_PREFIX}{profile}");
        let candidates = if profile == DEFAULT_PROFILE {
            [profile.to_string(), prefixed]
        } else {
            [prefixed, profile.to_string()]
        };
        candidates
            .into_iter()
            .find(|name| self.doc.has_section(name))
    }

    pub fn profile(&self, profile: &str) -> Result<ProfileView<'_>> {
        let section = self
            .profile_section(profile)
            .ok_or_else(|| SyncError::ProfileNotFound(profile.to_string()))?;
        Ok(ProfileView {
            config: self,
            name: profile.to_string(),
            section,
        })
    }

    pub fn sso_session(&self, session: &str, key: &str) -> Option<&str> {
        self.doc.get(&format!("{SSO_SESSION_PREFIX}{session}"), key)
    }
}

/// Read-only view of one profile section.
#[derive(Debug, Clone)]
pub struct ProfileView<'a> {
    config: &'a AwsConfig,
    name: String,
    section: String,
}

impl<'a> ProfileView<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.config.doc.get(&self.section, key)
    }

    pub fn require(&self, key: &'static str) -> Result<&'a str> {
        self.get(key).ok_or_else(|| SyncError::MissingSetting {
            profile: self.name.clone(),
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "\
[default]
sso_start_url = https://corp.awsapps.com/start
sso_region = us-east-1

[profile dev]
sso_session = corp
sso_account_id = 111111111111
sso_role_name = Developer
region = ap-southeast-2

[profile prod]
region = us-west-2

[legacy]
region = eu-west-1

[sso-session corp]
sso_start_url = https://corp.awsapps.com/start
sso_region = us-east-1
";

    fn config() -> AwsConfig {
        AwsConfig::parse("/tmp/config", CONFIG)
    }

    #[test]
    fn test_named_profiles_exclude_default_and_sessions() {
        let names: Vec<_> = config().named_profiles().into_iter().collect();
        assert_eq!(names, vec!["dev", "legacy", "prod"]);
    }

    #[test]
    fn test_prefixed_default_is_not_a_named_profile() {
        let cfg = AwsConfig::parse(
            "/tmp/config",
            "[profile default]\nsso_session = corp\n\n[profile dev]\nregion = x\n",
        );
        let names: Vec<_> = cfg.named_profiles().into_iter().collect();
        assert_eq!(names, vec!["dev"]);

        let default = cfg.profile("default").unwrap();
        assert_eq!(default.get("sso_session"), Some("corp"));
    }

    #[test]
    fn test_bare_default_wins_over_prefixed() {
        let cfg = AwsConfig::parse(
            "/tmp/config",
            "[profile default]\nregion = eu-west-1\n\n[default]\nregion = us-east-1\n",
        );
        assert!(cfg.named_profiles().is_empty());
        assert_eq!(cfg.profile("default").unwrap().get("region"), Some("us-east-1"));
    }

    #[test]
    fn test_profile_lookup() {
        let cfg = config();
        let dev = cfg.profile("dev").unwrap();
        assert_eq!(dev.get("sso_role_name"), Some("Developer"));
        assert_eq!(cfg.profile("legacy").unwrap().get("region"), Some("eu-west-1"));
        assert!(cfg.profile("default").is_ok());
        assert!(matches!(
            cfg.profile("ghost"),
            Err(SyncError::ProfileNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let cfg = config();
        let prod = cfg.profile("prod").unwrap();
        let err = prod.require("sso_role_name").unwrap_err();
        assert_eq!(err.to_string(), "Profile `prod` is missing `sso_role_name`");
    }

    #[test]
    fn test_sso_session_lookup() {
        let cfg = config();
        assert_eq!(cfg.sso_session("corp", "sso_region"), Some("us-east-1"));
        assert_eq!(cfg.sso_session("other", "sso_region"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AwsConfig::load(&dir.path().join("config")).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
