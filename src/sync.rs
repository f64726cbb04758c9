//! Sync orchestration: special cases for `default`, then every selected
//! named profile in turn.

use crate::config::{AwsConfig, DEFAULT_PROFILE};
use crate::credentials::Credentials;
use crate::error::SyncError;
use crate::export::ExportSink;
use crate::selector::{self, ResolvedSelection};
use crate::updater::CredentialUpdater;
use tracing::{debug, error, warn};

/// What the user asked for on this invocation.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub export_vars: bool,
    pub default: bool,
    pub default_only: bool,
    pub profiles: Vec<String>,
    /// Set when invoked through `login`, even without `--profile`.
    pub login: bool,
}

impl SyncRequest {
    /// Any explicit indication of which profiles to sync.
    fn has_selector(&self) -> bool {
        self.default || self.default_only || !self.profiles.is_empty() || self.login
    }
}

/// Which path through the state machine a run took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    ExportOnly,
    DefaultOnly,
    /// `login --this`
    LoginOnly,
    AllSelected,
}

#[derive(Debug)]
pub enum SyncOutcome {
    Synced(Credentials),
    Skipped(String),
    Failed(SyncError),
}

#[derive(Debug)]
pub struct SyncReport {
    pub path: SyncPath,
    pub outcomes: Vec<(String, SyncOutcome)>,
}

impl SyncReport {
    pub fn synced(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SyncOutcome::Synced(_)))
            .map(|(name, _)| name.as_str())
    }
}

/// Request-scoped driver; owns the resolved selection for this run only.
pub struct Orchestrator<'a, U, E> {
    config: &'a AwsConfig,
    updater: &'a U,
    sink: &'a mut E,
    request: SyncRequest,
    outcomes: Vec<(String, SyncOutcome)>,
}

impl<'a, U: CredentialUpdater, E: ExportSink> Orchestrator<'a, U, E> {
    pub fn new(config: &'a AwsConfig, updater: &'a U, sink: &'a mut E, request: SyncRequest) -> Self {
        Self {
            config,
            updater,
            sink,
            request,
            outcomes: Vec::new(),
        }
    }

    pub async fn run(mut self) -> SyncReport {
        // `ssosync -e` is mostly piped into a shell; don't sync everything
        if self.request.export_vars && !self.request.has_selector() {
            self.sync_one(DEFAULT_PROFILE, None).await;
            return self.finish(SyncPath::ExportOnly);
        }

        if self.request.default || self.request.default_only {
            self.sync_one(DEFAULT_PROFILE, None).await;
            if self.request.default_only {
                return self.finish(SyncPath::DefaultOnly);
            }
        }

        let selection = self.select();
        debug!("Syncing named profiles: {:?}", selection.profiles);
        for profile in &selection.profiles {
            self.sync_one(profile, selection.rename_of(profile)).await;
        }
        self.finish(SyncPath::AllSelected)
    }

    /// Syncs just `profile`, exporting it if requested.
    pub async fn run_single(mut self, profile: &str) -> SyncReport {
        self.sync_one(profile, None).await;
        self.finish(SyncPath::LoginOnly)
    }

    fn select(&self) -> ResolvedSelection {
        let universe = self.config.named_profiles();
        debug!("Current named profiles in config: {:?}", universe);

        let selection = selector::resolve(&self.request.profiles, &universe, self.config.path());
        for reason in &selection.skipped {
            warn!("{}", reason);
        }
        for (old, new) in &selection.resolved.renames {
            debug!("Renaming profile {} to {}", old, new);
        }
        selection.resolved
    }

    /// Runs the updater for one profile; failures are recorded, never raised.
    async fn sync_one(&mut self, profile: &str, rename_to: Option<&str>) {
        let outcome = match self.updater.update(profile, self.config, rename_to).await {
            Ok(credentials) => {
                if self.request.export_vars {
                    self.sink.emit(profile, &credentials);
                }
                SyncOutcome::Synced(credentials)
            }
            Err(e) if e.is_skip() => {
                warn!("{}", e);
                SyncOutcome::Skipped(e.to_string())
            }
            Err(e) => {
                error!("Failed to sync profile `{}`: {}", profile, e);
                SyncOutcome::Failed(e)
            }
        };
        self.outcomes.push((profile.to_string(), outcome));
    }

    fn finish(self, path: SyncPath) -> SyncReport {
        SyncReport {
            path,
            outcomes: self.outcomes,
        }
    }
}
