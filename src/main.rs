mod awscli;
mod cli;
mod config;
mod credentials;
mod error;
mod export;
mod ini;
mod logging;
mod selector;
mod sso;
mod sync;
mod updater;

use anyhow::{bail, Context};
use awscli::AwsCli;
use clap::Parser;
use cli::{Cli, Command};
use config::{AwsConfig, AwsPaths, DEFAULT_PROFILE};
use credentials::CredentialsStore;
use export::ShellExport;
use sso::SsoCache;
use std::env;
use sync::{Orchestrator, SyncOutcome, SyncRequest};
use tracing::{debug, trace};
use updater::SsoCredentialUpdater;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.wants_version() {
        println!("{}", cli::version_line());
        return Ok(());
    }

    logging::init(cli.debug, cli.trace);
    debug!("{}", cli::version_line());
    trace!("args: {:?}", cli);

    let paths = AwsPaths::from_env();
    trace!("AWS_CONFIG_FILE: {}", paths.config_file.display());
    trace!("AWS_SHARED_CREDENTIALS_FILE: {}", paths.credentials_file.display());
    trace!("AWS_SSO_CACHE_PATH: {}", paths.sso_cache_dir.display());

    let aws = AwsCli::new(&cli.bin);
    preflight(&paths, &aws).await?;

    let config = AwsConfig::load(&paths.config_file)
        .with_context(|| format!("Cannot read {}", paths.config_file.display()))?;
    let updater = SsoCredentialUpdater::new(
        SsoCache::new(&paths.sso_cache_dir),
        CredentialsStore::new(&paths.credentials_file),
    );
    let mut sink = ShellExport;

    let mut request = SyncRequest {
        export_vars: cli.export_vars(),
        default: cli.default,
        default_only: cli.default_only,
        profiles: cli.profiles.clone().unwrap_or_default(),
        login: false,
    };

    if let Some(Command::Login { profile, this, .. }) = &cli.command {
        let profile = profile
            .clone()
            .or_else(|| env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        aws.sso_login(&profile).await?;

        if *this {
            Orchestrator::new(&config, &updater, &mut sink, request)
                .run_single(&profile)
                .await;
            return Ok(());
        }
        request.login = true;
    }

    let report = Orchestrator::new(&config, &updater, &mut sink, request)
        .run()
        .await;

    for (profile, outcome) in &report.outcomes {
        match outcome {
            SyncOutcome::Synced(credentials) => {
                trace!("{}: expires {}", profile, credentials.expiration_rfc3339())
            }
            SyncOutcome::Skipped(reason) => debug!("{}: skipped ({})", profile, reason),
            SyncOutcome::Failed(e) => debug!("{}: failed ({})", profile, e),
        }
    }
    debug!(
        "Done ({:?}): {} of {} profiles synced",
        report.path,
        report.synced().count(),
        report.outcomes.len()
    );
    Ok(())
}

/// Checks the environment before touching any profile.
async fn preflight(paths: &AwsPaths, aws: &AwsCli) -> anyhow::Result<()> {
    if !paths.config_file.exists() {
        bail!("{} does not exist", paths.config_file.display());
    }
    if !paths.sso_cache_dir.exists() {
        bail!("{} does not exist", paths.sso_cache_dir.display());
    }

    let Some(bin) = aws.locate() else {
        bail!("Can not find AWS CLI v2 `{}` command.", aws.bin().display());
    };
    trace!("AWS CLI binary: {}", bin.display());

    aws.version().await?;
    Ok(())
}
