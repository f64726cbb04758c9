use crate::awscli::DEFAULT_AWS_BIN;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ssosync")]
#[command(about = "Sync all named profiles when calling without any arguments", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Sync AWS default profile and all named profiles
    #[arg(long)]
    pub default: bool,

    /// Sync AWS default profile only and exit
    #[arg(long)]
    pub default_only: bool,

    /// Sync specified AWS named profiles (`name`, `prefix*` or `old:new`)
    #[arg(short, long, num_args = 0.., value_name = "PROFILE")]
    pub profiles: Option<Vec<String>>,

    /// AWS CLI v2 binary location (default to `aws` in PATH)
    #[arg(short, long, value_name = "BIN", default_value = DEFAULT_AWS_BIN)]
    pub bin: String,

    /// Debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Trace output
    #[arg(short, long)]
    pub trace: bool,

    /// Print out AWS ENV vars
    #[arg(short = 'e', long)]
    pub export_vars: bool,

    /// Print version and exit
    #[arg(short = 'v', long)]
    pub version: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Invoke aws sso login and sync all named profiles
    Login {
        /// Print out AWS ENV vars
        #[arg(short = 'e', long)]
        export_vars: bool,

        /// Login profile (use `default` or `AWS_PROFILE` if absent)
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,

        /// Only sync this login profile
        #[arg(long)]
        this: bool,
    },

    /// Print version and exit
    Version,
}

impl Cli {
    pub fn wants_version(&self) -> bool {
        self.version || matches!(self.command, Some(Command::Version))
    }

    pub fn export_vars(&self) -> bool {
        self.export_vars || matches!(self.command, Some(Command::Login { export_vars: true, .. }))
    }
}

pub fn version_line() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
