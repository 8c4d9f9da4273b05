//! These structs provide the CLI interface for the qtsync CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// qtsync: records Questrade account balances into a Google Sheet.
///
/// Once a day (scheduled externally, e.g. with cron), `qtsync update` logs into the
/// Questrade API with each user's stored refresh token, fetches account balances and
/// same-day deposits or withdrawals, and appends a row to a Google Sheet.
///
/// You will need a Google service account key with access to the target spreadsheet,
/// and a Questrade refresh token for each tracked user. See the README for setup.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run when setting up the qtsync CLI. You
    /// need to get a few things ready beforehand.
    ///
    /// - Decide what directory you want to store data in and pass this as
    ///   --qtsync-home. By default, it will be $HOME/qtsync.
    ///
    /// - Create a Google service account with access to your spreadsheet and download
    ///   its JSON key. You will pass this as --service-account-key.
    ///
    /// - Know the name of the Google Sheet document you want to record into and pass
    ///   it as --spreadsheet-name.
    ///
    /// After init, edit config.json to list your users and column mappings, then store
    /// each user's Questrade refresh token with 'qtsync token set'.
    Init(InitArgs),

    /// Verify Google access: mint a service-account token and locate the spreadsheet.
    Auth(AuthArgs),

    /// Manage stored Questrade refresh tokens.
    Token(TokenArgs),

    /// Fetch balances and activities and record them in today's spreadsheet row.
    Update,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where qtsync data and configuration is held. Defaults to ~/qtsync
    #[arg(long, env = "QTSYNC_HOME", default_value_t = default_qtsync_home())]
    qtsync_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, qtsync_home: PathBuf) -> Self {
        Self {
            log_level,
            qtsync_home: qtsync_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn qtsync_home(&self) -> &DisplayPath {
        &self.qtsync_home
    }
}

/// Args for the `qtsync init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The name of the Google Sheet document to record into, e.g. "Investment Accounts".
    /// The document must be shared with the service account.
    #[arg(long)]
    spreadsheet_name: String,

    /// The path to your downloaded Google service account key. This file will be moved
    /// to the default secrets location in the main data directory.
    #[arg(long)]
    service_account_key: PathBuf,
}

impl InitArgs {
    pub fn new(spreadsheet_name: impl Into<String>, service_account_key: impl Into<PathBuf>) -> Self {
        Self {
            spreadsheet_name: spreadsheet_name.into(),
            service_account_key: service_account_key.into(),
        }
    }

    pub fn spreadsheet_name(&self) -> &str {
        &self.spreadsheet_name
    }

    pub fn service_account_key(&self) -> &Path {
        &self.service_account_key
    }
}

/// Args for the `qtsync auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify authentication without making any writes. This is currently the only
    /// behavior of the auth command; the flag exists for forward compatibility.
    #[arg(long, default_value_t = true)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// Args for the `qtsync token` command.
#[derive(Debug, Parser, Clone)]
pub struct TokenArgs {
    #[command(subcommand)]
    action: TokenSubcommand,
}

impl TokenArgs {
    pub fn action(&self) -> &TokenSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TokenSubcommand {
    /// Store (or replace) the Questrade refresh token for a user.
    ///
    /// Questrade refresh tokens are single use: each successful login invalidates the
    /// old token and stores its replacement automatically. You only need this command
    /// for the initial seed, or after a token has been invalidated out-of-band.
    Set(TokenSetArgs),
}

/// Args for the `qtsync token set` command.
#[derive(Debug, Parser, Clone)]
pub struct TokenSetArgs {
    /// The user identifier, as listed in config.json.
    #[arg(long)]
    user: String,

    /// The refresh token generated from the Questrade account management page.
    #[arg(long)]
    refresh_token: String,
}

impl TokenSetArgs {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

fn default_qtsync_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("qtsync"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --qtsync-home or QTSYNC_HOME instead of relying on the default \
                qtsync home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("qtsync")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
