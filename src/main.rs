use clap::Parser;
use questrade_sync::args::{Args, Command, TokenSubcommand};
use questrade_sync::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().qtsync_home().path();

    // This allows for testing the program without hitting the Google APIs. When
    // QTSYNC_IN_TEST_MODE is set and non-zero in length, then the mode will be
    // Mode::Test, otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.service_account_key(),
            init_args.spreadsheet_name(),
        )
        .await?
        .print(),

        Command::Auth(_auth_args) => {
            let config = Config::load(home).await?;
            commands::auth_verify(&config).await?.print()
        }

        Command::Token(token_args) => {
            let config = Config::load(home).await?;
            match token_args.action() {
                TokenSubcommand::Set(set_args) => {
                    commands::token_set(&config, set_args.user(), set_args.refresh_token())
                        .await?
                        .print()
                }
            }
        }

        Command::Update => {
            let config = Config::load(home).await?;
            commands::update(config, mode).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "questrade_sync={},{}={}",
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
