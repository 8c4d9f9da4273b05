use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `spreadsheet_name` along with
///   default settings
/// - Moves `key_file` into its default location in the data dir
/// - Creates an empty Questrade token file
///
/// # Arguments
/// - `qtsync_home` - The directory that will be the root of the data directory, e.g.
///   `$HOME/qtsync`
/// - `key_file` - The downloaded Google service account key JSON. This will be moved
///   from the `key_file` path to its default location and name in the data directory.
/// - `spreadsheet_name` - The name of the Google Sheet document where the account
///   history is recorded.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(qtsync_home: &Path, key_file: &Path, spreadsheet_name: &str) -> Result<Out<()>> {
    let _config = Config::create(qtsync_home, key_file, spreadsheet_name)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(
        "Successfully created the qtsync directory and config. Next: list your users and \
        column mappings in config.json, then store each user's Questrade refresh token \
        with 'qtsync token set'."
            .into(),
    )
}
