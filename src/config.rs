//! Configuration file handling for qtsync.
//!
//! The configuration file is stored at `$QTSYNC_HOME/config.json` and contains the
//! target spreadsheet name, the tracked users, and the column mappings that say
//! where each user's account values land in the sheet.

use crate::model::cell::{column_left, is_column_letter};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "qtsync";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const SERVICE_ACCOUNT_JSON: &str = "service_account.json";
const QT_AUTH_JSON: &str = "qt_auth.json";
const CONFIG_JSON: &str = "config.json";
const DEFAULT_WORKSHEET: &str = "Sheet1";

/// The `Config` object represents the configuration of the app. You instantiate it by
/// providing the path to `$QTSYNC_HOME` and from there it loads
/// `$QTSYNC_HOME/config.json`. It provides paths to the secrets files that are
/// expected in a certain location within the qtsync home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory, its subdirectories and:
    /// - Creates an initial `config.json` file using `spreadsheet_name` along with
    ///   default settings. The users and column mappings start empty and must be
    ///   filled in by hand before the first run.
    /// - Moves `key_file` into its default location in the data dir.
    /// - Creates an empty Questrade token file.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory, e.g.
    ///   `$HOME/qtsync`
    /// - `key_file` - The downloaded Google service account key JSON. This will be
    ///   moved from the `key_file` path to its default location and name in the data
    ///   directory.
    /// - `spreadsheet_name` - The name of the Google Sheet document where the account
    ///   history is recorded, e.g. "Investment Accounts".
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(
        dir: impl Into<PathBuf>,
        key_file: &Path,
        spreadsheet_name: &str,
    ) -> Result<Self> {
        // Create the directory if it does not exist
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the qtsync home directory")?;

        // Canonicalize the directory path
        let root = utils::canonicalize(&maybe_relative).await?;

        // Create the secrets subdirectory
        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        // Move the Google service account key to its default location in the data dir
        let key_destination = secrets_dir.join(SERVICE_ACCOUNT_JSON);
        utils::rename(key_file, key_destination).await?;
        let config_path = root.join(CONFIG_JSON);

        // Create an empty Questrade token file so that 'token set' has a file to load
        let _ = crate::credentials::TokenStore::create(secrets_dir.join(QT_AUTH_JSON)).await?;

        // Create and save an initial ConfigFile in the datastore
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            spreadsheet_name: spreadsheet_name.to_string(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            users: Vec::new(),
            columns: Vec::new(),
            track_deposits: false,
            percent_columns: Vec::new(),
        };
        config_file.save(&config_path).await?;

        // Return a new `Config` object that represents a data directory that is ready
        // to be filled in
        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
        })
    }

    /// This will
    /// - validate that the `qtsync_home` exists and that the config file exists
    /// - load and validate the config file, failing fast on an incomplete or
    ///   inconsistent column setup
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(qtsync_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = qtsync_home.into();
        let root = utils::canonicalize(&maybe_relative).await?;

        // Validate that the home directory exists.
        let _ = utils::read_dir(&root)
            .await
            .context("Qtsync Home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn spreadsheet_name(&self) -> &str {
        &self.config_file.spreadsheet_name
    }

    pub fn worksheet(&self) -> &str {
        &self.config_file.worksheet
    }

    pub fn users(&self) -> &[String] {
        &self.config_file.users
    }

    pub fn track_deposits(&self) -> bool {
        self.config_file.track_deposits
    }

    pub fn percent_columns(&self) -> &[String] {
        &self.config_file.percent_columns
    }

    /// Resolve the column mapping for a (user, account type) combination. An account
    /// returned by the Questrade API with no mapping entry is an error, not a silent
    /// skip, so a misconfigured sheet fails loudly instead of dropping data.
    pub(crate) fn column_for(&self, user: &str, account_type: &str) -> Result<&ColumnMapping> {
        self.config_file
            .columns
            .iter()
            .find(|m| m.user == user && m.account_type == account_type)
            .with_context(|| {
                format!(
                    "No column mapping is configured for user '{user}' and account type \
                    '{account_type}'. Add an entry to the 'columns' list in {}",
                    self.config_path.display()
                )
            })
    }

    /// Path to the Google service account key file.
    pub fn service_account_key_path(&self) -> PathBuf {
        self.secrets.join(SERVICE_ACCOUNT_JSON)
    }

    /// Path to the Questrade refresh token file.
    pub fn qt_auth_path(&self) -> PathBuf {
        self.secrets.join(QT_AUTH_JSON)
    }

    /// Build an in-memory config with no backing directory.
    #[cfg(test)]
    pub(crate) fn new_for_tests(
        users: Vec<String>,
        columns: Vec<ColumnMapping>,
        track_deposits: bool,
        percent_columns: Vec<String>,
    ) -> Self {
        Self {
            root: PathBuf::new(),
            secrets: PathBuf::new(),
            config_path: PathBuf::new(),
            config_file: ConfigFile {
                app_name: APP_NAME.to_string(),
                config_version: CONFIG_VERSION,
                spreadsheet_name: "Investment Accounts".to_string(),
                worksheet: DEFAULT_WORKSHEET.to_string(),
                users,
                columns,
                track_deposits,
                percent_columns,
            },
        }
    }
}

/// One row of the (user, account type) -> column lookup. `equity` receives the
/// account's CAD total equity; `deposit` receives the day's net deposit or
/// withdrawal and is required when deposit tracking is on.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ColumnMapping {
    pub(crate) user: String,
    pub(crate) account_type: String,
    pub(crate) equity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) deposit: Option<String>,
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "qtsync",
///   "config_version": 1,
///   "spreadsheet_name": "Investment Accounts",
///   "worksheet": "Sheet1",
///   "users": ["jordan", "danelle"],
///   "columns": [
///     { "user": "jordan", "account_type": "TFSA", "equity": "B", "deposit": "P" },
///     { "user": "danelle", "account_type": "TFSA", "equity": "D", "deposit": "R" }
///   ],
///   "track_deposits": true,
///   "percent_columns": ["C", "E"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "qtsync"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Name of the Google Sheet document to record into
    spreadsheet_name: String,

    /// Title of the worksheet tab holding the history rows. The REST API addresses
    /// ranges by tab title, so "first sheet" is expressed as the default tab name.
    #[serde(default = "default_worksheet")]
    worksheet: String,

    /// The tracked user identifiers, in the order their accounts are fetched
    users: Vec<String>,

    /// The (user, account type) -> column letter mappings
    columns: Vec<ColumnMapping>,

    /// When true, same-day deposits and withdrawals are fetched and recorded in each
    /// mapping's deposit column
    #[serde(default)]
    track_deposits: bool,

    /// Columns that receive a day-over-day percentage change. Each reads its equity
    /// value from the column one letter to its left. Empty disables the feature.
    #[serde(default)]
    percent_columns: Vec<String>,
}

fn default_worksheet() -> String {
    DEFAULT_WORKSHEET.to_string()
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path and validates it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the column setup
    /// is incomplete or inconsistent.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        // Validate app_name
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        config.validate()?;
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Fail fast on a column setup that would otherwise surface mid-run, after some
    /// cells have already been written.
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.users.is_empty(),
            "No users are configured. Add your user identifiers to the 'users' list."
        );
        ensure!(
            !self.spreadsheet_name.is_empty(),
            "The 'spreadsheet_name' setting is empty."
        );

        let users: HashSet<&str> = self.users.iter().map(String::as_str).collect();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for mapping in &self.columns {
            ensure!(
                users.contains(mapping.user.as_str()),
                "Column mapping references user '{}' which is not in the 'users' list",
                mapping.user
            );
            ensure!(
                seen.insert((mapping.user.as_str(), mapping.account_type.as_str())),
                "Duplicate column mapping for user '{}' and account type '{}'",
                mapping.user,
                mapping.account_type
            );
            ensure!(
                is_column_letter(&mapping.equity),
                "'{}' is not a column letter (expected e.g. 'B' or 'AB')",
                mapping.equity
            );
            if let Some(deposit) = &mapping.deposit {
                ensure!(
                    is_column_letter(deposit),
                    "'{deposit}' is not a column letter (expected e.g. 'P' or 'AB')"
                );
            } else if self.track_deposits {
                bail!(
                    "Deposit tracking is on, but the column mapping for user '{}' and \
                    account type '{}' has no 'deposit' column",
                    mapping.user,
                    mapping.account_type
                );
            }
        }

        for user in &self.users {
            ensure!(
                self.columns.iter().any(|m| &m.user == user),
                "User '{user}' has no column mappings"
            );
        }

        for column in &self.percent_columns {
            // column_left also rejects invalid letters and column A.
            let _ = column_left(column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_file() -> ConfigFile {
        ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            spreadsheet_name: "Investment Accounts".to_string(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            users: vec!["jordan".to_string(), "danelle".to_string()],
            columns: vec![
                ColumnMapping {
                    user: "jordan".to_string(),
                    account_type: "TFSA".to_string(),
                    equity: "B".to_string(),
                    deposit: Some("P".to_string()),
                },
                ColumnMapping {
                    user: "danelle".to_string(),
                    account_type: "TFSA".to_string(),
                    equity: "D".to_string(),
                    deposit: Some("R".to_string()),
                },
            ],
            track_deposits: true,
            percent_columns: vec!["C".to_string()],
        }
    }

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("qtsync_home");
        let key_source_file = dir.path().join("key.json");
        let key_content = "{\"type\": \"service_account\"}";
        utils::write(&key_source_file, key_content).await.unwrap();

        // Run the function under test:
        let config = Config::create(&home_dir, &key_source_file, "Investment Accounts")
            .await
            .unwrap();

        // Check some values on the config object
        assert_eq!("Investment Accounts", config.spreadsheet_name());
        assert_eq!(DEFAULT_WORKSHEET, config.worksheet());

        // The key was moved into the secrets dir and the token file was created
        let found_key_content = utils::read(&config.service_account_key_path())
            .await
            .unwrap();
        assert_eq!(key_content, found_key_content);
        assert!(config.qt_auth_path().is_file());
    }

    #[tokio::test]
    async fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("qtsync_home");
        let key_file = dir.path().join("key.json");
        utils::write(&key_file, "{}").await.unwrap();
        let created = Config::create(&home_dir, &key_file, "Investment Accounts")
            .await
            .unwrap();

        // The starter config has no users, so loading must fail fast.
        assert!(Config::load(&home_dir).await.is_err());

        // Fill it in and load again.
        config_file().save(created.config_path()).await.unwrap();
        let config = Config::load(&home_dir).await.unwrap();
        assert_eq!(config.users(), &["jordan", "danelle"]);
        assert!(config.track_deposits());
        assert_eq!(config.percent_columns(), &["C"]);
        assert_eq!(config.column_for("jordan", "TFSA").unwrap().equity, "B");
        assert!(config.column_for("jordan", "RRSP").is_err());
    }

    #[test]
    fn test_validate_ok() {
        assert!(config_file().validate().is_ok());
    }

    #[test]
    fn test_validate_empty_users() {
        let mut config = config_file();
        config.users.clear();
        config.columns.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_user_without_mapping() {
        let mut config = config_file();
        config.users.push("jasper".to_string());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jasper"));
    }

    #[test]
    fn test_validate_unknown_user_in_mapping() {
        let mut config = config_file();
        config.columns[0].user = "stranger".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_mapping() {
        let mut config = config_file();
        let duplicate = config.columns[0].clone();
        config.columns.push(duplicate);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Duplicate"));
    }

    #[test]
    fn test_validate_bad_column_letter() {
        let mut config = config_file();
        config.columns[0].equity = "b2".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_deposit_column() {
        let mut config = config_file();
        config.columns[0].deposit = None;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("deposit"));
    }

    #[test]
    fn test_validate_percent_column_a() {
        let mut config = config_file();
        config.percent_columns = vec!["A".to_string()];
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original = config_file();
        original.save(&config_path).await.unwrap();
        let loaded = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut config = config_file();
        config.app_name = "wrong_app".to_string();
        config.save(&config_path).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        // worksheet, track_deposits and percent_columns are all optional.
        let json = r#"{
            "app_name": "qtsync",
            "config_version": 1,
            "spreadsheet_name": "Investment Accounts",
            "users": ["jordan"],
            "columns": [
                { "user": "jordan", "account_type": "TFSA", "equity": "B" }
            ]
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.worksheet, DEFAULT_WORKSHEET);
        assert!(!config.track_deposits);
        assert!(config.percent_columns.is_empty());
    }
}
