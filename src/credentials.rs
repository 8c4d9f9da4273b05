//! Durable storage for Questrade refresh tokens.
//!
//! The token file is a flat JSON object mapping `questrade_token_<user>` keys to
//! refresh token strings. Questrade refresh tokens are single use, so the file is
//! rewritten after every successful login. There is no locking: the program is
//! designed for one scheduled invocation per day, and concurrent runs would race
//! on this file (last writer wins).

use crate::{utils, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const TOKEN_KEY_PREFIX: &str = "questrade_token_";

/// Reads and writes the refresh token file. Holds the whole mapping in memory
/// between `load` and `save`.
#[derive(Debug, Clone)]
pub(crate) struct TokenStore {
    path: PathBuf,
    tokens: BTreeMap<String, String>,
}

impl TokenStore {
    /// Load the token file. Fails if the file is missing or is not a JSON object of
    /// strings; there is no partial-read fallback.
    pub(crate) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tokens: BTreeMap<String, String> = utils::deserialize(&path)
            .await
            .context("Unable to read the Questrade token file")?;
        Ok(Self { path, tokens })
    }

    /// Write an empty token file. Used by `init` so that `token set` has a file to
    /// load.
    pub(crate) async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            tokens: BTreeMap::new(),
        };
        store.save().await?;
        Ok(store)
    }

    /// Get the stored refresh token for `user`.
    pub(crate) fn get(&self, user: &str) -> Result<&str> {
        let key = key(user);
        self.tokens.get(&key).map(String::as_str).with_context(|| {
            format!(
                "No Questrade refresh token is stored for '{user}'. \
                Run 'qtsync token set --user {user} --refresh-token <token>' to store one."
            )
        })
    }

    /// Replace the stored refresh token for `user`. Call `save` afterwards to
    /// persist the rotation.
    pub(crate) fn rotate(&mut self, user: &str, refresh_token: String) {
        self.tokens.insert(key(user), refresh_token);
    }

    /// Rewrite the whole token file.
    pub(crate) async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.tokens)
            .context("Unable to serialize the Questrade tokens")?;
        utils::write(&self.path, json)
            .await
            .context("Unable to write the Questrade token file")
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

fn key(user: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}{user}")
}
