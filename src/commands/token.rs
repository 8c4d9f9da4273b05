//! The `qtsync token set` command: seeds or replaces a stored Questrade refresh
//! token.

use crate::commands::Out;
use crate::credentials::TokenStore;
use crate::{Config, Result};

pub async fn token_set(config: &Config, user: &str, refresh_token: &str) -> Result<Out<()>> {
    let mut store = TokenStore::load(config.qt_auth_path()).await?;
    store.rotate(user, refresh_token.to_string());
    store.save().await?;
    Ok(format!(
        "Stored the Questrade refresh token for '{user}' in {}",
        store.path().display()
    )
    .into())
}
