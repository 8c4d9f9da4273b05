//! Google access tokens from a service account key.
//!
//! Unlike an installed-app OAuth flow there is no browser consent and no persisted
//! token file: `yup-oauth2` signs a JWT with the service account's private key and
//! exchanges it for a short-lived access token whenever one is needed.

use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::Context;
use std::path::Path;
use yup_oauth2::ServiceAccountKey;

/// Mints access tokens from the service account key loaded at construction.
pub(crate) struct TokenProvider {
    key: ServiceAccountKey,
}

impl TokenProvider {
    /// Loads and parses the service account key file.
    pub(crate) async fn load(key_path: &Path) -> Result<Self> {
        let key = yup_oauth2::read_service_account_key(key_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read the Google service account key at {}",
                    key_path.display()
                )
            })?;
        Ok(Self { key })
    }

    /// Returns a valid access token for the Drive scope. The authenticator handles
    /// the JWT exchange and caches tokens until near expiry.
    pub(crate) async fn token(&self) -> Result<String> {
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(self.key.clone())
            .build()
            .await
            .context("Failed to create the Google service account authenticator")?;
        let token = auth
            .token(OAUTH_SCOPES)
            .await
            .context("Failed to obtain a Google access token")?;
        let access_token = token
            .token()
            .context("Google returned an empty access token")?;
        Ok(access_token.to_string())
    }
}
