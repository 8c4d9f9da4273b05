//! The Questrade REST client: refresh-token login and authenticated GET calls.
//!
//! Questrade's OAuth flow rotates refresh tokens: every exchange invalidates the
//! token that was used and issues a replacement. `login` persists the replacement
//! through the `TokenStore` before returning, so a crash later in the run does not
//! lock the next run out.

use crate::api::Broker;
use crate::credentials::TokenStore;
use crate::model::{
    Account, AccountsResponse, ActivitiesResponse, Activity, BalancesResponse, CombinedBalance,
    Session,
};
use crate::Result;
use anyhow::{bail, Context};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const LOGIN_URL: &str = "https://login.questrade.com/oauth2/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Implements the `Broker` trait against the Questrade REST API.
pub(crate) struct QuestradeClient {
    http: reqwest::Client,
    store: TokenStore,
    login_url: String,
}

impl QuestradeClient {
    pub(crate) fn new(store: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to construct the HTTP client")?;
        Ok(Self {
            http,
            store,
            login_url: LOGIN_URL.to_string(),
        })
    }

    /// Points the login at a stand-in token endpoint.
    #[cfg(test)]
    pub(crate) fn with_login_url(store: TokenStore, login_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(store)?;
        client.login_url = login_url.into();
        Ok(client)
    }

    /// One authenticated GET against the session's api server, decoded into `T`.
    async fn call<T>(
        &self,
        session: &Session,
        endpoint: &str,
        account: Option<&str>,
        range: Option<(&str, &str)>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = request_url(&session.api_server, endpoint, account, range);
        debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .header(
                "Authorization",
                format!("{} {}", session.token_type, session.access_token),
            )
            .send()
            .await
            .with_context(|| format!("The Questrade '{endpoint}' request failed"))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("The Questrade '{endpoint}' call failed with status {status}");
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode the Questrade '{endpoint}' response"))
    }
}

#[async_trait::async_trait]
impl Broker for QuestradeClient {
    async fn login(&mut self, user: &str) -> Result<Session> {
        let refresh_token = self.store.get(user)?.to_string();
        let url = format!(
            "{}?grant_type=refresh_token&refresh_token={refresh_token}",
            self.login_url
        );
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .with_context(|| format!("The Questrade login request for '{user}' failed"))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("Questrade rejected the login for '{user}' with status {status}");
        }
        let session: Session = response
            .json()
            .await
            .context("Failed to decode the Questrade login response")?;

        // The refresh token we just used is now dead. Persist its replacement before
        // anything else can fail.
        self.store.rotate(user, session.refresh_token.clone());
        self.store.save().await?;
        debug!(
            "Logged in '{user}', access token expires in {}s",
            session.expires_in
        );
        Ok(session)
    }

    async fn accounts(&self, session: &Session) -> Result<Vec<Account>> {
        let response: AccountsResponse = self.call(session, "accounts", None, None).await?;
        Ok(response.accounts)
    }

    async fn balances(&self, session: &Session, account: &str) -> Result<Vec<CombinedBalance>> {
        let response: BalancesResponse =
            self.call(session, "balances", Some(account), None).await?;
        Ok(response.combined_balances)
    }

    async fn activities(
        &self,
        session: &Session,
        account: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Activity>> {
        let response: ActivitiesResponse = self
            .call(session, "activities", Some(account), Some((start, end)))
            .await?;
        Ok(response.activities)
    }
}

/// Builds a Questrade request URL. Pure function of its inputs:
/// - no account: `<api_server>v1/<endpoint>`
/// - account: `<api_server>v1/accounts/<account>/<endpoint>`
/// - account and range: the above plus `?startTime=<s>&endTime=<e>&`
///
/// The `api_server` from the login response carries a trailing slash, and the
/// ranged form carries a trailing `&`, both matching the server's expectations.
fn request_url(
    api_server: &str,
    endpoint: &str,
    account: Option<&str>,
    range: Option<(&str, &str)>,
) -> String {
    match (account, range) {
        (None, _) => format!("{api_server}v1/{endpoint}"),
        (Some(account), None) => format!("{api_server}v1/accounts/{account}/{endpoint}"),
        (Some(account), Some((start, end))) => format!(
            "{api_server}v1/accounts/{account}/{endpoint}?startTime={start}&endTime={end}&"
        ),
    }
}
