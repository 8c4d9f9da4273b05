//! Implements the `Sheet` trait using the `sheets::Client` to interact with a
//! Google sheet, plus the Drive lookup that resolves a spreadsheet name to an id.

use crate::api::{Sheet, TokenProvider};
use crate::{Config, Result};
use anyhow::{bail, Context};
use serde::Deserialize;
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use std::time::Duration;
use tracing::{debug, trace};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Implements the `Sheet` trait against the Google Sheets API. It takes a
/// `TokenProvider`, from which it mints a fresh access token before each operation.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    worksheet: String,
    token_provider: TokenProvider,
    client: sheets::Client,
}

impl GoogleSheet {
    /// Authenticates with the service account key and resolves the configured
    /// spreadsheet name to an id through the Drive API.
    pub(super) async fn connect(config: &Config) -> Result<Self> {
        let token_provider = TokenProvider::load(&config.service_account_key_path()).await?;
        let access_token = token_provider.token().await?;
        let spreadsheet_id =
            find_spreadsheet_id(&access_token, config.spreadsheet_name()).await?;
        debug!(
            "Opened spreadsheet '{}' ({spreadsheet_id})",
            config.spreadsheet_name()
        );
        let client = new_sheets_client(&access_token);
        Ok(Self {
            spreadsheet_id,
            worksheet: config.worksheet().to_string(),
            token_provider,
            client,
        })
    }

    /// Refreshes the sheets client with a new access token if needed
    async fn refresh_client(&mut self) -> Result<()> {
        let access_token = self.token_provider.token().await?;
        self.client = new_sheets_client(&access_token);
        Ok(())
    }

    /// Qualifies an address or column fragment with the worksheet tab title.
    fn range(&self, fragment: &str) -> String {
        format!("{}!{}", self.worksheet, fragment)
    }

    async fn get_values(&mut self, range: &str) -> Result<Vec<Vec<String>>> {
        self.refresh_client().await?;
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to read range {range}"))?;
        Ok(response.body.values)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn read_column(&mut self, column: &str) -> Result<Vec<String>> {
        trace!("read_column {column}");
        let range = self.range(&format!("{column}:{column}"));
        let rows = self.get_values(&range).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn read_cell(&mut self, addr: &str) -> Result<String> {
        trace!("read_cell {addr}");
        let range = self.range(addr);
        let rows = self.get_values(&range).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    async fn write_cell(&mut self, addr: &str, value: &str) -> Result<()> {
        trace!("write_cell {addr} = {value}");
        self.refresh_client().await?;
        let request = BatchUpdateValuesRequest {
            data: vec![ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: self.range(addr),
                values: vec![vec![value.to_string()]],
            }],
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::UserEntered),
        };
        self.client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to write cell {addr}"))?;
        Ok(())
    }
}

/// Creates a new sheets client around an access token.
fn new_sheets_client(access_token: &str) -> sheets::Client {
    // Note: The sheets crate requires client_id, client_secret, and redirect_uri,
    // but we don't need them for API calls, only the access token
    sheets::Client::new(
        String::new(), // client_id (not needed for API calls with access token)
        String::new(), // client_secret (not needed for API calls with access token)
        String::new(), // redirect_uri (not needed for API calls with access token)
        access_token.to_string(),
        String::new(), // refresh_token (not needed, we mint tokens ourselves)
    )
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

/// Resolves a spreadsheet name to a file id using the Drive API.
///
/// GET https://www.googleapis.com/drive/v3/files?q=name='...'
pub(super) async fn find_spreadsheet_id(access_token: &str, name: &str) -> Result<String> {
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("Failed to construct the HTTP client")?;
    let query = format!(
        "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
        name.replace('\'', "\\'")
    );
    let response = http
        .get(DRIVE_FILES_URL)
        .query(&[("q", query.as_str()), ("fields", "files(id, name)")])
        .bearer_auth(access_token)
        .send()
        .await
        .context("Failed to send the spreadsheet lookup request to the Drive API")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        bail!("Drive API spreadsheet lookup failed with status {status}: {body}");
    }

    let list: DriveFileList = response
        .json()
        .await
        .context("Failed to parse the Drive API response")?;
    let file = list.files.into_iter().next().with_context(|| {
        format!(
            "No spreadsheet named '{name}' is visible to the service account. \
            Make sure the document is shared with the service account's email address."
        )
    })?;
    debug!("Drive lookup matched '{}' -> {}", file.name, file.id);
    Ok(file.id)
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    Err::<(), ClientError>(e).context(error_name).err().unwrap()
}
