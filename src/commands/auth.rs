//! The `qtsync auth` command: verifies Google access without touching the sheet.

use crate::commands::Out;
use crate::{api, Config, Result};
use anyhow::Context;

/// Mints a service-account access token and resolves the configured spreadsheet
/// name through the Drive API. Nothing is written; a failure here means the daily
/// update would fail at the same step.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let spreadsheet_id = api::verify_sheet_access(config).await.context(
        "Unable to verify Google access. Check the service account key and make sure \
        the spreadsheet is shared with the service account's email address.",
    )?;
    Ok(format!(
        "Google access verified: found spreadsheet '{}' ({spreadsheet_id})",
        config.spreadsheet_name()
    )
    .into())
}
