//! External collaborators behind narrow trait seams: the Questrade REST API
//! (`Broker`) and the Google Sheet (`Sheet`).

mod questrade;
mod sheet;
mod test_sheet;
mod token;

use crate::model::{Account, Activity, CombinedBalance, Session};
use crate::{Config, Result};

pub(crate) use questrade::QuestradeClient;
pub(crate) use test_sheet::TestSheet;
pub(crate) use token::TokenProvider;

// The Drive scope covers both the name-based spreadsheet lookup (Drive files API)
// and the Sheets value reads/writes.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// Selects the `Sheet` implementation. When QTSYNC_IN_TEST_MODE is set and non-zero
/// in length the in-memory `TestSheet` is used, which lets the whole binary run
/// without touching Google.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Google,
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var("QTSYNC_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Read and write cells of the target worksheet.
#[async_trait::async_trait]
pub(crate) trait Sheet: Send {
    /// The contiguous values of a column starting at row 1. The next insertion row
    /// is one past the end of the anchor column.
    async fn read_column(&mut self, column: &str) -> Result<Vec<String>>;

    /// The text of a single cell, empty string when the cell is blank.
    async fn read_cell(&mut self, addr: &str) -> Result<String>;

    /// Write a single cell.
    async fn write_cell(&mut self, addr: &str, value: &str) -> Result<()>;
}

/// The Questrade API operations the orchestrator needs.
#[async_trait::async_trait]
pub(crate) trait Broker: Send {
    /// Exchange the user's stored refresh token for a session, persisting the
    /// replacement refresh token.
    async fn login(&mut self, user: &str) -> Result<Session>;

    /// The accounts visible to the session.
    async fn accounts(&self, session: &Session) -> Result<Vec<Account>>;

    /// The per-currency combined balances of one account.
    async fn balances(&self, session: &Session, account: &str) -> Result<Vec<CombinedBalance>>;

    /// The account's activities within a time range (RFC 3339 with offset).
    async fn activities(
        &self,
        session: &Session,
        account: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Activity>>;
}

/// Constructs the `Sheet` for the given mode.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Result<Box<dyn Sheet>> {
    match mode {
        Mode::Google => Ok(Box::new(sheet::GoogleSheet::connect(config).await?)),
        Mode::Test => Ok(Box::new(TestSheet::new())),
    }
}

/// Verifies Google access without writing anything: mints a service-account token
/// and locates the configured spreadsheet by name. Returns the spreadsheet id.
pub(crate) async fn verify_sheet_access(config: &Config) -> Result<String> {
    let token_provider = TokenProvider::load(&config.service_account_key_path()).await?;
    let access_token = token_provider.token().await?;
    sheet::find_spreadsheet_id(&access_token, config.spreadsheet_name()).await
}
