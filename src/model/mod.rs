//! Data structures for the Questrade API responses and the value selection rules
//! applied to them.

pub(crate) mod cell;
pub(crate) mod money;

use crate::Result;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// The balances endpoint reports one combined balance per currency. Equity is
/// recorded in this currency.
pub(crate) const REFERENCE_CURRENCY: &str = "CAD";

/// Activity types that count as funding events. "Withdrawls" is how the Questrade
/// API spells it; the misspelling is part of the external contract and must not be
/// corrected here.
pub(crate) const FUNDING_TYPES: &[&str] = &["Deposits", "Withdrawls"];

/// The short-lived session returned by the Questrade token exchange. Only the
/// refresh token outlives the process (it is written back to the token store);
/// everything else is discarded at exit.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Session {
    pub(crate) access_token: String,
    pub(crate) api_server: String,
    pub(crate) expires_in: u64,
    pub(crate) refresh_token: String,
    pub(crate) token_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsResponse {
    pub(crate) accounts: Vec<Account>,
}

/// One brokerage account. The type tag (e.g. "TFSA", "RRSP") keys the column
/// mapping together with the owning user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Account {
    pub(crate) number: String,
    #[serde(rename = "type")]
    pub(crate) account_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BalancesResponse {
    pub(crate) combined_balances: Vec<CombinedBalance>,
}

/// A per-currency equity snapshot from the balances endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CombinedBalance {
    pub(crate) currency: String,
    pub(crate) total_equity: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivitiesResponse {
    pub(crate) activities: Vec<Activity>,
}

/// A dated transaction from the activities endpoint. Only the type tag and net
/// amount matter for funding detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Activity {
    #[serde(rename = "type")]
    pub(crate) activity_type: String,
    pub(crate) net_amount: Decimal,
}

/// Selects the CAD equity from a combined balances list. Questrade returns the
/// combined balances with CAD at index 0 or index 1 (a two-currency account layout
/// is assumed, matching what the endpoint actually returns).
pub(crate) fn cad_equity(balances: &[CombinedBalance]) -> Result<Decimal> {
    let balance = match balances.first() {
        Some(first) if first.currency == REFERENCE_CURRENCY => first,
        _ => balances
            .get(1)
            .context("No CAD entry found in the combined balances")?,
    };
    Ok(balance.total_equity)
}

/// Returns the net amount of the first deposit or withdrawal in the list, or zero
/// when there is none. At most one funding event per day is assumed.
pub(crate) fn net_funding(activities: &[Activity]) -> Decimal {
    for activity in activities {
        if FUNDING_TYPES.contains(&activity.activity_type.as_str()) {
            debug!("Matched funding activity: {activity:?}");
            return activity.net_amount;
        }
    }
    Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn balance(currency: &str, total_equity: &str) -> CombinedBalance {
        CombinedBalance {
            currency: currency.to_string(),
            total_equity: Decimal::from_str(total_equity).unwrap(),
        }
    }

    fn activity(activity_type: &str, net_amount: &str) -> Activity {
        Activity {
            activity_type: activity_type.to_string(),
            net_amount: Decimal::from_str(net_amount).unwrap(),
        }
    }

    #[test]
    fn test_cad_equity_at_index_zero() {
        let balances = vec![balance("CAD", "5000"), balance("USD", "3000")];
        assert_eq!(cad_equity(&balances).unwrap(), Decimal::from(5000));
    }

    #[test]
    fn test_cad_equity_at_index_one() {
        let balances = vec![balance("USD", "3000"), balance("CAD", "7250.50")];
        assert_eq!(
            cad_equity(&balances).unwrap(),
            Decimal::from_str("7250.50").unwrap()
        );
    }

    #[test]
    fn test_cad_equity_empty() {
        assert!(cad_equity(&[]).is_err());
    }

    #[test]
    fn test_cad_equity_single_foreign_entry() {
        let balances = vec![balance("USD", "3000")];
        assert!(cad_equity(&balances).is_err());
    }

    #[test]
    fn test_net_funding_deposit() {
        let activities = vec![
            activity("Trades", "-100.00"),
            activity("Deposits", "250.00"),
            activity("Deposits", "999.00"),
        ];
        assert_eq!(
            net_funding(&activities),
            Decimal::from_str("250.00").unwrap()
        );
    }

    #[test]
    fn test_net_funding_withdrawal_spelling() {
        // The Questrade label really is spelled this way.
        let activities = vec![activity("Withdrawls", "-500.00")];
        assert_eq!(net_funding(&activities), Decimal::from(-500));
    }

    #[test]
    fn test_net_funding_none() {
        let activities = vec![activity("Trades", "-100.00"), activity("Dividends", "12.00")];
        assert_eq!(net_funding(&activities), Decimal::ZERO);
        assert_eq!(net_funding(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_decode_accounts_response() {
        let json = r#"{
            "accounts": [
                { "type": "TFSA", "number": "26598145", "status": "Active", "isPrimary": true }
            ]
        }"#;
        let response: AccountsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.accounts.len(), 1);
        assert_eq!(response.accounts[0].number, "26598145");
        assert_eq!(response.accounts[0].account_type, "TFSA");
    }

    #[test]
    fn test_decode_balances_response() {
        let json = r#"{
            "combinedBalances": [
                { "currency": "CAD", "cash": 100.25, "totalEquity": 5000, "marketValue": 4899.75 }
            ]
        }"#;
        let response: BalancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.combined_balances[0].currency, "CAD");
        assert_eq!(
            response.combined_balances[0].total_equity,
            Decimal::from(5000)
        );
    }

    #[test]
    fn test_decode_activities_response() {
        let json = r#"{
            "activities": [
                { "type": "Deposits", "netAmount": 1000.00, "action": "DEP", "description": "CONT" }
            ]
        }"#;
        let response: ActivitiesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.activities[0].activity_type, "Deposits");
        assert_eq!(response.activities[0].net_amount, Decimal::from(1000));
    }

    #[test]
    fn test_decode_session() {
        let json = r#"{
            "access_token": "C3lTUKuNQrAAmSD",
            "token_type": "Bearer",
            "expires_in": 1800,
            "refresh_token": "aSBe7wAAdx88QTbwut0tiu3SYic3ox8F",
            "api_server": "https://api01.iq.questrade.com/"
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.expires_in, 1800);
        assert_eq!(session.api_server, "https://api01.iq.questrade.com/");
    }
}
