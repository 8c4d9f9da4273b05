//! Parsing of dollar-formatted cell text and the day-over-day percentage change.
//!
//! The historical rows in the sheet hold equity as text like `$1,000` or `1100.25`.
//! The percentage feature reads two of those cells back and computes the relative
//! change, so the parse must accept an optional dollar sign and thousands
//! separators.

use crate::Result;
use anyhow::{ensure, Context};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses cell text of the shape `$1,000`, `1,000.50`, or `-$250` into a `Decimal`.
/// Anything else is an error; a malformed historical cell should stop the run
/// rather than record a bogus percentage.
pub(crate) fn parse_money_cell(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    ensure!(
        !trimmed.is_empty(),
        "Cell is empty where a dollar amount was expected"
    );

    // A dollar sign may follow the minus sign: "-$250".
    let unsigned = trimmed.strip_prefix('-');
    let body = unsigned.unwrap_or(trimmed);
    let without_dollar = body.strip_prefix('$').unwrap_or(body);
    let without_commas = without_dollar.replace(',', "");

    let magnitude = Decimal::from_str(&without_commas)
        .with_context(|| format!("Cell text '{text}' is not a dollar amount"))?;
    Ok(if unsigned.is_some() {
        -magnitude
    } else {
        magnitude
    })
}

/// The relative change from `old` to `new`: `(new - old) / old`. A zero prior value
/// has no defined change and is an error.
pub(crate) fn percent_change(old: Decimal, new: Decimal) -> Result<Decimal> {
    ensure!(
        !old.is_zero(),
        "Cannot compute a percentage change from a prior value of zero"
    );
    Ok((new - old) / old)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_dollar_and_commas() {
        assert_eq!(parse_money_cell("$1,000").unwrap(), Decimal::from(1000));
        assert_eq!(parse_money_cell("$12,345,678").unwrap(), Decimal::from(12_345_678));
    }

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(
            parse_money_cell("1100.25").unwrap(),
            Decimal::from_str("1100.25").unwrap()
        );
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_money_cell("-$250").unwrap(), Decimal::from(-250));
        assert_eq!(parse_money_cell("-250").unwrap(), Decimal::from(-250));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_money_cell("").is_err());
        assert!(parse_money_cell("   ").is_err());
        assert!(parse_money_cell("n/a").is_err());
        assert!(parse_money_cell("$").is_err());
    }

    #[test]
    fn test_percent_change_exact() {
        let old = parse_money_cell("$1,000").unwrap();
        let new = parse_money_cell("$1,100").unwrap();
        assert_eq!(
            percent_change(old, new).unwrap(),
            Decimal::from_str("0.10").unwrap()
        );
    }

    #[test]
    fn test_percent_change_negative() {
        let change = percent_change(Decimal::from(200), Decimal::from(150)).unwrap();
        assert_eq!(change, Decimal::from_str("-0.25").unwrap());
    }

    #[test]
    fn test_percent_change_zero_prior() {
        assert!(percent_change(Decimal::ZERO, Decimal::from(100)).is_err());
    }
}
