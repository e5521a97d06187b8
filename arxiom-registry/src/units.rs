//! Conversion between human-readable token amounts and ledger base units
//!
//! `parse_units("1.5", 18)` is `1_500_000_000_000_000_000`, the same
//! convention wallets use for 18-decimal stablecoins.

use crate::models::TokenAmount;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Largest decimals value a token may declare
pub const MAX_DECIMALS: u32 = 28;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("invalid amount '{0}'")]
    InvalidNumber(String),

    #[error("amount must not be negative")]
    Negative,

    #[error("amount has more than {0} fractional digits")]
    TooPrecise(u32),

    #[error("amount does not fit in base units")]
    Overflow,

    #[error("token decimals {0} exceed maximum {MAX_DECIMALS}")]
    UnsupportedDecimals(u32),
}

fn unit(decimals: u32) -> Result<TokenAmount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    Ok(10u128.pow(decimals))
}

/// Parse a decimal string into base units
pub fn parse_units(amount: &str, decimals: u32) -> Result<TokenAmount, UnitsError> {
    let unit = unit(decimals)?;

    let value = Decimal::from_str(amount.trim())
        .map_err(|_| UnitsError::InvalidNumber(amount.to_string()))?
        .normalize();

    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative);
    }

    let scale = value.scale();
    if scale > decimals {
        return Err(UnitsError::TooPrecise(decimals));
    }

    let mantissa = value.mantissa().unsigned_abs();
    let shift = unit / 10u128.pow(scale);

    mantissa.checked_mul(shift).ok_or(UnitsError::Overflow)
}

/// Render base units as a decimal string without trailing zeros
pub fn format_units(amount: TokenAmount, decimals: u32) -> Result<String, UnitsError> {
    let unit = unit(decimals)?;

    let whole = amount / unit;
    let fraction = amount % unit;

    if fraction == 0 {
        return Ok(whole.to_string());
    }

    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    Ok(format!("{}.{}", whole, digits.trim_end_matches('0')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units("100", 18).unwrap(), 100 * 10u128.pow(18));
        assert_eq!(parse_units("1.5", 18).unwrap(), 15 * 10u128.pow(17));
        assert_eq!(parse_units(" 0.000001 ", 6).unwrap(), 1);
        assert_eq!(parse_units("2.50", 2).unwrap(), 250);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            parse_units("abc", 18),
            Err(UnitsError::InvalidNumber("abc".to_string()))
        );
        assert_eq!(parse_units("-1", 18), Err(UnitsError::Negative));
        assert_eq!(parse_units("0.001", 2), Err(UnitsError::TooPrecise(2)));
        assert_eq!(parse_units("1", 40), Err(UnitsError::UnsupportedDecimals(40)));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_units(100 * 10u128.pow(18), 18).unwrap(), "100");
        assert_eq!(format_units(15 * 10u128.pow(17), 18).unwrap(), "1.5");
        assert_eq!(format_units(1, 6).unwrap(), "0.000001");
        assert_eq!(format_units(0, 18).unwrap(), "0");
    }
}
