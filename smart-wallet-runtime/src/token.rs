//! Fungible token interface and unit helpers.

use alloy::primitives::{Address, U256};

use crate::error::{Result, WalletError};

/// Standard fungible-token surface consumed by wallets and adapters.
///
/// Calls name the acting account explicitly: `transfer` moves `from`'s own
/// tokens, `transfer_from` moves `from`'s tokens on behalf of `spender`
/// against an allowance.
pub trait TokenInterface: Send + Sync {
    fn balance_of(&self, token: Address, account: Address) -> U256;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    fn approve(&self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<()>;

    fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()>;

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()>;
}

fn unit(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Parse a human amount such as `"100"` or `"0.00000000000001"` into the
/// token's smallest unit.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let invalid = || WalletError::ConfigError(format!("Invalid amount '{amount}'"));

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(WalletError::ConfigError(format!(
            "Amount '{amount}' has more than {decimals} decimals"
        )));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| invalid())?
    };
    let fraction_units = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| invalid())?
    };

    whole
        .checked_mul(unit(decimals))
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(|| WalletError::ArithmeticOverflow(format!("amount '{amount}'")))
}

/// Format a raw amount with `decimals`, trimming trailing zeros
pub fn format_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = unit(decimals);
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }
    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    format!("{}.{}", whole, remainder_str.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("100", 6).unwrap(),
            U256::from(100_000_000u64)
        );
        assert_eq!(parse_units("1.5", 8).unwrap(), U256::from(150_000_000u64));
        assert_eq!(
            parse_units("0.00000000000001", 18).unwrap(),
            U256::from(10_000u64)
        );
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5u64));
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units("0.0000001", 6).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(10_000u64), 18), "0.00000000000001");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }
}
