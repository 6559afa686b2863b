use alloy::primitives::U256;
use rust_decimal::Decimal;

pub const BPS_DENOMINATOR: u32 = 10_000;

/// Withdrawal loss tolerated silently; anything above is logged.
pub const DEFAULT_MAX_LOSS_BPS: u32 = 100;

/// `x * y / denominator`, rounded down. Zero denominator yields zero.
pub fn mul_div(x: U256, y: U256, denominator: U256) -> U256 {
    x.saturating_mul(y)
        .checked_div(denominator)
        .unwrap_or(U256::ZERO)
}

/// Fee charged on `amount` at `fee_bps`, rounded down in the payer's favour
pub fn fee_for(amount: U256, fee_bps: u32) -> U256 {
    mul_div(amount, U256::from(fee_bps), U256::from(BPS_DENOMINATOR))
}

/// `amount` minus its fee
pub fn apply_fee_bps(amount: U256, fee_bps: u32) -> U256 {
    amount - fee_for(amount, fee_bps)
}

/// Portion of a position to exit so that `amount` of a `recorded` principal
/// leaves the position. Returns `(units, principal_removed)`; asking for the
/// whole principal or more exits every unit.
pub fn proportional_exit(units_held: U256, recorded: U256, amount: U256) -> (U256, U256) {
    if amount >= recorded {
        (units_held, recorded)
    } else {
        (mul_div(units_held, amount, recorded), amount)
    }
}

/// Loss of `received` against `requested` in basis points, two decimals.
pub fn loss_bps(requested: U256, received: U256) -> Decimal {
    if requested.is_zero() || received >= requested {
        return Decimal::ZERO;
    }
    let loss = requested - received;
    // hundredths of a basis point
    let scaled = mul_div(loss, U256::from(BPS_DENOMINATOR) * U256::from(100u32), requested);
    let scaled = u64::try_from(scaled).unwrap_or(u64::from(BPS_DENOMINATOR) * 100);
    Decimal::new(scaled as i64, 2)
}

/// Whether a withdrawal lost more than `max_loss_bps`
pub fn exceeds_tolerance(requested: U256, received: U256, max_loss_bps: u32) -> bool {
    loss_bps(requested, received) > Decimal::from(max_loss_bps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_rounds_down() {
        assert_eq!(fee_for(U256::from(1u64), 50), U256::ZERO);
        assert_eq!(fee_for(U256::from(10_000u64), 50), U256::from(50u64));
        assert_eq!(apply_fee_bps(U256::from(10_000u64), 50), U256::from(9_950u64));
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert_eq!(mul_div(U256::from(5u64), U256::from(7u64), U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_proportional_exit_partial() {
        let (units, removed) =
            proportional_exit(U256::from(2_000u64), U256::from(1_000u64), U256::from(250u64));
        assert_eq!(units, U256::from(500u64));
        assert_eq!(removed, U256::from(250u64));
    }

    #[test]
    fn test_proportional_exit_over_request_takes_everything() {
        let (units, removed) =
            proportional_exit(U256::from(2_000u64), U256::from(1_000u64), U256::from(5_000u64));
        assert_eq!(units, U256::from(2_000u64));
        assert_eq!(removed, U256::from(1_000u64));
    }

    #[test]
    fn test_loss_bps() {
        assert_eq!(loss_bps(U256::from(1_000u64), U256::from(990u64)), Decimal::new(100, 0));
        assert_eq!(loss_bps(U256::from(3u64), U256::from(2u64)), Decimal::new(333333, 2));
        assert_eq!(loss_bps(U256::from(100u64), U256::from(101u64)), Decimal::ZERO);
        assert_eq!(loss_bps(U256::ZERO, U256::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_tolerance() {
        assert!(!exceeds_tolerance(U256::from(1_000u64), U256::from(990u64), 100));
        assert!(exceeds_tolerance(U256::from(1_000u64), U256::from(989u64), 100));
    }
}
