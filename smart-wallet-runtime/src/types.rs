use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::slippage;

/// Fungible token metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// Lifecycle of a strategy adapter. There is no terminal state: an adapter
/// drained to zero stays `Active` and accepts new deposits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    #[default]
    Uninitialized,
    Active,
}

/// Outcome of a withdrawal from a strategy adapter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawReceipt {
    /// Amount the caller asked for
    pub requested: U256,
    /// Principal taken off the adapter's recorded deposit
    pub removed: U256,
    /// Tokens that actually arrived at the destination
    pub received: U256,
}

impl WithdrawReceipt {
    /// Tokens requested but not delivered
    pub fn shortfall(&self) -> U256 {
        self.requested.saturating_sub(self.received)
    }

    /// Slippage against the requested amount, in basis points
    pub fn loss_bps(&self) -> Decimal {
        slippage::loss_bps(self.requested, self.received)
    }
}

/// One recorded position of a wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub token: Address,
    pub strategy: String,
    pub invested: U256,
    pub live_value: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CashBalance {
    pub token: Address,
    pub amount: U256,
}

/// Point-in-time view of a wallet's ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletSummary {
    pub wallet: Address,
    pub owner: Address,
    pub cash: Vec<CashBalance>,
    pub positions: Vec<PositionSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_shortfall_and_loss() {
        let receipt = WithdrawReceipt {
            requested: U256::from(1_000u64),
            removed: U256::from(1_000u64),
            received: U256::from(995u64),
        };
        assert_eq!(receipt.shortfall(), U256::from(5u64));
        assert_eq!(receipt.loss_bps(), Decimal::from(50));
    }

    #[test]
    fn test_summary_serializes_for_reporting() {
        let summary = WalletSummary {
            wallet: Address::repeat_byte(0x11),
            owner: Address::repeat_byte(0x0a),
            cash: vec![CashBalance {
                token: Address::repeat_byte(0x71),
                amount: U256::from(7u64),
            }],
            positions: vec![PositionSnapshot {
                token: Address::repeat_byte(0x71),
                strategy: "belt".to_string(),
                invested: U256::from(100u64),
                live_value: U256::from(99u64),
            }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["positions"][0]["strategy"], "belt");
        let back: WalletSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back, summary);

        let state = serde_json::to_string(&AdapterState::Active).unwrap();
        assert_eq!(state, "\"active\"");
    }
}
