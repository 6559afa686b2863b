use alloy::primitives::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Insufficient cash balance for {token}: have {have}, need {need}")]
    InsufficientCashBalance {
        token: Address,
        have: U256,
        need: U256,
    },

    #[error("Insufficient invested balance in {strategy}: have {have}, need {need}")]
    InsufficientInvestedBalance {
        strategy: String,
        have: U256,
        need: U256,
    },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Strategy {strategy} has no routing for token {token}")]
    UnsupportedToken { strategy: String, token: Address },

    #[error("External protocol rejected call: {protocol}: {message}")]
    ExternalProtocolRejected { protocol: String, message: String },

    #[error("Insufficient external balance: {protocol}: {message}")]
    InsufficientExternalBalance { protocol: String, message: String },

    #[error("Adapter for {strategy} rejected deposit: {source}")]
    AdapterDepositFailed {
        strategy: String,
        #[source]
        source: Box<WalletError>,
    },

    #[error("Caller {caller} is not the wallet owner {owner}")]
    NotOwner { caller: Address, owner: Address },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid strategy name: {0:?}")]
    InvalidStrategyName(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),
}

impl WalletError {
    pub(crate) fn rejected(protocol: &str, message: impl Into<String>) -> Self {
        WalletError::ExternalProtocolRejected {
            protocol: protocol.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn exhausted(protocol: &str, message: impl Into<String>) -> Self {
        WalletError::InsufficientExternalBalance {
            protocol: protocol.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(e: toml::de::Error) -> Self {
        WalletError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
