pub mod error;
pub mod types;
pub mod chain;
pub mod token;
pub mod events;
pub mod slippage;
pub mod protocols;
pub mod adapters;
pub mod registry;
pub mod wallet;
pub mod wallet_factory;
pub mod config;
pub mod deployment;

pub use error::{Result, WalletError};
pub use types::*;
pub use chain::Chain;
pub use registry::{GlobalConfig, StrategyRegistry};
pub use wallet::SmartWallet;
pub use wallet_factory::SmartWalletFactory;
pub use deployment::Deployment;
