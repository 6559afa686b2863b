use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::sol_types::SolEvent;

use crate::chain::Chain;
use crate::error::Result;
use crate::events::WalletCreated;
use crate::registry::GlobalConfig;
use crate::wallet::SmartWallet;

/// Deploys independent [`SmartWallet`]s. Addresses follow contract-creation
/// derivation from the factory address and a running nonce.
pub struct SmartWalletFactory {
    address: Address,
    chain: Arc<Chain>,
    nonce: AtomicU64,
}

impl SmartWalletFactory {
    pub fn new(address: Address, chain: Arc<Chain>) -> Self {
        Self {
            address,
            chain,
            nonce: AtomicU64::new(1),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Create an empty wallet owned by `owner` and bound to `config`.
    pub fn new_smart_wallet(
        &self,
        owner: Address,
        config: Arc<GlobalConfig>,
    ) -> Result<SmartWallet> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let address = self.address.create(nonce);
        self.chain.atomic(|| {
            self.chain.emit(
                self.address,
                WalletCreated {
                    owner,
                    wallet: address,
                }
                .encode_log_data(),
            );
            Ok(())
        })?;
        tracing::info!("Smart wallet {address} created for {owner}");
        Ok(SmartWallet::new(address, owner, Arc::clone(&self.chain), config))
    }
}
