pub mod belt;
pub mod depth;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256, keccak256};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::types::{AdapterState, WithdrawReceipt};

/// A position in one external protocol held on behalf of one
/// (wallet, token, strategy) triple.
pub trait StrategyAdapter: Send + Sync {
    /// Protocol family identifier
    fn family(&self) -> &str;

    /// Account holding the adapter's tokens
    fn address(&self) -> Address;

    /// Wallet that owns the position
    fn owner(&self) -> Address;

    fn token(&self) -> Address;

    fn state(&self) -> AdapterState;

    /// Principal the adapter believes it has deployed
    fn recorded_deposit(&self) -> U256;

    /// Deploy `amount` of the token. The tokens must already sit at
    /// [`address`](Self::address).
    fn deposit(&self, amount: U256) -> Result<()>;

    /// Exit up to `amount` of principal and send whatever comes back to `to`.
    /// The receipt's `received` may fall short of `requested`.
    fn withdraw(&self, amount: U256, to: Address) -> Result<WithdrawReceipt>;

    /// Harvest pending rewards to `to`; zero when nothing is pending.
    fn claim_rewards(&self, to: Address) -> Result<U256>;

    fn rewards_token(&self) -> Address;

    /// Token amount the position would redeem for right now
    fn live_value(&self) -> U256;
}

/// Produces adapters for one strategy family bound to an immutable routing
/// table.
pub trait StrategyFactory: Send + Sync {
    fn family(&self) -> &str;

    fn address(&self) -> Address;

    fn supports(&self, token: Address) -> bool;

    fn rewards_token(&self) -> Address;

    /// Return the adapter for the triple, creating it on first request.
    /// Fails with `UnsupportedToken` when the routing table has no entry.
    fn get_or_create_adapter(
        &self,
        wallet: Address,
        token: Address,
        strategy: &str,
    ) -> Result<Arc<dyn StrategyAdapter>>;

    /// Existing adapter for the triple, without creating one
    fn adapter_of(
        &self,
        wallet: Address,
        token: Address,
        strategy: &str,
    ) -> Option<Arc<dyn StrategyAdapter>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    pub wallet: Address,
    pub token: Address,
    pub strategy: String,
}

/// Arena of adapters keyed by (wallet, token, strategy) with get-or-insert
#[derive(Default)]
pub struct AdapterCache {
    adapters: DashMap<AdapterKey, Arc<dyn StrategyAdapter>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AdapterKey) -> Option<Arc<dyn StrategyAdapter>> {
        self.adapters.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_or_try_insert_with(
        &self,
        key: AdapterKey,
        create: impl FnOnce() -> Result<Arc<dyn StrategyAdapter>>,
    ) -> Result<Arc<dyn StrategyAdapter>> {
        match self.adapters.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let adapter = create()?;
                entry.insert(Arc::clone(&adapter));
                Ok(adapter)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Deterministic adapter account, derived like a CREATE2 address from the
/// factory, the triple and the family.
pub fn adapter_address(factory: Address, family: &str, key: &AdapterKey) -> Address {
    let mut salt = Vec::with_capacity(40 + key.strategy.len());
    salt.extend_from_slice(key.wallet.as_slice());
    salt.extend_from_slice(key.token.as_slice());
    salt.extend_from_slice(key.strategy.as_bytes());
    factory.create2(keccak256(salt).0, keccak256(family.as_bytes()).0)
}

/// Adapter-side bookkeeping shared by every family
#[derive(Debug, Default)]
pub(crate) struct PositionBook {
    pub state: AdapterState,
    pub recorded_deposit: U256,
}

#[derive(Debug, Default)]
pub(crate) struct SharedBook(Mutex<PositionBook>);

impl SharedBook {
    pub fn lock(&self) -> MutexGuard<'_, PositionBook> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
