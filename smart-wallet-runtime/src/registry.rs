//! Strategy name routing.
//!
//! A [`StrategyRegistry`] is an immutable snapshot. [`GlobalConfig`] holds the
//! current snapshot and publishes replacements; wallets take one snapshot per
//! operation so a concurrent re-point never splits a call across factories.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;

use crate::adapters::StrategyFactory;
use crate::error::{Result, WalletError};

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, Arc<dyn StrategyFactory>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this registry with `name` routed to `factory`.
    pub fn with_factory(&self, name: &str, factory: Arc<dyn StrategyFactory>) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(WalletError::InvalidStrategyName(name.to_string()));
        }
        let mut next = self.clone();
        next.factories.insert(name.to_string(), factory);
        Ok(next)
    }

    pub fn factory_of(&self, name: &str) -> Result<Arc<dyn StrategyFactory>> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| WalletError::UnknownStrategy(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.factories
                    .iter()
                    .map(|(name, factory)| (name, factory.address())),
            )
            .finish()
    }
}

/// Owner of the current registry snapshot, shared by every wallet of a
/// deployment.
pub struct GlobalConfig {
    address: Address,
    current: RwLock<Arc<StrategyRegistry>>,
}

impl GlobalConfig {
    pub fn new(address: Address, registry: StrategyRegistry) -> Self {
        Self {
            address,
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Route `name` to `factory` for calls that start after this returns.
    pub fn set_strategy_factory(
        &self,
        name: &str,
        factory: Arc<dyn StrategyFactory>,
    ) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = current.with_factory(name, Arc::clone(&factory))?;
        if current.contains(name) {
            tracing::warn!(
                "Strategy '{name}' re-pointed to {} factory {}",
                factory.family(),
                factory.address()
            );
        } else {
            tracing::info!(
                "Strategy '{name}' registered: {} factory {}",
                factory.family(),
                factory.address()
            );
        }
        *current = Arc::new(next);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<StrategyRegistry> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}
