//! Depth strategy family: deposit into a per-token yield vault and stake the
//! vault shares in the farm.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use super::{
    AdapterCache, AdapterKey, SharedBook, StrategyAdapter, StrategyFactory, adapter_address,
};
use crate::error::{Result, WalletError};
use crate::protocols::{Farm, YieldVault};
use crate::slippage::{DEFAULT_MAX_LOSS_BPS, exceeds_tolerance, proportional_exit};
use crate::token::TokenInterface;
use crate::types::{AdapterState, WithdrawReceipt};

pub const FAMILY: &str = "depth";

#[derive(Clone)]
struct VaultRoute {
    vault: Arc<dyn YieldVault>,
    pid: u64,
}

/// Routing table token -> (vault, farm pool) for one Depth product
pub struct DepthConfig {
    farm: Arc<dyn Farm>,
    routes: HashMap<Address, VaultRoute>,
    max_loss_bps: u32,
}

impl DepthConfig {
    pub fn new(farm: Arc<dyn Farm>) -> Self {
        Self {
            farm,
            routes: HashMap::new(),
            max_loss_bps: DEFAULT_MAX_LOSS_BPS,
        }
    }

    /// Route `token` through `vault`, staking its shares in farm pool `pid`.
    /// Re-routing a token replaces the previous entry.
    pub fn with_vault(
        mut self,
        token: Address,
        vault: Arc<dyn YieldVault>,
        pid: u64,
    ) -> Result<Self> {
        if vault.asset() != token {
            return Err(WalletError::ConfigError(format!(
                "Depth vault {} holds {}, not {token}",
                vault.address(),
                vault.asset()
            )));
        }
        if self.farm.staking_token(pid) != Some(vault.address()) {
            return Err(WalletError::ConfigError(format!(
                "Depth farm pool {pid} does not stake vault {}",
                vault.address()
            )));
        }
        self.routes.insert(token, VaultRoute { vault, pid });
        Ok(self)
    }

    pub fn with_max_loss_bps(mut self, max_loss_bps: u32) -> Self {
        self.max_loss_bps = max_loss_bps;
        self
    }

    pub fn vault_of(&self, token: Address) -> Option<Address> {
        self.routes.get(&token).map(|route| route.vault.address())
    }

    pub fn tokens(&self) -> Vec<Address> {
        self.routes.keys().copied().collect()
    }
}

pub struct DepthStrategy {
    address: Address,
    owner: Address,
    token: Address,
    route: VaultRoute,
    farm: Arc<dyn Farm>,
    max_loss_bps: u32,
    tokens: Arc<dyn TokenInterface>,
    book: SharedBook,
}

impl DepthStrategy {
    fn initialize(&self) -> Result<()> {
        let vault = self.route.vault.address();
        self.tokens
            .approve(self.token, self.address, vault, U256::MAX)
            .and_then(|_| {
                self.tokens
                    .approve(vault, self.address, self.farm.address(), U256::MAX)
            })
            .map_err(|e| WalletError::rejected(FAMILY, e.to_string()))
    }

    fn staked_shares(&self) -> U256 {
        self.farm.staked(self.route.pid, self.address)
    }
}

impl StrategyAdapter for DepthStrategy {
    fn family(&self) -> &str {
        FAMILY
    }

    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn token(&self) -> Address {
        self.token
    }

    fn state(&self) -> AdapterState {
        self.book.lock().state
    }

    fn recorded_deposit(&self) -> U256 {
        self.book.lock().recorded_deposit
    }

    fn deposit(&self, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        let mut book = self.book.lock();
        let recorded = book
            .recorded_deposit
            .checked_add(amount)
            .ok_or_else(|| WalletError::ArithmeticOverflow("depth recorded deposit".into()))?;
        if book.state == AdapterState::Uninitialized {
            self.initialize()?;
        }

        let shares = self.route.vault.deposit(self.address, amount)?;
        self.farm.deposit(self.address, self.route.pid, shares)?;

        book.recorded_deposit = recorded;
        book.state = AdapterState::Active;
        tracing::debug!(adapter = %self.address, %amount, %shares, "depth deposit staked");
        Ok(())
    }

    fn withdraw(&self, amount: U256, to: Address) -> Result<WithdrawReceipt> {
        let mut book = self.book.lock();
        let staked = self.staked_shares();
        if staked.is_zero() || book.recorded_deposit.is_zero() {
            return Err(WalletError::exhausted(FAMILY, "no staked position"));
        }
        let (shares, removed) = proportional_exit(staked, book.recorded_deposit, amount);
        if shares.is_zero() {
            return Err(WalletError::exhausted(
                FAMILY,
                format!("{amount} is below one vault share"),
            ));
        }

        self.farm.withdraw(self.address, self.route.pid, shares)?;
        let before = self.tokens.balance_of(self.token, self.address);
        self.route.vault.redeem(self.address, shares)?;
        let received = self
            .tokens
            .balance_of(self.token, self.address)
            .saturating_sub(before);
        if received.is_zero() {
            return Err(WalletError::exhausted(FAMILY, "vault returned nothing"));
        }
        self.tokens.transfer(self.token, self.address, to, received)?;

        book.recorded_deposit -= removed;
        if exceeds_tolerance(removed, received, self.max_loss_bps) {
            tracing::warn!(
                adapter = %self.address,
                %removed,
                %received,
                "depth withdrawal lost more than {} bps",
                self.max_loss_bps
            );
        }
        Ok(WithdrawReceipt {
            requested: amount,
            removed,
            received,
        })
    }

    fn claim_rewards(&self, to: Address) -> Result<U256> {
        let harvested = self.farm.harvest(self.address, self.route.pid)?;
        if !harvested.is_zero() {
            self.tokens
                .transfer(self.farm.reward_token(), self.address, to, harvested)?;
        }
        Ok(harvested)
    }

    fn rewards_token(&self) -> Address {
        self.farm.reward_token()
    }

    fn live_value(&self) -> U256 {
        self.route.vault.preview_redeem(self.staked_shares())
    }
}

pub struct DepthStrategyFactory {
    address: Address,
    tokens: Arc<dyn TokenInterface>,
    config: Arc<DepthConfig>,
    adapters: AdapterCache,
}

impl DepthStrategyFactory {
    pub fn new(address: Address, tokens: Arc<dyn TokenInterface>, config: DepthConfig) -> Self {
        Self {
            address,
            tokens,
            config: Arc::new(config),
            adapters: AdapterCache::new(),
        }
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }
}

impl StrategyFactory for DepthStrategyFactory {
    fn family(&self) -> &str {
        FAMILY
    }

    fn address(&self) -> Address {
        self.address
    }

    fn supports(&self, token: Address) -> bool {
        self.config.routes.contains_key(&token)
    }

    fn rewards_token(&self) -> Address {
        self.config.farm.reward_token()
    }

    fn get_or_create_adapter(
        &self,
        wallet: Address,
        token: Address,
        strategy: &str,
    ) -> Result<Arc<dyn StrategyAdapter>> {
        let route = self
            .config
            .routes
            .get(&token)
            .cloned()
            .ok_or_else(|| WalletError::UnsupportedToken {
                strategy: strategy.to_string(),
                token,
            })?;
        let key = AdapterKey {
            wallet,
            token,
            strategy: strategy.to_string(),
        };
        let address = adapter_address(self.address, FAMILY, &key);
        self.adapters.get_or_try_insert_with(key, || {
            tracing::info!(
                "Depth adapter {address} created for wallet {wallet}, token {token}, vault {}",
                route.vault.address()
            );
            Ok(Arc::new(DepthStrategy {
                address,
                owner: wallet,
                token,
                route,
                farm: Arc::clone(&self.config.farm),
                max_loss_bps: self.config.max_loss_bps,
                tokens: Arc::clone(&self.tokens),
                book: SharedBook::default(),
            }))
        })
    }

    fn adapter_of(
        &self,
        wallet: Address,
        token: Address,
        strategy: &str,
    ) -> Option<Arc<dyn StrategyAdapter>> {
        self.adapters.get(&AdapterKey {
            wallet,
            token,
            strategy: strategy.to_string(),
        })
    }
}
