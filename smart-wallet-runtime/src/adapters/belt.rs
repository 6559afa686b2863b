//! Belt strategy family: add liquidity to the multi-coin stable pool, then
//! stake the LP in the farm. Rewards are harvested from the farm.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use super::{
    AdapterCache, AdapterKey, SharedBook, StrategyAdapter, StrategyFactory, adapter_address,
};
use crate::error::{Result, WalletError};
use crate::protocols::{Farm, StablePool};
use crate::slippage::{DEFAULT_MAX_LOSS_BPS, exceeds_tolerance, proportional_exit};
use crate::token::TokenInterface;
use crate::types::{AdapterState, WithdrawReceipt};

pub const FAMILY: &str = "belt";

/// Immutable routing for the Belt family
pub struct BeltConfig {
    pool: Arc<dyn StablePool>,
    farm: Arc<dyn Farm>,
    pool_id: u64,
    coin_index: HashMap<Address, usize>,
    max_loss_bps: u32,
}

impl BeltConfig {
    /// Route every coin of `pool` through farm pool `pool_id`, which must
    /// stake the pool's LP token.
    pub fn new(pool: Arc<dyn StablePool>, farm: Arc<dyn Farm>, pool_id: u64) -> Result<Self> {
        match farm.staking_token(pool_id) {
            Some(staked) if staked == pool.lp_token() => {}
            other => {
                return Err(WalletError::ConfigError(format!(
                    "Belt farm pool {pool_id} stakes {other:?}, expected LP {}",
                    pool.lp_token()
                )));
            }
        }
        let coin_index = pool
            .coins()
            .into_iter()
            .enumerate()
            .map(|(index, coin)| (coin, index))
            .collect();
        Ok(Self {
            pool,
            farm,
            pool_id,
            coin_index,
            max_loss_bps: DEFAULT_MAX_LOSS_BPS,
        })
    }

    pub fn with_max_loss_bps(mut self, max_loss_bps: u32) -> Self {
        self.max_loss_bps = max_loss_bps;
        self
    }

    pub fn lp_token(&self) -> Address {
        self.pool.lp_token()
    }

    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub fn coin_index(&self, token: Address) -> Option<usize> {
        self.coin_index.get(&token).copied()
    }
}

pub struct BeltStrategy {
    address: Address,
    owner: Address,
    token: Address,
    coin: usize,
    config: Arc<BeltConfig>,
    tokens: Arc<dyn TokenInterface>,
    book: SharedBook,
}

impl BeltStrategy {
    /// Grant the pool and the farm unlimited allowances.
    fn initialize(&self) -> Result<()> {
        let pool = self.config.pool.address();
        let farm = self.config.farm.address();
        self.tokens
            .approve(self.token, self.address, pool, U256::MAX)
            .and_then(|_| {
                self.tokens
                    .approve(self.config.lp_token(), self.address, farm, U256::MAX)
            })
            .map_err(|e| WalletError::rejected(FAMILY, e.to_string()))
    }

    fn staked_lp(&self) -> U256 {
        self.config.farm.staked(self.config.pool_id, self.address)
    }
}

impl StrategyAdapter for BeltStrategy {
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
            .ok_or_else(|| WalletError::ArithmeticOverflow("belt recorded deposit".into()))?;
        if book.state == AdapterState::Uninitialized {
            self.initialize()?;
        }

        let lp = self
            .config
            .pool
            .add_liquidity(self.address, self.coin, amount, U256::ZERO)?;
        self.config.farm.deposit(self.address, self.config.pool_id, lp)?;

        book.recorded_deposit = recorded;
        book.state = AdapterState::Active;
        tracing::debug!(adapter = %self.address, %amount, %lp, "belt deposit staked");
        Ok(())
    }

    fn withdraw(&self, amount: U256, to: Address) -> Result<WithdrawReceipt> {
        let mut book = self.book.lock();
        let staked = self.staked_lp();
        if staked.is_zero() || book.recorded_deposit.is_zero() {
            return Err(WalletError::exhausted(FAMILY, "no staked position"));
        }
        let (lp, removed) = proportional_exit(staked, book.recorded_deposit, amount);
        if lp.is_zero() {
            return Err(WalletError::exhausted(
                FAMILY,
                format!("{amount} is below one LP unit"),
            ));
        }

        self.config
            .farm
            .withdraw(self.address, self.config.pool_id, lp)?;
        let before = self.tokens.balance_of(self.token, self.address);
        self.config
            .pool
            .remove_liquidity_one_coin(self.address, lp, self.coin, U256::ZERO)?;
        let received = self
            .tokens
            .balance_of(self.token, self.address)
            .saturating_sub(before);
        if received.is_zero() {
            return Err(WalletError::exhausted(FAMILY, "pool returned nothing"));
        }
        self.tokens.transfer(self.token, self.address, to, received)?;

        book.recorded_deposit -= removed;
        if exceeds_tolerance(removed, received, self.config.max_loss_bps) {
            tracing::warn!(
                adapter = %self.address,
                %removed,
                %received,
                "belt withdrawal lost more than {} bps",
                self.config.max_loss_bps
            );
        }
        Ok(WithdrawReceipt {
            requested: amount,
            removed,
            received,
        })
    }

    fn claim_rewards(&self, to: Address) -> Result<U256> {
        let harvested = self
            .config
            .farm
            .harvest(self.address, self.config.pool_id)?;
        if !harvested.is_zero() {
            self.tokens
                .transfer(self.rewards_token(), self.address, to, harvested)?;
        }
        Ok(harvested)
    }

    fn rewards_token(&self) -> Address {
        self.config.farm.reward_token()
    }

    fn live_value(&self) -> U256 {
        self.config
            .pool
            .calc_withdraw_one_coin(self.staked_lp(), self.coin)
    }
}

pub struct BeltStrategyFactory {
    address: Address,
    tokens: Arc<dyn TokenInterface>,
    config: Arc<BeltConfig>,
    adapters: AdapterCache,
}

impl BeltStrategyFactory {
    pub fn new(address: Address, tokens: Arc<dyn TokenInterface>, config: BeltConfig) -> Self {
        Self {
            address,
            tokens,
            config: Arc::new(config),
            adapters: AdapterCache::new(),
        }
    }

    pub fn config(&self) -> &BeltConfig {
        &self.config
    }
}

impl StrategyFactory for BeltStrategyFactory {
    fn family(&self) -> &str {
        FAMILY
    }

    fn address(&self) -> Address {
        self.address
    }

    fn supports(&self, token: Address) -> bool {
        self.config.coin_index(token).is_some()
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
        let coin = self
            .config
            .coin_index(token)
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
            tracing::info!("Belt adapter {address} created for wallet {wallet}, token {token}");
            Ok(Arc::new(BeltStrategy {
                address,
                owner: wallet,
                token,
                coin,
                config: Arc::clone(&self.config),
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
