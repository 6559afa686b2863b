//! In-process stand-ins for the external protocols.
//!
//! Every piece of protocol state lives in the [`Chain`] token book (LP and
//! share tokens, staking receipts, pending rewards), so a rolled-back wallet
//! operation rolls the protocols back with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::{Address, U256, keccak256};

use super::{Farm, StablePool, YieldVault};
use crate::chain::Chain;
use crate::error::{Result, WalletError};
use crate::slippage::{apply_fee_bps, mul_div};
use crate::token::TokenInterface;

const LP_DECIMALS: u8 = 18;

/// Account-less token id used to book per-pool protocol state
fn book_id(base: Address, tag: &str, pid: u64) -> Address {
    let mut preimage = Vec::with_capacity(20 + tag.len() + 8);
    preimage.extend_from_slice(base.as_slice());
    preimage.extend_from_slice(tag.as_bytes());
    preimage.extend_from_slice(&pid.to_be_bytes());
    Address::from_word(keccak256(preimage))
}

// ── Stable pool ──────────────────────────────────────────────────────────────

pub struct SimStablePool {
    chain: Arc<Chain>,
    address: Address,
    lp_token: Address,
    /// (coin, decimals) by pool index
    coins: Vec<(Address, u8)>,
    exit_fee_bps: u32,
    paused: AtomicBool,
}

impl SimStablePool {
    const PROTOCOL: &'static str = "belt";

    pub fn new(
        chain: Arc<Chain>,
        address: Address,
        lp_token: Address,
        coins: Vec<(Address, u8)>,
        exit_fee_bps: u32,
    ) -> Self {
        Self {
            chain,
            address,
            lp_token,
            coins,
            exit_fee_bps,
            paused: AtomicBool::new(false),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    fn coin(&self, index: usize) -> Result<(Address, U256)> {
        let (coin, decimals) = self
            .coins
            .get(index)
            .copied()
            .ok_or_else(|| WalletError::rejected(Self::PROTOCOL, format!("no coin {index}")))?;
        let scale = U256::from(10u64).pow(U256::from(LP_DECIMALS.saturating_sub(decimals)));
        Ok((coin, scale))
    }
}

impl StablePool for SimStablePool {
    fn address(&self) -> Address {
        self.address
    }

    fn lp_token(&self) -> Address {
        self.lp_token
    }

    fn coins(&self) -> Vec<Address> {
        self.coins.iter().map(|(coin, _)| *coin).collect()
    }

    fn add_liquidity(
        &self,
        from: Address,
        index: usize,
        amount: U256,
        min_mint: U256,
    ) -> Result<U256> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(WalletError::rejected(Self::PROTOCOL, "pool is paused"));
        }
        let (coin, scale) = self.coin(index)?;
        let minted = amount.saturating_mul(scale);
        if minted.is_zero() || minted < min_mint {
            return Err(WalletError::rejected(
                Self::PROTOCOL,
                format!("would mint {minted} LP, minimum {min_mint}"),
            ));
        }
        self.chain
            .transfer_from(coin, self.address, from, self.address, amount)
            .map_err(|e| WalletError::rejected(Self::PROTOCOL, e.to_string()))?;
        self.chain.mint(self.lp_token, from, minted)?;
        Ok(minted)
    }

    fn remove_liquidity_one_coin(
        &self,
        from: Address,
        lp_amount: U256,
        index: usize,
        min_amount: U256,
    ) -> Result<U256> {
        let (coin, _) = self.coin(index)?;
        let out = self.calc_withdraw_one_coin(lp_amount, index);
        if out.is_zero() {
            return Err(WalletError::exhausted(
                Self::PROTOCOL,
                format!("{lp_amount} LP redeems for nothing"),
            ));
        }
        if out < min_amount {
            return Err(WalletError::rejected(
                Self::PROTOCOL,
                format!("output {out} below minimum {min_amount}"),
            ));
        }
        let reserve = self.chain.balance_of(coin, self.address);
        if reserve < out {
            return Err(WalletError::exhausted(
                Self::PROTOCOL,
                format!("reserve {reserve} cannot cover {out}"),
            ));
        }
        self.chain
            .burn(self.lp_token, from, lp_amount)
            .map_err(|e| WalletError::exhausted(Self::PROTOCOL, e.to_string()))?;
        self.chain.transfer(coin, self.address, from, out)?;
        Ok(out)
    }

    fn calc_withdraw_one_coin(&self, lp_amount: U256, index: usize) -> U256 {
        match self.coin(index) {
            Ok((_, scale)) => apply_fee_bps(lp_amount / scale, self.exit_fee_bps),
            Err(_) => U256::ZERO,
        }
    }
}

// ── Yield vault ──────────────────────────────────────────────────────────────

pub struct SimVault {
    chain: Arc<Chain>,
    address: Address,
    asset: Address,
    exit_fee_bps: u32,
    paused: AtomicBool,
}

impl SimVault {
    const PROTOCOL: &'static str = "depth";

    pub fn new(chain: Arc<Chain>, address: Address, asset: Address, exit_fee_bps: u32) -> Self {
        Self {
            chain,
            address,
            asset,
            exit_fee_bps,
            paused: AtomicBool::new(false),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Donate `amount` of the asset to the vault, raising the share price.
    pub fn accrue_yield(&self, amount: U256) -> Result<()> {
        self.chain.mint(self.asset, self.address, amount)
    }

    fn total_assets(&self) -> U256 {
        self.chain.balance_of(self.asset, self.address)
    }

    fn total_shares(&self) -> U256 {
        self.chain.total_supply(self.address)
    }
}

impl YieldVault for SimVault {
    fn address(&self) -> Address {
        self.address
    }

    fn asset(&self) -> Address {
        self.asset
    }

    fn deposit(&self, from: Address, amount: U256) -> Result<U256> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(WalletError::rejected(Self::PROTOCOL, "vault is paused"));
        }
        let shares = mul_div(
            amount,
            self.total_shares() + U256::from(1u64),
            self.total_assets() + U256::from(1u64),
        );
        if shares.is_zero() {
            return Err(WalletError::rejected(
                Self::PROTOCOL,
                format!("deposit of {amount} mints no shares"),
            ));
        }
        self.chain
            .transfer_from(self.asset, self.address, from, self.address, amount)
            .map_err(|e| WalletError::rejected(Self::PROTOCOL, e.to_string()))?;
        self.chain.mint(self.address, from, shares)?;
        Ok(shares)
    }

    fn redeem(&self, from: Address, shares: U256) -> Result<U256> {
        let out = self.preview_redeem(shares);
        if out.is_zero() {
            return Err(WalletError::exhausted(
                Self::PROTOCOL,
                format!("{shares} shares redeem for nothing"),
            ));
        }
        self.chain
            .burn(self.address, from, shares)
            .map_err(|e| WalletError::exhausted(Self::PROTOCOL, e.to_string()))?;
        self.chain.transfer(self.asset, self.address, from, out)?;
        Ok(out)
    }

    fn preview_redeem(&self, shares: U256) -> U256 {
        let gross = mul_div(
            shares,
            self.total_assets() + U256::from(1u64),
            self.total_shares() + U256::from(1u64),
        );
        apply_fee_bps(gross, self.exit_fee_bps)
    }
}

// ── Farm ─────────────────────────────────────────────────────────────────────

pub struct SimFarm {
    chain: Arc<Chain>,
    address: Address,
    reward_token: Address,
    pools: Mutex<HashMap<u64, Address>>,
}

impl SimFarm {
    const PROTOCOL: &'static str = "farm";

    pub fn new(chain: Arc<Chain>, address: Address, reward_token: Address) -> Self {
        Self {
            chain,
            address,
            reward_token,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Open pool `pid` staking `token`. Re-adding a pid with the same token
    /// is a no-op; a pid already staking another token is rejected.
    pub fn add_pool(&self, pid: u64, token: Address) -> Result<()> {
        let mut pools = self.pools.lock().unwrap_or_else(PoisonError::into_inner);
        match pools.get(&pid) {
            Some(existing) if *existing != token => Err(WalletError::rejected(
                Self::PROTOCOL,
                format!("pool {pid} already stakes {existing}, not {token}"),
            )),
            _ => {
                pools.insert(pid, token);
                Ok(())
            }
        }
    }

    /// Credit `amount` of pending reward to `user` in pool `pid`.
    pub fn accrue_reward(&self, pid: u64, user: Address, amount: U256) -> Result<()> {
        self.chain
            .mint(book_id(self.address, "pending", pid), user, amount)
    }

    fn pool(&self, pid: u64) -> Result<Address> {
        self.staking_token(pid)
            .ok_or_else(|| WalletError::rejected(Self::PROTOCOL, format!("no pool {pid}")))
    }
}

impl Farm for SimFarm {
    fn address(&self) -> Address {
        self.address
    }

    fn reward_token(&self) -> Address {
        self.reward_token
    }

    fn staking_token(&self, pid: u64) -> Option<Address> {
        self.pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pid)
            .copied()
    }

    fn deposit(&self, user: Address, pid: u64, amount: U256) -> Result<()> {
        let token = self.pool(pid)?;
        self.chain
            .transfer_from(token, self.address, user, self.address, amount)
            .map_err(|e| WalletError::rejected(Self::PROTOCOL, e.to_string()))?;
        self.chain
            .mint(book_id(self.address, "staked", pid), user, amount)
    }

    fn withdraw(&self, user: Address, pid: u64, amount: U256) -> Result<()> {
        let token = self.pool(pid)?;
        self.chain
            .burn(book_id(self.address, "staked", pid), user, amount)
            .map_err(|e| WalletError::exhausted(Self::PROTOCOL, e.to_string()))?;
        self.chain.transfer(token, self.address, user, amount)
    }

    fn staked(&self, pid: u64, user: Address) -> U256 {
        self.chain
            .balance_of(book_id(self.address, "staked", pid), user)
    }

    fn pending_reward(&self, pid: u64, user: Address) -> U256 {
        self.chain
            .balance_of(book_id(self.address, "pending", pid), user)
    }

    fn harvest(&self, user: Address, pid: u64) -> Result<U256> {
        let pending = self.pending_reward(pid, user);
        if pending.is_zero() {
            return Ok(U256::ZERO);
        }
        self.chain
            .burn(book_id(self.address, "pending", pid), user, pending)?;
        self.chain.mint(self.reward_token, user, pending)?;
        Ok(pending)
    }
}
