//! External yield protocols as seen by strategy adapters.
//!
//! Only the call surface lives here; [`sim`] holds in-process
//! implementations that run against a [`Chain`](crate::chain::Chain).

pub mod sim;

use alloy::primitives::{Address, U256};

use crate::error::Result;

/// Multi-coin stable pool minting a single LP token (Belt depositor).
pub trait StablePool: Send + Sync {
    fn address(&self) -> Address;

    fn lp_token(&self) -> Address;

    /// Coins accepted by the pool, by index
    fn coins(&self) -> Vec<Address>;

    /// Pull `amount` of coin `index` from `from` (allowance to the pool
    /// required) and mint LP to `from`. Returns LP minted.
    fn add_liquidity(&self, from: Address, index: usize, amount: U256, min_mint: U256)
    -> Result<U256>;

    /// Burn `lp_amount` from `from` and pay coin `index` back to `from`,
    /// net of exit fees. Returns coins paid.
    fn remove_liquidity_one_coin(
        &self,
        from: Address,
        lp_amount: U256,
        index: usize,
        min_amount: U256,
    ) -> Result<U256>;

    /// Coins `lp_amount` would currently redeem for
    fn calc_withdraw_one_coin(&self, lp_amount: U256, index: usize) -> U256;
}

/// Single-asset vault issuing shares; the vault address is the share token.
pub trait YieldVault: Send + Sync {
    fn address(&self) -> Address;

    fn asset(&self) -> Address;

    /// Pull `amount` of the asset from `from`, mint shares to `from`.
    fn deposit(&self, from: Address, amount: U256) -> Result<U256>;

    /// Burn `shares` from `from`, pay the asset to `from` net of exit fees.
    fn redeem(&self, from: Address, shares: U256) -> Result<U256>;

    fn preview_redeem(&self, shares: U256) -> U256;
}

/// MasterChef-style staking farm paying one reward token.
pub trait Farm: Send + Sync {
    fn address(&self) -> Address;

    fn reward_token(&self) -> Address;

    /// Token staked in pool `pid`, if the pool exists
    fn staking_token(&self, pid: u64) -> Option<Address>;

    /// Stake `amount` from `user` (allowance to the farm required).
    fn deposit(&self, user: Address, pid: u64, amount: U256) -> Result<()>;

    /// Unstake `amount` back to `user`.
    fn withdraw(&self, user: Address, pid: u64, amount: U256) -> Result<()>;

    fn staked(&self, pid: u64, user: Address) -> U256;

    fn pending_reward(&self, pid: u64, user: Address) -> U256;

    /// Pay everything pending to `user`; zero when nothing is pending.
    fn harvest(&self, user: Address, pid: u64) -> Result<U256>;
}
