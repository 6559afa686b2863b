//! TOML deployment description: tokens, strategy routing and a scenario to
//! replay against the simulated protocols.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::slippage::BPS_DENOMINATOR;
use crate::token::parse_units;

const MAX_DECIMALS: u8 = 18;

fn default_owner() -> Address {
    Address::repeat_byte(0x0a)
}

fn default_global_config() -> Address {
    Address::repeat_byte(0xcf)
}

fn default_wallet_factory() -> Address {
    Address::repeat_byte(0xfa)
}

fn default_belt_name() -> String {
    "belt".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub belt: Option<BeltSection>,
    #[serde(default)]
    pub depth: Vec<DepthProduct>,
    #[serde(default)]
    pub scenario: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Account that owns the wallet and holds the initial balances
    #[serde(default = "default_owner")]
    pub owner: Address,
    #[serde(default = "default_global_config")]
    pub global_config: Address,
    #[serde(default = "default_wallet_factory")]
    pub wallet_factory: Address,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            global_config: default_global_config(),
            wallet_factory: default_wallet_factory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// Human amount minted to the owner, e.g. `"1000"`
    #[serde(default)]
    pub initial_balance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeltSection {
    #[serde(default = "default_belt_name")]
    pub name: String,
    pub factory: Address,
    /// Stable pool depositor
    pub depositor: Address,
    pub lp_token: Address,
    pub farm: Address,
    #[serde(default)]
    pub pool_id: u64,
    pub reward_token: Address,
    /// Token symbols in pool index order
    pub coins: Vec<String>,
    #[serde(default)]
    pub exit_fee_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepthProduct {
    /// Strategy name, conventionally `Depth-<product>`
    pub name: String,
    pub factory: Address,
    pub farm: Address,
    pub reward_token: Address,
    #[serde(default)]
    pub vaults: Vec<DepthVault>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepthVault {
    pub token: String,
    pub vault: Address,
    pub pid: u64,
    #[serde(default)]
    pub exit_fee_bps: u32,
}

/// One wallet call replayed by the simulator. Amounts are human decimal
/// strings in the token's units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    DepositCash { token: String, amount: String },
    WithdrawCash { token: String, amount: String },
    Invest { token: String, amount: String, strategy: String },
    Divest { token: String, amount: String, strategy: String },
    DirectInvest { token: String, amount: String, strategy: String },
    DirectWithdraw { token: String, amount: String, strategy: String },
    ClaimRewards { token: String, strategy: String },
    /// Credit farm rewards to the wallet's adapter
    AccrueReward { token: String, amount: String, strategy: String },
}

impl ScenarioStep {
    pub fn token(&self) -> &str {
        match self {
            ScenarioStep::DepositCash { token, .. }
            | ScenarioStep::WithdrawCash { token, .. }
            | ScenarioStep::Invest { token, .. }
            | ScenarioStep::Divest { token, .. }
            | ScenarioStep::DirectInvest { token, .. }
            | ScenarioStep::DirectWithdraw { token, .. }
            | ScenarioStep::ClaimRewards { token, .. }
            | ScenarioStep::AccrueReward { token, .. } => token,
        }
    }

    pub fn amount(&self) -> Option<&str> {
        match self {
            ScenarioStep::DepositCash { amount, .. }
            | ScenarioStep::WithdrawCash { amount, .. }
            | ScenarioStep::Invest { amount, .. }
            | ScenarioStep::Divest { amount, .. }
            | ScenarioStep::DirectInvest { amount, .. }
            | ScenarioStep::DirectWithdraw { amount, .. }
            | ScenarioStep::AccrueReward { amount, .. } => Some(amount),
            ScenarioStep::ClaimRewards { .. } => None,
        }
    }

    pub fn strategy(&self) -> Option<&str> {
        match self {
            ScenarioStep::Invest { strategy, .. }
            | ScenarioStep::Divest { strategy, .. }
            | ScenarioStep::DirectInvest { strategy, .. }
            | ScenarioStep::DirectWithdraw { strategy, .. }
            | ScenarioStep::ClaimRewards { strategy, .. }
            | ScenarioStep::AccrueReward { strategy, .. } => Some(strategy),
            ScenarioStep::DepositCash { .. } | ScenarioStep::WithdrawCash { .. } => None,
        }
    }
}

impl DeploymentConfig {
    /// Read, parse and validate a deployment file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WalletError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded deployment from {}: {} tokens, strategies {:?}",
            path.display(),
            config.tokens.len(),
            config.strategy_names()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn token(&self, symbol: &str) -> Option<&TokenConfig> {
        self.tokens.iter().find(|token| token.symbol == symbol)
    }

    /// Every strategy name the deployment registers
    pub fn strategy_names(&self) -> Vec<String> {
        self.belt
            .iter()
            .map(|belt| belt.name.clone())
            .chain(self.depth.iter().map(|product| product.name.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut symbols = HashSet::new();
        let mut addresses = HashSet::new();
        for token in &self.tokens {
            if !symbols.insert(token.symbol.as_str()) {
                return Err(config_error(format!("duplicate token symbol {}", token.symbol)));
            }
            if !addresses.insert(token.address) {
                return Err(config_error(format!("duplicate token address {}", token.address)));
            }
            if token.decimals > MAX_DECIMALS {
                return Err(config_error(format!(
                    "{} has {} decimals, at most {MAX_DECIMALS} supported",
                    token.symbol, token.decimals
                )));
            }
            if let Some(balance) = &token.initial_balance {
                parse_units(balance, token.decimals)?;
            }
        }

        let mut names = HashSet::new();
        for name in self.strategy_names() {
            if name.trim().is_empty() {
                return Err(WalletError::InvalidStrategyName(name));
            }
            if !names.insert(name.clone()) {
                return Err(config_error(format!("duplicate strategy name {name}")));
            }
        }

        if let Some(belt) = &self.belt {
            if belt.coins.is_empty() {
                return Err(config_error(format!("{} lists no coins", belt.name)));
            }
            for coin in &belt.coins {
                self.known_token(coin, &belt.name)?;
            }
            check_fee(belt.exit_fee_bps, &belt.name)?;
        }

        for product in &self.depth {
            for vault in &product.vaults {
                self.known_token(&vault.token, &product.name)?;
                check_fee(vault.exit_fee_bps, &product.name)?;
            }
        }
        self.check_farm_pools()?;

        for (index, step) in self.scenario.iter().enumerate() {
            let token = self.known_token(step.token(), &format!("scenario step {index}"))?;
            if let Some(amount) = step.amount() {
                parse_units(amount, token.decimals)?;
            }
            if let Some(strategy) = step.strategy() {
                if !names.contains(strategy) {
                    return Err(config_error(format!(
                        "scenario step {index} uses unregistered strategy {strategy}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Strategies may share a farm, but each (farm, pool id) stakes exactly
    /// one token.
    fn check_farm_pools(&self) -> Result<()> {
        let belt = self
            .belt
            .iter()
            .map(|belt| (belt.farm, belt.pool_id, belt.lp_token, belt.name.as_str()));
        let depth = self.depth.iter().flat_map(|product| {
            product
                .vaults
                .iter()
                .map(|entry| (product.farm, entry.pid, entry.vault, product.name.as_str()))
        });

        let mut staked: HashMap<(Address, u64), (Address, &str)> = HashMap::new();
        for (farm, pid, token, name) in belt.chain(depth) {
            match staked.get(&(farm, pid)) {
                Some((existing, owner)) if *existing != token => {
                    return Err(config_error(format!(
                        "{name} stakes {token} in farm {farm} pool {pid}, \
                         already used by {owner} for {existing}"
                    )));
                }
                Some(_) => {}
                None => {
                    staked.insert((farm, pid), (token, name));
                }
            }
        }
        Ok(())
    }

    fn known_token(&self, symbol: &str, context: &str) -> Result<&TokenConfig> {
        self.token(symbol)
            .ok_or_else(|| config_error(format!("{context} names unknown token {symbol}")))
    }
}

fn check_fee(fee_bps: u32, context: &str) -> Result<()> {
    if fee_bps > BPS_DENOMINATOR {
        return Err(config_error(format!(
            "{context} exit fee {fee_bps} bps exceeds {BPS_DENOMINATOR}"
        )));
    }
    Ok(())
}

fn config_error(message: String) -> WalletError {
    WalletError::ConfigError(message)
}
