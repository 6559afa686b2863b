//! Wires a [`DeploymentConfig`] into a running simulation: one host chain,
//! simulated protocols, strategy factories, the shared registry and the
//! wallet factory.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::adapters::StrategyFactory;
use crate::adapters::belt::{BeltConfig, BeltStrategyFactory};
use crate::adapters::depth::{DepthConfig, DepthStrategyFactory};
use crate::chain::Chain;
use crate::config::{BeltSection, DepthProduct, DeploymentConfig, ScenarioStep};
use crate::error::{Result, WalletError};
use crate::protocols::Farm;
use crate::protocols::sim::{SimFarm, SimStablePool, SimVault};
use crate::registry::{GlobalConfig, StrategyRegistry};
use crate::token::{TokenInterface, parse_units};
use crate::types::TokenInfo;
use crate::wallet::SmartWallet;
use crate::wallet_factory::SmartWalletFactory;

/// Farm behind a strategy name, with the pool id each token stakes into
struct FarmRoute {
    farm: Arc<SimFarm>,
    pids: HashMap<Address, u64>,
}

pub struct Deployment {
    chain: Arc<Chain>,
    config: Arc<GlobalConfig>,
    wallet_factory: SmartWalletFactory,
    owner: Address,
    tokens: HashMap<String, TokenInfo>,
    farms: HashMap<String, FarmRoute>,
    belt_pool: Option<Arc<SimStablePool>>,
    vaults: HashMap<(String, Address), Arc<SimVault>>,
}

impl Deployment {
    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;
        let chain = Arc::new(Chain::new());
        let owner = config.simulation.owner;

        let mut tokens = HashMap::new();
        for token in &config.tokens {
            if let Some(balance) = &token.initial_balance {
                chain.mint(token.address, owner, parse_units(balance, token.decimals)?)?;
            }
            tokens.insert(
                token.symbol.clone(),
                TokenInfo {
                    symbol: token.symbol.clone(),
                    address: token.address,
                    decimals: token.decimals,
                },
            );
        }

        let mut deployment = Self {
            wallet_factory: SmartWalletFactory::new(
                config.simulation.wallet_factory,
                chain.clone(),
            ),
            config: Arc::new(GlobalConfig::new(
                config.simulation.global_config,
                StrategyRegistry::new(),
            )),
            chain,
            owner,
            tokens,
            farms: HashMap::new(),
            belt_pool: None,
            vaults: HashMap::new(),
        };
        let mut shared_farms: HashMap<Address, Arc<SimFarm>> = HashMap::new();

        if let Some(belt) = &config.belt {
            let factory = deployment.deploy_belt(belt, &mut shared_farms)?;
            deployment.config.set_strategy_factory(&belt.name, factory)?;
        }
        for product in &config.depth {
            let factory = deployment.deploy_depth(product, &mut shared_farms)?;
            deployment.config.set_strategy_factory(&product.name, factory)?;
        }
        Ok(deployment)
    }

    fn farm(
        &self,
        shared: &mut HashMap<Address, Arc<SimFarm>>,
        address: Address,
        reward_token: Address,
    ) -> Result<Arc<SimFarm>> {
        let farm = shared
            .entry(address)
            .or_insert_with(|| Arc::new(SimFarm::new(self.chain.clone(), address, reward_token)));
        if farm.reward_token() != reward_token {
            return Err(WalletError::ConfigError(format!(
                "farm {address} pays {}, not {reward_token}",
                farm.reward_token()
            )));
        }
        Ok(Arc::clone(farm))
    }

    fn deploy_belt(
        &mut self,
        belt: &BeltSection,
        shared: &mut HashMap<Address, Arc<SimFarm>>,
    ) -> Result<Arc<dyn StrategyFactory>> {
        let coins = belt
            .coins
            .iter()
            .map(|symbol| self.token(symbol).map(|info| (info.address, info.decimals)))
            .collect::<Result<Vec<_>>>()?;
        let pool = Arc::new(SimStablePool::new(
            self.chain.clone(),
            belt.depositor,
            belt.lp_token,
            coins.clone(),
            belt.exit_fee_bps,
        ));
        let farm = self.farm(shared, belt.farm, belt.reward_token)?;
        farm.add_pool(belt.pool_id, belt.lp_token)?;

        let routing = BeltConfig::new(pool.clone(), farm.clone(), belt.pool_id)?;
        self.belt_pool = Some(pool);
        self.farms.insert(
            belt.name.clone(),
            FarmRoute {
                farm,
                pids: coins
                    .into_iter()
                    .map(|(coin, _)| (coin, belt.pool_id))
                    .collect(),
            },
        );
        tracing::info!(
            "Deployed {} over pool {} and farm {}",
            belt.name,
            belt.depositor,
            belt.farm
        );
        Ok(Arc::new(BeltStrategyFactory::new(
            belt.factory,
            self.chain.clone(),
            routing,
        )))
    }

    fn deploy_depth(
        &mut self,
        product: &DepthProduct,
        shared: &mut HashMap<Address, Arc<SimFarm>>,
    ) -> Result<Arc<dyn StrategyFactory>> {
        let farm = self.farm(shared, product.farm, product.reward_token)?;
        let mut routing = DepthConfig::new(farm.clone());
        let mut pids = HashMap::new();
        for entry in &product.vaults {
            let token = self.token(&entry.token)?.address;
            let vault = Arc::new(SimVault::new(
                self.chain.clone(),
                entry.vault,
                token,
                entry.exit_fee_bps,
            ));
            farm.add_pool(entry.pid, entry.vault)?;
            routing = routing.with_vault(token, vault.clone(), entry.pid)?;
            pids.insert(token, entry.pid);
            self.vaults.insert((product.name.clone(), token), vault);
        }
        self.farms
            .insert(product.name.clone(), FarmRoute { farm, pids });
        tracing::info!("Deployed {} with {} vaults", product.name, product.vaults.len());
        Ok(Arc::new(DepthStrategyFactory::new(
            product.factory,
            self.chain.clone(),
            routing,
        )))
    }

    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    pub fn global_config(&self) -> &Arc<GlobalConfig> {
        &self.config
    }

    pub fn wallet_factory(&self) -> &SmartWalletFactory {
        &self.wallet_factory
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn token(&self, symbol: &str) -> Result<&TokenInfo> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| WalletError::ConfigError(format!("Unknown token {symbol}")))
    }

    /// Parse a human amount of `symbol` into base units.
    pub fn amount(&self, symbol: &str, human: &str) -> Result<U256> {
        parse_units(human, self.token(symbol)?.decimals)
    }

    pub fn belt_pool(&self) -> Option<&Arc<SimStablePool>> {
        self.belt_pool.as_ref()
    }

    pub fn vault(&self, strategy: &str, symbol: &str) -> Option<&Arc<SimVault>> {
        let token = self.tokens.get(symbol)?.address;
        self.vaults.get(&(strategy.to_string(), token))
    }

    /// New wallet for the deployment owner, with unlimited allowances from
    /// the owner for every configured token.
    pub fn new_wallet(&self) -> Result<SmartWallet> {
        self.new_wallet_for(self.owner)
    }

    pub fn new_wallet_for(&self, owner: Address) -> Result<SmartWallet> {
        let wallet = self
            .wallet_factory
            .new_smart_wallet(owner, Arc::clone(&self.config))?;
        self.chain.atomic(|| {
            for token in self.tokens.values() {
                self.chain
                    .approve(token.address, owner, wallet.address(), U256::MAX)?;
            }
            Ok(())
        })?;
        Ok(wallet)
    }

    /// Credit `amount` of farm reward to `wallet`'s adapter for `symbol`.
    pub fn accrue_reward(
        &self,
        wallet: &SmartWallet,
        symbol: &str,
        strategy: &str,
        amount: U256,
    ) -> Result<()> {
        let token = self.token(symbol)?.address;
        let route = self
            .farms
            .get(strategy)
            .ok_or_else(|| WalletError::UnknownStrategy(strategy.to_string()))?;
        let pid = route.pids.get(&token).copied().ok_or_else(|| {
            WalletError::UnsupportedToken {
                strategy: strategy.to_string(),
                token,
            }
        })?;
        let adapter = self
            .config
            .snapshot()
            .factory_of(strategy)?
            .adapter_of(wallet.address(), token, strategy)
            .ok_or_else(|| {
                WalletError::ConfigError(format!("{} has no {strategy} position", wallet.address()))
            })?;
        self.chain
            .atomic(|| route.farm.accrue_reward(pid, adapter.address(), amount))
    }

    /// Replay one scenario step as the wallet owner.
    pub fn run_step(&self, wallet: &SmartWallet, step: &ScenarioStep) -> Result<()> {
        let caller = wallet.owner();
        let token = self.token(step.token())?.address;
        let amount = step
            .amount()
            .map(|human| self.amount(step.token(), human))
            .transpose()?
            .unwrap_or_default();
        match step {
            ScenarioStep::DepositCash { .. } => wallet.deposit_cash(caller, token, amount),
            ScenarioStep::WithdrawCash { .. } => wallet.withdraw_cash(caller, token, amount),
            ScenarioStep::Invest { strategy, .. } => {
                wallet.invest_from_wallet(caller, token, amount, strategy)
            }
            ScenarioStep::Divest { strategy, .. } => wallet
                .withdraw_to_wallet(caller, token, amount, strategy)
                .map(|_| ()),
            ScenarioStep::DirectInvest { strategy, .. } => {
                wallet.direct_invest(caller, token, amount, strategy)
            }
            ScenarioStep::DirectWithdraw { strategy, .. } => wallet
                .direct_withdraw(caller, token, amount, strategy)
                .map(|_| ()),
            ScenarioStep::ClaimRewards { strategy, .. } => wallet
                .direct_claim_rewards(caller, token, strategy)
                .map(|_| ()),
            ScenarioStep::AccrueReward { token, strategy, .. } => {
                self.accrue_reward(wallet, token, strategy, amount)
            }
        }
    }
}
