//! Per-owner custodial ledger.
//!
//! Every mutating operation runs inside [`Chain::atomic`] and touches the
//! in-memory ledger only after its last fallible step, so a failed call
//! leaves both token balances and recorded amounts exactly as they were.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolEvent;

use crate::adapters::{StrategyAdapter, StrategyFactory};
use crate::chain::Chain;
use crate::error::{Result, WalletError};
use crate::events::{CashDeposited, CashWithdrawn, Divested, Invested, RewardsClaimed};
use crate::registry::{GlobalConfig, StrategyRegistry};
use crate::token::TokenInterface;
use crate::types::{CashBalance, PositionSnapshot, WalletSummary, WithdrawReceipt};

#[derive(Default)]
struct Ledger {
    cash: BTreeMap<Address, U256>,
    invested: BTreeMap<(Address, String), U256>,
    /// Factory each strategy name resolved to when last invested
    bindings: HashMap<String, Arc<dyn StrategyFactory>>,
}

impl Ledger {
    fn cash(&self, token: Address) -> U256 {
        self.cash.get(&token).copied().unwrap_or_default()
    }

    fn invested(&self, token: Address, strategy: &str) -> U256 {
        self.invested
            .get(&(token, strategy.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn set_cash(&mut self, token: Address, amount: U256) {
        if amount.is_zero() {
            self.cash.remove(&token);
        } else {
            self.cash.insert(token, amount);
        }
    }

    fn set_invested(&mut self, token: Address, strategy: &str, amount: U256) {
        let key = (token, strategy.to_string());
        if amount.is_zero() {
            self.invested.remove(&key);
        } else {
            self.invested.insert(key, amount);
        }
    }

    fn holds_position(&self, strategy: &str) -> bool {
        self.invested
            .iter()
            .any(|((_, name), amount)| name == strategy && !amount.is_zero())
    }

    /// The pinned factory while a position under `strategy` is open,
    /// otherwise whatever `registry` routes the name to.
    ///
    /// A lossy exit can leave a residual record that no withdrawal can
    /// reach. That residual keeps the pin in place for good, so after a
    /// re-point new deposits under the name still go to the old factory.
    fn resolve(
        &self,
        registry: &StrategyRegistry,
        strategy: &str,
    ) -> Result<Arc<dyn StrategyFactory>> {
        match self.bindings.get(strategy) {
            Some(bound) if self.holds_position(strategy) => Ok(Arc::clone(bound)),
            _ => registry.factory_of(strategy),
        }
    }
}

pub struct SmartWallet {
    address: Address,
    owner: Address,
    chain: Arc<Chain>,
    config: Arc<GlobalConfig>,
    ledger: Mutex<Ledger>,
}

impl SmartWallet {
    pub(crate) fn new(
        address: Address,
        owner: Address,
        chain: Arc<Chain>,
        config: Arc<GlobalConfig>,
    ) -> Self {
        Self {
            address,
            owner,
            chain,
            config,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn only_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(WalletError::NotOwner {
                caller,
                owner: self.owner,
            });
        }
        Ok(())
    }

    fn authorize(&self, caller: Address, amount: U256) -> Result<()> {
        self.only_owner(caller)?;
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        Ok(())
    }

    fn emit(&self, event: impl SolEvent) {
        self.chain.emit(self.address, event.encode_log_data());
    }

    // ── Cash ────────────────────────────────────────────────────────────────

    /// Pull `amount` of `token` from the owner (who must have approved the
    /// wallet) into idle cash.
    pub fn deposit_cash(&self, caller: Address, token: Address, amount: U256) -> Result<()> {
        self.authorize(caller, amount)?;
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let cash = ledger
                .cash(token)
                .checked_add(amount)
                .ok_or_else(|| WalletError::ArithmeticOverflow(format!("cash of {token}")))?;
            self.chain
                .transfer_from(token, self.address, caller, self.address, amount)?;

            ledger.set_cash(token, cash);
            self.emit(CashDeposited { token, amount });
            tracing::info!(wallet = %self.address, %token, %amount, "cash deposited");
            Ok(())
        })
    }

    /// Send `amount` of idle `token` back to the owner.
    pub fn withdraw_cash(&self, caller: Address, token: Address, amount: U256) -> Result<()> {
        self.authorize(caller, amount)?;
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let have = ledger.cash(token);
            if have < amount {
                return Err(WalletError::InsufficientCashBalance {
                    token,
                    have,
                    need: amount,
                });
            }
            self.chain.transfer(token, self.address, caller, amount)?;

            ledger.set_cash(token, have - amount);
            self.emit(CashWithdrawn { token, amount });
            tracing::info!(wallet = %self.address, %token, %amount, "cash withdrawn");
            Ok(())
        })
    }

    // ── Wallet-path strategy operations ─────────────────────────────────────

    /// Move `amount` of idle cash into `strategy`.
    pub fn invest_from_wallet(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        strategy: &str,
    ) -> Result<()> {
        self.authorize(caller, amount)?;
        let registry = self.config.snapshot();
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let factory = ledger.resolve(&registry, strategy)?;
            let have = ledger.cash(token);
            if have < amount {
                return Err(WalletError::InsufficientCashBalance {
                    token,
                    have,
                    need: amount,
                });
            }
            let invested = ledger
                .invested(token, strategy)
                .checked_add(amount)
                .ok_or_else(|| WalletError::ArithmeticOverflow(format!("invested in {strategy}")))?;

            let deposit_failed = |source: WalletError| WalletError::AdapterDepositFailed {
                strategy: strategy.to_string(),
                source: Box::new(source),
            };
            let adapter = factory
                .get_or_create_adapter(self.address, token, strategy)
                .map_err(deposit_failed)?;
            self.chain
                .transfer(token, self.address, adapter.address(), amount)?;
            adapter.deposit(amount).map_err(deposit_failed)?;

            ledger.set_cash(token, have - amount);
            ledger.set_invested(token, strategy, invested);
            ledger.bindings.insert(strategy.to_string(), factory);
            self.emit(Invested {
                token,
                strategy: strategy.to_string(),
                amount,
                direct: false,
            });
            tracing::info!(wallet = %self.address, %token, %amount, strategy, "invested from cash");
            Ok(())
        })
    }

    /// Pull up to `amount` back out of `strategy` into idle cash.
    ///
    /// Cash grows by what actually arrived. The recorded investment shrinks
    /// by no more than that, so a lossy exit leaves a residual record.
    pub fn withdraw_to_wallet(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        strategy: &str,
    ) -> Result<WithdrawReceipt> {
        self.authorize(caller, amount)?;
        let registry = self.config.snapshot();
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let factory = ledger.resolve(&registry, strategy)?;
            let invested = ledger.invested(token, strategy);
            if amount > invested {
                return Err(WalletError::InsufficientInvestedBalance {
                    strategy: strategy.to_string(),
                    have: invested,
                    need: amount,
                });
            }
            let adapter = existing_adapter(factory.as_ref(), self.address, token, strategy)?;

            let before = self.chain.balance_of(token, self.address);
            let receipt = adapter.withdraw(amount, self.address)?;
            let received = self
                .chain
                .balance_of(token, self.address)
                .saturating_sub(before);
            let cash = ledger
                .cash(token)
                .checked_add(received)
                .ok_or_else(|| WalletError::ArithmeticOverflow(format!("cash of {token}")))?;
            let reduced = received.min(receipt.removed).min(invested);

            ledger.set_cash(token, cash);
            ledger.set_invested(token, strategy, invested - reduced);
            self.emit(Divested {
                token,
                strategy: strategy.to_string(),
                requested: amount,
                received,
                direct: false,
            });
            tracing::info!(
                wallet = %self.address,
                %token,
                requested = %amount,
                %received,
                strategy,
                "divested to cash"
            );
            Ok(WithdrawReceipt {
                requested: amount,
                removed: reduced,
                received,
            })
        })
    }

    // ── Direct strategy operations ──────────────────────────────────────────

    /// Invest `amount` straight from the owner's own balance (the owner must
    /// have approved the wallet). Cash is untouched.
    pub fn direct_invest(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        strategy: &str,
    ) -> Result<()> {
        self.authorize(caller, amount)?;
        let registry = self.config.snapshot();
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let factory = ledger.resolve(&registry, strategy)?;
            let invested = ledger
                .invested(token, strategy)
                .checked_add(amount)
                .ok_or_else(|| WalletError::ArithmeticOverflow(format!("invested in {strategy}")))?;

            let adapter = factory.get_or_create_adapter(self.address, token, strategy)?;
            self.chain
                .transfer_from(token, self.address, caller, adapter.address(), amount)?;
            adapter.deposit(amount)?;

            ledger.set_invested(token, strategy, invested);
            ledger.bindings.insert(strategy.to_string(), factory);
            self.emit(Invested {
                token,
                strategy: strategy.to_string(),
                amount,
                direct: true,
            });
            tracing::info!(wallet = %self.address, %token, %amount, strategy, "invested directly");
            Ok(())
        })
    }

    /// Withdraw up to `amount` of `strategy` straight to the owner. The
    /// recorded investment drops by the principal the adapter removed.
    pub fn direct_withdraw(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
        strategy: &str,
    ) -> Result<WithdrawReceipt> {
        self.authorize(caller, amount)?;
        let registry = self.config.snapshot();
        self.chain.atomic(|| {
            let mut ledger = self.ledger();
            let factory = ledger.resolve(&registry, strategy)?;
            let invested = ledger.invested(token, strategy);
            if amount > invested {
                return Err(WalletError::InsufficientInvestedBalance {
                    strategy: strategy.to_string(),
                    have: invested,
                    need: amount,
                });
            }
            let adapter = existing_adapter(factory.as_ref(), self.address, token, strategy)?;

            let before = self.chain.balance_of(token, caller);
            let receipt = adapter.withdraw(amount, caller)?;
            let received = self.chain.balance_of(token, caller).saturating_sub(before);
            let reduced = receipt.removed.min(invested);

            ledger.set_invested(token, strategy, invested - reduced);
            self.emit(Divested {
                token,
                strategy: strategy.to_string(),
                requested: amount,
                received,
                direct: true,
            });
            tracing::info!(
                wallet = %self.address,
                %token,
                requested = %amount,
                %received,
                strategy,
                "divested directly"
            );
            Ok(WithdrawReceipt {
                requested: amount,
                removed: reduced,
                received,
            })
        })
    }

    /// Harvest the position's rewards to the owner. Zero when nothing is
    /// pending or no position was ever opened.
    pub fn direct_claim_rewards(
        &self,
        caller: Address,
        token: Address,
        strategy: &str,
    ) -> Result<U256> {
        self.only_owner(caller)?;
        let registry = self.config.snapshot();
        self.chain.atomic(|| {
            let ledger = self.ledger();
            let factory = ledger.resolve(&registry, strategy)?;
            let Some(adapter) = factory.adapter_of(self.address, token, strategy) else {
                return Ok(U256::ZERO);
            };
            let amount = adapter.claim_rewards(caller)?;
            if !amount.is_zero() {
                self.emit(RewardsClaimed {
                    token,
                    strategy: strategy.to_string(),
                    rewardToken: adapter.rewards_token(),
                    amount,
                });
                tracing::info!(
                    wallet = %self.address,
                    %token,
                    %amount,
                    strategy,
                    "rewards claimed"
                );
            }
            Ok(amount)
        })
    }

    // ── Views ───────────────────────────────────────────────────────────────

    pub fn cash_balance(&self, token: Address) -> U256 {
        self.ledger().cash(token)
    }

    /// Recorded investment, not a live valuation
    pub fn invest_balance_of(&self, token: Address, strategy: &str) -> U256 {
        self.ledger().invested(token, strategy)
    }

    /// What the adapter's external position would redeem for now; zero when
    /// the wallet never opened one.
    pub fn live_balance_of(&self, token: Address, strategy: &str) -> Result<U256> {
        let registry = self.config.snapshot();
        let factory = self.ledger().resolve(&registry, strategy)?;
        Ok(factory
            .adapter_of(self.address, token, strategy)
            .map(|adapter| adapter.live_value())
            .unwrap_or_default())
    }

    pub fn rewards_token_address(&self, strategy: &str) -> Result<Address> {
        let registry = self.config.snapshot();
        let factory = self.ledger().resolve(&registry, strategy)?;
        Ok(factory.rewards_token())
    }

    pub fn summary(&self) -> WalletSummary {
        let registry = self.config.snapshot();
        let ledger = self.ledger();
        let cash = ledger
            .cash
            .iter()
            .map(|(token, amount)| CashBalance {
                token: *token,
                amount: *amount,
            })
            .collect();
        let positions = ledger
            .invested
            .iter()
            .map(|((token, strategy), invested)| {
                let live_value = ledger
                    .resolve(&registry, strategy)
                    .ok()
                    .and_then(|factory| factory.adapter_of(self.address, *token, strategy))
                    .map(|adapter| adapter.live_value())
                    .unwrap_or_default();
                PositionSnapshot {
                    token: *token,
                    strategy: strategy.clone(),
                    invested: *invested,
                    live_value,
                }
            })
            .collect();
        WalletSummary {
            wallet: self.address,
            owner: self.owner,
            cash,
            positions,
        }
    }
}

fn existing_adapter(
    factory: &dyn StrategyFactory,
    wallet: Address,
    token: Address,
    strategy: &str,
) -> Result<Arc<dyn StrategyAdapter>> {
    factory
        .adapter_of(wallet, token, strategy)
        .ok_or_else(|| {
            WalletError::exhausted(
                factory.family(),
                format!("no {strategy} position for {token}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::depth::{DepthConfig, DepthStrategyFactory};
    use crate::protocols::sim::{SimFarm, SimVault};
    use crate::types::AdapterState;

    const OWNER: Address = Address::repeat_byte(0x0a);
    const STRANGER: Address = Address::repeat_byte(0x0b);
    const WALLET: Address = Address::repeat_byte(0x5a);
    const USDC: Address = Address::repeat_byte(0x06);
    const DAI: Address = Address::repeat_byte(0x0d);
    const VAULT: Address = Address::repeat_byte(0xd1);
    const FARM: Address = Address::repeat_byte(0xd2);
    const PIGGY: Address = Address::repeat_byte(0xd3);
    const STRATEGY: &str = "Depth-USDC";

    struct Fixture {
        chain: Arc<Chain>,
        vault: Arc<SimVault>,
        config: Arc<GlobalConfig>,
        wallet: SmartWallet,
    }

    fn depth_factory(
        chain: &Arc<Chain>,
        vault: &Arc<SimVault>,
        byte: u8,
    ) -> Arc<dyn StrategyFactory> {
        let farm = Arc::new(SimFarm::new(chain.clone(), FARM, PIGGY));
        farm.add_pool(0, VAULT).unwrap();
        let depth = DepthConfig::new(farm)
            .with_vault(USDC, vault.clone(), 0)
            .unwrap();
        Arc::new(DepthStrategyFactory::new(
            Address::repeat_byte(byte),
            chain.clone(),
            depth,
        ))
    }

    fn fixture() -> Fixture {
        let chain = Arc::new(Chain::new());
        chain.mint(USDC, OWNER, U256::from(1_000u64)).unwrap();
        chain.approve(USDC, OWNER, WALLET, U256::MAX).unwrap();
        let vault = Arc::new(SimVault::new(chain.clone(), VAULT, USDC, 0));
        let registry = StrategyRegistry::new()
            .with_factory(STRATEGY, depth_factory(&chain, &vault, 0xe1))
            .unwrap();
        let config = Arc::new(GlobalConfig::new(Address::repeat_byte(0xcf), registry));
        let wallet = SmartWallet::new(WALLET, OWNER, chain.clone(), config.clone());
        Fixture {
            chain,
            vault,
            config,
            wallet,
        }
    }

    fn amount(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn test_cash_round_trip() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(400)).unwrap();
        assert_eq!(f.wallet.cash_balance(USDC), amount(400));
        assert_eq!(f.chain.balance_of(USDC, WALLET), amount(400));

        f.wallet.withdraw_cash(OWNER, USDC, amount(150)).unwrap();
        assert_eq!(f.wallet.cash_balance(USDC), amount(250));
        assert_eq!(f.chain.balance_of(USDC, OWNER), amount(750));
    }

    #[test]
    fn test_deposit_without_allowance_fails() {
        let f = fixture();
        f.chain.approve(USDC, OWNER, WALLET, U256::ZERO).unwrap();
        let err = f.wallet.deposit_cash(OWNER, USDC, amount(1)).unwrap_err();
        assert!(matches!(err, WalletError::TransferFailed(_)));
        assert_eq!(f.wallet.cash_balance(USDC), U256::ZERO);
    }

    #[test]
    fn test_withdraw_more_cash_than_held() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(10)).unwrap();
        assert_eq!(
            f.wallet.withdraw_cash(OWNER, USDC, amount(11)).unwrap_err(),
            WalletError::InsufficientCashBalance {
                token: USDC,
                have: amount(10),
                need: amount(11)
            }
        );
    }

    #[test]
    fn test_only_owner_mutates() {
        let f = fixture();
        f.chain.mint(USDC, STRANGER, amount(10)).unwrap();
        f.chain.approve(USDC, STRANGER, WALLET, U256::MAX).unwrap();
        assert_eq!(
            f.wallet.deposit_cash(STRANGER, USDC, amount(10)).unwrap_err(),
            WalletError::NotOwner {
                caller: STRANGER,
                owner: OWNER
            }
        );
        assert!(matches!(
            f.wallet.direct_claim_rewards(STRANGER, USDC, STRATEGY),
            Err(WalletError::NotOwner { .. })
        ));
        assert_eq!(f.chain.balance_of(USDC, STRANGER), amount(10));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let f = fixture();
        assert_eq!(
            f.wallet
                .invest_from_wallet(OWNER, USDC, U256::ZERO, STRATEGY)
                .unwrap_err(),
            WalletError::ZeroAmount
        );
    }

    #[test]
    fn test_unknown_strategy_checked_before_cash() {
        let f = fixture();
        assert_eq!(
            f.wallet
                .invest_from_wallet(OWNER, USDC, amount(5), "nope")
                .unwrap_err(),
            WalletError::UnknownStrategy("nope".into())
        );
    }

    #[test]
    fn test_failed_adapter_deposit_restores_cash() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(100)).unwrap();
        f.vault.set_paused(true);

        let err = f
            .wallet
            .invest_from_wallet(OWNER, USDC, amount(100), STRATEGY)
            .unwrap_err();
        assert!(matches!(err, WalletError::AdapterDepositFailed { .. }));
        assert_eq!(f.wallet.cash_balance(USDC), amount(100));
        assert_eq!(f.chain.balance_of(USDC, WALLET), amount(100));
        assert_eq!(f.wallet.invest_balance_of(USDC, STRATEGY), U256::ZERO);
    }

    #[test]
    fn test_unsupported_token_wrapped_on_wallet_path() {
        let f = fixture();
        f.chain.mint(DAI, OWNER, amount(10)).unwrap();
        f.chain.approve(DAI, OWNER, WALLET, U256::MAX).unwrap();
        f.wallet.deposit_cash(OWNER, DAI, amount(10)).unwrap();

        match f
            .wallet
            .invest_from_wallet(OWNER, DAI, amount(10), STRATEGY)
            .unwrap_err()
        {
            WalletError::AdapterDepositFailed { source, .. } => {
                assert!(matches!(*source, WalletError::UnsupportedToken { .. }))
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            f.wallet.direct_invest(OWNER, DAI, amount(10), STRATEGY),
            Err(WalletError::UnsupportedToken { .. })
        ));
    }

    #[test]
    fn test_invest_and_divest() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(500)).unwrap();
        f.wallet
            .invest_from_wallet(OWNER, USDC, amount(500), STRATEGY)
            .unwrap();
        assert_eq!(f.wallet.cash_balance(USDC), U256::ZERO);
        assert_eq!(f.wallet.invest_balance_of(USDC, STRATEGY), amount(500));
        assert_eq!(f.wallet.live_balance_of(USDC, STRATEGY).unwrap(), amount(500));

        let receipt = f
            .wallet
            .withdraw_to_wallet(OWNER, USDC, amount(200), STRATEGY)
            .unwrap();
        assert_eq!(receipt.received, amount(200));
        assert_eq!(f.wallet.cash_balance(USDC), amount(200));
        assert_eq!(f.wallet.invest_balance_of(USDC, STRATEGY), amount(300));
    }

    #[test]
    fn test_withdraw_more_than_invested() {
        let f = fixture();
        assert_eq!(
            f.wallet
                .withdraw_to_wallet(OWNER, USDC, amount(1), STRATEGY)
                .unwrap_err(),
            WalletError::InsufficientInvestedBalance {
                strategy: STRATEGY.into(),
                have: U256::ZERO,
                need: amount(1)
            }
        );
    }

    #[test]
    fn test_views_without_position() {
        let f = fixture();
        assert_eq!(f.wallet.live_balance_of(USDC, STRATEGY).unwrap(), U256::ZERO);
        assert_eq!(f.wallet.rewards_token_address(STRATEGY).unwrap(), PIGGY);
        assert_eq!(
            f.wallet.direct_claim_rewards(OWNER, USDC, STRATEGY).unwrap(),
            U256::ZERO
        );
        assert!(f.wallet.rewards_token_address("nope").is_err());
    }

    #[test]
    fn test_binding_pinned_while_invested() {
        let f = fixture();
        f.wallet
            .direct_invest(OWNER, USDC, amount(100), STRATEGY)
            .unwrap();
        let replacement = depth_factory(&f.chain, &f.vault, 0xe2);
        f.config
            .set_strategy_factory(STRATEGY, replacement.clone())
            .unwrap();

        // still reaches the original adapter
        f.wallet
            .direct_withdraw(OWNER, USDC, amount(100), STRATEGY)
            .unwrap();
        assert_eq!(f.wallet.invest_balance_of(USDC, STRATEGY), U256::ZERO);
        assert_eq!(f.chain.balance_of(USDC, OWNER), amount(1_000));

        // position closed, so the next investment follows the registry
        f.wallet
            .direct_invest(OWNER, USDC, amount(10), STRATEGY)
            .unwrap();
        let adapter = replacement.adapter_of(WALLET, USDC, STRATEGY).unwrap();
        assert_eq!(adapter.state(), AdapterState::Active);
        assert_eq!(adapter.recorded_deposit(), amount(10));
    }

    #[test]
    fn test_summary_lists_cash_and_positions() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(300)).unwrap();
        f.wallet
            .invest_from_wallet(OWNER, USDC, amount(100), STRATEGY)
            .unwrap();
        let summary = f.wallet.summary();
        assert_eq!(summary.owner, OWNER);
        assert_eq!(
            summary.cash,
            vec![CashBalance {
                token: USDC,
                amount: amount(200)
            }]
        );
        assert_eq!(summary.positions.len(), 1);
        assert_eq!(summary.positions[0].invested, amount(100));
        assert_eq!(summary.positions[0].live_value, amount(100));
    }

    #[test]
    fn test_events_emitted_on_commit_only() {
        let f = fixture();
        f.wallet.deposit_cash(OWNER, USDC, amount(50)).unwrap();
        let _ = f.wallet.withdraw_cash(OWNER, USDC, amount(60));
        let logs = f.chain.logs_of(WALLET);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].topics()[0], CashDeposited::SIGNATURE_HASH);
    }
}
