//! Registry re-pointing, wallet independence and the shipped deployment.

mod common;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use common::{DEPTH, USDT, deployment, usdt};
use smart_wallet_runtime::adapters::StrategyFactory;
use smart_wallet_runtime::adapters::depth::{DepthConfig, DepthStrategyFactory};
use smart_wallet_runtime::config::DeploymentConfig;
use smart_wallet_runtime::protocols::YieldVault;
use smart_wallet_runtime::protocols::sim::{SimFarm, SimVault};
use smart_wallet_runtime::token::TokenInterface;
use smart_wallet_runtime::{Deployment, WalletError};

fn replacement_factory(d: &Deployment) -> Arc<dyn StrategyFactory> {
    let chain = d.chain().clone();
    let vault = Arc::new(SimVault::new(
        chain.clone(),
        Address::repeat_byte(0x91),
        USDT,
        0,
    ));
    let farm = Arc::new(SimFarm::new(
        chain.clone(),
        Address::repeat_byte(0x92),
        Address::repeat_byte(0x93),
    ));
    farm.add_pool(0, vault.address()).unwrap();
    let routing = DepthConfig::new(farm).with_vault(USDT, vault, 0).unwrap();
    Arc::new(DepthStrategyFactory::new(
        Address::repeat_byte(0x94),
        chain,
        routing,
    ))
}

#[test]
fn test_repoint_keeps_open_positions_reachable() {
    let d = deployment(0, 0);
    let wallet = d.new_wallet().unwrap();
    let owner = d.owner();
    let amount = usdt(&d, "100");
    let original = d.global_config().snapshot().factory_of(DEPTH).unwrap();

    wallet.deposit_cash(owner, USDT, amount).unwrap();
    wallet.invest_from_wallet(owner, USDT, amount, DEPTH).unwrap();

    let replacement = replacement_factory(&d);
    d.global_config()
        .set_strategy_factory(DEPTH, replacement.clone())
        .unwrap();
    assert_eq!(
        d.global_config()
            .snapshot()
            .factory_of(DEPTH)
            .unwrap()
            .address(),
        replacement.address()
    );

    // the open position still resolves to the original factory
    assert_eq!(wallet.live_balance_of(USDT, DEPTH).unwrap(), amount);
    wallet.withdraw_to_wallet(owner, USDT, amount, DEPTH).unwrap();
    assert_eq!(wallet.cash_balance(USDT), amount);
    assert_eq!(
        original
            .adapter_of(wallet.address(), USDT, DEPTH)
            .unwrap()
            .recorded_deposit(),
        U256::ZERO
    );

    // with nothing left under the name, new money follows the registry
    wallet.invest_from_wallet(owner, USDT, amount, DEPTH).unwrap();
    let adapter = replacement
        .adapter_of(wallet.address(), USDT, DEPTH)
        .unwrap();
    assert_eq!(adapter.recorded_deposit(), amount);
    assert_eq!(
        wallet.rewards_token_address(DEPTH).unwrap(),
        Address::repeat_byte(0x93)
    );
}

#[test]
fn test_lossy_residual_keeps_binding_after_repoint() {
    let d = deployment(0, 100);
    let wallet = d.new_wallet().unwrap();
    let owner = d.owner();
    let amount = usdt(&d, "100");

    wallet.deposit_cash(owner, USDT, amount).unwrap();
    wallet.invest_from_wallet(owner, USDT, amount, DEPTH).unwrap();
    wallet.withdraw_to_wallet(owner, USDT, amount, DEPTH).unwrap();
    let residual = wallet.invest_balance_of(USDT, DEPTH);
    assert!(!residual.is_zero());

    let replacement = replacement_factory(&d);
    d.global_config()
        .set_strategy_factory(DEPTH, replacement.clone())
        .unwrap();

    // the unreachable residual pins the name to the original factory
    let more = usdt(&d, "10");
    wallet.invest_from_wallet(owner, USDT, more, DEPTH).unwrap();
    assert!(replacement.adapter_of(wallet.address(), USDT, DEPTH).is_none());
    assert_eq!(wallet.invest_balance_of(USDT, DEPTH), residual + more);
    assert_ne!(
        wallet.rewards_token_address(DEPTH).unwrap(),
        Address::repeat_byte(0x93)
    );
}

#[test]
fn test_wallets_do_not_share_positions() {
    let d = deployment(0, 0);
    let first = d.new_wallet().unwrap();
    let second = d.new_wallet().unwrap();
    let owner = d.owner();
    assert_ne!(first.address(), second.address());

    first.deposit_cash(owner, USDT, usdt(&d, "30")).unwrap();
    first
        .invest_from_wallet(owner, USDT, usdt(&d, "30"), DEPTH)
        .unwrap();

    assert_eq!(second.invest_balance_of(USDT, DEPTH), U256::ZERO);
    assert_eq!(second.live_balance_of(USDT, DEPTH).unwrap(), U256::ZERO);
    assert!(matches!(
        second.withdraw_to_wallet(owner, USDT, usdt(&d, "30"), DEPTH),
        Err(WalletError::InsufficientInvestedBalance { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wallets_stay_independent() {
    let d = Arc::new(deployment(10, 10));
    let mut handles = Vec::new();

    for index in 0..8u8 {
        let d = d.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let owner = Address::repeat_byte(0x40 + index);
            let amount = usdt(&d, "50");
            d.chain()
                .atomic(|| d.chain().mint(USDT, owner, amount))
                .unwrap();
            let wallet = d.new_wallet_for(owner).unwrap();
            let strategy = if index % 2 == 0 { common::BELT } else { DEPTH };

            wallet.deposit_cash(owner, USDT, amount).unwrap();
            wallet
                .invest_from_wallet(owner, USDT, amount, strategy)
                .unwrap();
            let receipt = wallet
                .withdraw_to_wallet(owner, USDT, usdt(&d, "20"), strategy)
                .unwrap();
            (wallet, strategy, receipt.received)
        }));
    }

    for handle in handles {
        let (wallet, strategy, received) = handle.await.unwrap();
        let d = &d;
        assert_eq!(wallet.cash_balance(USDT), received);
        assert_eq!(
            wallet.invest_balance_of(USDT, strategy),
            usdt(d, "50") - received
        );
        assert_eq!(d.chain().balance_of(USDT, wallet.address()), received);
    }
}

#[test]
fn test_shipped_deployment_scenario_runs() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../smart-wallet-bin/deployment.toml");
    let config = DeploymentConfig::load(path).unwrap();
    let d = Deployment::from_config(&config).unwrap();
    let wallet = d.new_wallet().unwrap();

    for step in &config.scenario {
        d.run_step(&wallet, step).unwrap();
    }

    let usdt = d.token("USDT").unwrap().address;
    let husd = d.token("HUSD").unwrap().address;
    assert_eq!(wallet.invest_balance_of(usdt, "Depth-Lendhub"), d.amount("USDT", "40").unwrap());
    assert_eq!(wallet.invest_balance_of(husd, "Depth-Channels"), U256::ZERO);
    assert!(!wallet.invest_balance_of(usdt, "belt").is_zero());

    let reward = wallet.rewards_token_address("Depth-Channels").unwrap();
    assert_eq!(
        d.chain().balance_of(reward, wallet.owner()),
        d.amount("HUSD", "0.5").unwrap()
    );
    assert_eq!(wallet.summary().positions.len(), 2);
}
