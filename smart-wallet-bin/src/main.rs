use smart_wallet_runtime::config::DeploymentConfig;
use smart_wallet_runtime::token::{TokenInterface, format_units};
use smart_wallet_runtime::{Deployment, SmartWallet};

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    setup_log();

    let path = std::env::var("SMART_WALLET_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .ok_or("Set SMART_WALLET_CONFIG or pass the deployment TOML path")?;

    let config = DeploymentConfig::load(&path)?;
    let deployment = Deployment::from_config(&config)?;
    let wallet = deployment.new_wallet()?;
    tracing::info!(
        "Wallet {} ready for owner {}, {} scenario steps",
        wallet.address(),
        wallet.owner(),
        config.scenario.len()
    );

    let mut failed = 0usize;
    for (index, step) in config.scenario.iter().enumerate() {
        match deployment.run_step(&wallet, step) {
            Ok(()) => tracing::info!("Step {index}: {step:?}"),
            Err(e) => {
                failed += 1;
                tracing::warn!("Step {index} failed: {step:?}: {e}");
            }
        }
    }

    report(&config, &deployment, &wallet);
    println!("{}", serde_json::to_string_pretty(&wallet.summary())?);
    if failed > 0 {
        tracing::warn!("{failed} of {} steps failed", config.scenario.len());
    }
    Ok(())
}

fn report(config: &DeploymentConfig, deployment: &Deployment, wallet: &SmartWallet) {
    let names = config.strategy_names();
    for token in &config.tokens {
        let held = deployment.chain().balance_of(token.address, wallet.owner());
        tracing::info!(
            "{}: owner {} | cash {}",
            token.symbol,
            format_units(held, token.decimals),
            format_units(wallet.cash_balance(token.address), token.decimals)
        );
        for name in &names {
            let invested = wallet.invest_balance_of(token.address, name);
            if invested.is_zero() {
                continue;
            }
            let live = wallet
                .live_balance_of(token.address, name)
                .unwrap_or_default();
            tracing::info!(
                "{}: {name} invested {} | live {}",
                token.symbol,
                format_units(invested, token.decimals),
                format_units(live, token.decimals)
            );
        }
    }
}
