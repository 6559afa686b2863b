#![allow(dead_code)]

use alloy::primitives::{Address, U256};
use smart_wallet_runtime::config::DeploymentConfig;
use smart_wallet_runtime::Deployment;

pub const USDT: Address = Address::repeat_byte(0x71);
pub const HUSD: Address = Address::repeat_byte(0x8d);
pub const BELT: &str = "belt";
pub const DEPTH: &str = "Depth-Channels";

/// Belt over USDT/HUSD and one Depth product, with the given exit fees.
pub fn deployment(belt_fee_bps: u32, depth_fee_bps: u32) -> Deployment {
    let content = format!(
        r#"
[[tokens]]
symbol = "USDT"
address = "{USDT}"
decimals = 18
initial_balance = "1000"

[[tokens]]
symbol = "HUSD"
address = "{HUSD}"
decimals = 8
initial_balance = "1000"

[belt]
factory = "0x00000000000000000000000000000000000be170"
depositor = "0x00000000000000000000000000000000000be171"
lp_token = "0x00000000000000000000000000000000000be172"
farm = "0x00000000000000000000000000000000000be173"
reward_token = "0x00000000000000000000000000000000000be174"
coins = ["USDT", "HUSD"]
exit_fee_bps = {belt_fee_bps}

[[depth]]
name = "{DEPTH}"
factory = "0x00000000000000000000000000000000000de710"
farm = "0x00000000000000000000000000000000000de700"
reward_token = "0x00000000000000000000000000000000000de701"

[[depth.vaults]]
token = "USDT"
vault = "0x00000000000000000000000000000000000de711"
pid = 0
exit_fee_bps = {depth_fee_bps}

[[depth.vaults]]
token = "HUSD"
vault = "0x00000000000000000000000000000000000de712"
pid = 1
exit_fee_bps = {depth_fee_bps}
"#
    );
    let config = DeploymentConfig::from_toml_str(&content).unwrap();
    Deployment::from_config(&config).unwrap()
}

pub fn usdt(deployment: &Deployment, human: &str) -> U256 {
    deployment.amount("USDT", human).unwrap()
}
