//! ABI events emitted by wallets and the wallet factory.

use alloy::sol;

sol! {
    event WalletCreated(address indexed owner, address wallet);
    event CashDeposited(address indexed token, uint256 amount);
    event CashWithdrawn(address indexed token, uint256 amount);
    event Invested(address indexed token, string strategy, uint256 amount, bool direct);
    event Divested(
        address indexed token,
        string strategy,
        uint256 requested,
        uint256 received,
        bool direct
    );
    event RewardsClaimed(
        address indexed token,
        string strategy,
        address rewardToken,
        uint256 amount
    );
}
