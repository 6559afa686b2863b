//! In-memory host chain for smart wallets and their strategy adapters.
//!
//! Holds token balances, allowances and the event log. Every mutation made
//! inside [`Chain::atomic`] is journaled so that a failing operation leaves
//! no trace; atomic operations are serialized against each other, which gives
//! all wallets on one chain a single total order.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, Log, LogData, U256};

use crate::error::{Result, WalletError};
use crate::token::TokenInterface;

/// Position in the journal a transaction can be rolled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

enum JournalEntry {
    Balance {
        token: Address,
        account: Address,
        previous: U256,
    },
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        previous: U256,
    },
    Supply {
        token: Address,
        previous: U256,
    },
    Log,
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    supplies: HashMap<Address, U256>,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
    depth: usize,
}

impl ChainState {
    fn balance(&self, token: Address, account: Address) -> U256 {
        self.balances
            .get(&(token, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn set_balance(&mut self, token: Address, account: Address, value: U256) {
        let previous = self.balance(token, account);
        if self.depth > 0 {
            self.journal.push(JournalEntry::Balance {
                token,
                account,
                previous,
            });
        }
        self.balances.insert((token, account), value);
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn set_allowance(&mut self, token: Address, owner: Address, spender: Address, value: U256) {
        let previous = self.allowance(token, owner, spender);
        if self.depth > 0 {
            self.journal.push(JournalEntry::Allowance {
                token,
                owner,
                spender,
                previous,
            });
        }
        self.allowances.insert((token, owner, spender), value);
    }

    fn supply(&self, token: Address) -> U256 {
        self.supplies.get(&token).copied().unwrap_or(U256::ZERO)
    }

    fn set_supply(&mut self, token: Address, value: U256) {
        let previous = self.supply(token);
        if self.depth > 0 {
            self.journal.push(JournalEntry::Supply { token, previous });
        }
        self.supplies.insert(token, value);
    }

    fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        let have = self.balance(token, from);
        if have < amount {
            return Err(WalletError::TransferFailed(format!(
                "{from} holds {have} of {token}, needs {amount}"
            )));
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(token, to)
            .checked_add(amount)
            .ok_or_else(|| WalletError::ArithmeticOverflow(format!("balance of {to}")))?;
        self.set_balance(token, from, have - amount);
        self.set_balance(token, to, credited);
        Ok(())
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance {
                token,
                account,
                previous,
            } => {
                self.balances.insert((token, account), previous);
            }
            JournalEntry::Allowance {
                token,
                owner,
                spender,
                previous,
            } => {
                self.allowances.insert((token, owner, spender), previous);
            }
            JournalEntry::Supply { token, previous } => {
                self.supplies.insert(token, previous);
            }
            JournalEntry::Log => {
                self.logs.pop();
            }
        }
    }
}

/// Shared token book. Mutations made outside [`atomic`](Chain::atomic) are
/// not isolated from a transaction running on another thread, so anything
/// that runs alongside live wallets goes through `atomic`.
#[derive(Default)]
pub struct Chain {
    state: Mutex<ChainState>,
    serial: Mutex<()>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` as one indivisible unit. On `Err` every balance, allowance,
    /// supply and log change made by `op` is undone.
    ///
    /// Must not be nested: `op` may call any other chain method but not
    /// `atomic` itself.
    pub fn atomic<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let _serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        let checkpoint = self.begin();
        match op() {
            Ok(value) => {
                self.commit(checkpoint);
                Ok(value)
            }
            Err(e) => {
                self.revert_to(checkpoint);
                tracing::warn!("Operation rolled back: {e}");
                Err(e)
            }
        }
    }

    fn begin(&self) -> Checkpoint {
        let mut state = self.state();
        state.depth += 1;
        Checkpoint(state.journal.len())
    }

    fn commit(&self, checkpoint: Checkpoint) {
        let mut state = self.state();
        state.depth = state.depth.saturating_sub(1);
        // entries above an inner checkpoint stay until the outermost commit
        if state.depth == 0 && state.journal.len() >= checkpoint.0 {
            state.journal.clear();
        }
    }

    fn revert_to(&self, checkpoint: Checkpoint) {
        let mut state = self.state();
        while state.journal.len() > checkpoint.0 {
            if let Some(entry) = state.journal.pop() {
                state.undo(entry);
            }
        }
        state.depth = state.depth.saturating_sub(1);
    }

    /// Create `amount` of `token` out of thin air for `to`.
    pub fn mint(&self, token: Address, to: Address, amount: U256) -> Result<()> {
        let mut state = self.state();
        let supply = state
            .supply(token)
            .checked_add(amount)
            .ok_or_else(|| WalletError::ArithmeticOverflow(format!("supply of {token}")))?;
        let balance = state.balance(token, to) + amount;
        state.set_supply(token, supply);
        state.set_balance(token, to, balance);
        Ok(())
    }

    pub fn burn(&self, token: Address, from: Address, amount: U256) -> Result<()> {
        let mut state = self.state();
        let have = state.balance(token, from);
        if have < amount {
            return Err(WalletError::TransferFailed(format!(
                "cannot burn {amount} of {token} from {from}: holds {have}"
            )));
        }
        let supply = state.supply(token).saturating_sub(amount);
        state.set_supply(token, supply);
        state.set_balance(token, from, have - amount);
        Ok(())
    }

    pub fn total_supply(&self, token: Address) -> U256 {
        self.state().supply(token)
    }

    pub fn emit(&self, address: Address, data: LogData) {
        let mut state = self.state();
        state.logs.push(Log { address, data });
        if state.depth > 0 {
            state.journal.push(JournalEntry::Log);
        }
    }

    pub fn logs(&self) -> Vec<Log> {
        self.state().logs.clone()
    }

    /// Logs emitted by `address`, oldest first
    pub fn logs_of(&self, address: Address) -> Vec<LogData> {
        self.state()
            .logs
            .iter()
            .filter(|log| log.address == address)
            .map(|log| log.data.clone())
            .collect()
    }
}

impl TokenInterface for Chain {
    fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.state().balance(token, account)
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state().allowance(token, owner, spender)
    }

    fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<()> {
        self.state().set_allowance(token, owner, spender, amount);
        Ok(())
    }

    fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        self.state().move_balance(token, from, to, amount)
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        let mut state = self.state();
        let allowed = state.allowance(token, from, spender);
        if allowed < amount {
            return Err(WalletError::TransferFailed(format!(
                "{spender} may spend {allowed} of {from}'s {token}, needs {amount}"
            )));
        }
        state.move_balance(token, from, to, amount)?;
        if allowed != U256::MAX {
            state.set_allowance(token, from, spender, allowed - amount);
        }
        Ok(())
    }
}
