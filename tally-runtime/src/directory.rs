use std::collections::HashMap;

use log::debug;
use tally_core::id::{derive_account_address, Identity};
use tally_core::state::WalletData;

use crate::account::AccountActor;

/// Externally-owned directory mapping holder identity to that holder's
/// account actor.
///
/// Accounts are populated lazily on first delivery; an absent entry means
/// zero balance and unlocked. The actors themselves never iterate the
/// directory; enumeration exists only for host-level diagnostics and
/// invariant checks.
#[derive(Debug, Default)]
pub struct AccountDirectory {
    master: Identity,
    accounts: HashMap<Identity, AccountActor>,
}

impl AccountDirectory {
    pub fn new(master: Identity) -> Self {
        Self {
            master,
            accounts: HashMap::new(),
        }
    }

    /// Derived account address for a holder; pure, no instantiation
    pub fn address_of(&self, holder: &Identity) -> Identity {
        derive_account_address(&self.master, holder)
    }

    /// Look up an existing account without creating it
    pub fn get(&self, holder: &Identity) -> Option<&AccountActor> {
        self.accounts.get(holder)
    }

    /// Fetch the account actor for a holder, creating it on first use
    pub fn resolve(&mut self, holder: Identity) -> &mut AccountActor {
        let master = self.master;
        self.accounts.entry(holder).or_insert_with(|| {
            debug!("creating account actor for {}", holder);
            AccountActor::new(master, holder)
        })
    }

    /// Wallet data snapshot for a holder, if the account exists
    pub fn wallet_data(&self, holder: &Identity) -> Option<WalletData> {
        self.accounts.get(holder).map(|a| a.wallet_data())
    }

    /// Number of instantiated accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all instantiated balances. Diagnostic only: at quiescence it
    /// equals the master's total supply.
    pub fn circulating_balance(&self) -> u128 {
        self.accounts.values().map(|a| a.state().balance).sum()
    }
}
