use crate::id::Identity;
use serde::{Deserialize, Serialize};

/// Authoritative state owned by the master actor
///
/// Created once at genesis and mutated only by the master's own message
/// handlers; never destroyed. The master is the sole mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterState {
    /// The single privileged identity authorized to mint and toggle locks.
    /// Set at genesis; there is no ownership-transfer path.
    pub owner: Identity,

    /// Opaque token metadata blob set at genesis
    pub content: Vec<u8>,

    /// Sum of all minted minus burned units.
    /// Invariant: `total_supply <= max_supply`.
    pub total_supply: u128,

    /// Immutable supply cap set at genesis
    pub max_supply: u128,

    /// Becomes false permanently once supply reaches the cap; burning
    /// below the cap does not re-enable it
    pub mintable: bool,

    /// Master-held global lock. Gates new minting only; per-account caches
    /// diverge until explicitly propagated.
    pub transfer_locked: bool,
}

impl MasterState {
    /// Create the genesis master state: zero supply, mintable, unlocked
    pub fn new(owner: Identity, content: Vec<u8>, max_supply: u128) -> Self {
        Self {
            owner,
            content,
            total_supply: 0,
            max_supply,
            mintable: true,
            transfer_locked: false,
        }
    }

    /// Units still available for minting under the cap
    pub fn remaining_supply(&self) -> u128 {
        self.max_supply.saturating_sub(self.total_supply)
    }
}

/// State owned by one holder's account actor
///
/// Lazily created on first credit with a zero balance; never explicitly
/// destroyed. An absent account is equivalent to zero balance, unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    /// The holder that owns this balance (immutable)
    pub holder: Identity,

    /// Back-reference to the master actor, used only for authorization
    pub master: Identity,

    /// Invariant: the sum of balances over all accounts equals the master's
    /// total supply at quiescence (no messages in flight)
    pub balance: u128,

    /// Cached, independently-mutable copy of this account's lock flag.
    /// Initialized false; updated only by lock propagation from the master,
    /// so it can diverge from the master's global flag at any instant.
    pub transfer_locked: bool,
}

impl AccountState {
    /// Create a fresh account state with a zero balance, unlocked
    pub fn new(holder: Identity, master: Identity) -> Self {
        Self {
            holder,
            master,
            balance: 0,
            transfer_locked: false,
        }
    }
}

/// Snapshot returned by the master's side-effect-free data query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterData {
    pub total_supply: u128,
    pub mintable: bool,
    pub owner: Identity,
    pub content: Vec<u8>,
    pub transfer_locked: bool,
    pub max_supply: u128,
}

/// Snapshot returned by an account's side-effect-free data query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletData {
    pub balance: u128,
    pub holder: Identity,
    pub master: Identity,
    pub transfer_locked: bool,
}
