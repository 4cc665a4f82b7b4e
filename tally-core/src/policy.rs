//! Authorization predicates shared by both actors.
//!
//! These are pure functions over identities: nothing here is stateful, and
//! both actors apply them before any mutating operation. A failed check is
//! always a terminal rejection of the triggering message.

use crate::id::Identity;

/// Is `sender` the privileged ledger owner?
pub fn is_owner(sender: &Identity, owner: &Identity) -> bool {
    sender == owner
}

/// Is `sender` the master actor this account answers to?
pub fn is_master(sender: &Identity, master: &Identity) -> bool {
    sender == master
}

/// Is `sender` the holder that owns this account's balance?
pub fn is_holder(sender: &Identity, holder: &Identity) -> bool {
    sender == holder
}
