use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents all possible rejections of a ledger protocol message.
///
/// Every variant is a terminal, synchronous rejection: the triggering
/// message mutates no state and is never retried by the actors. The
/// rejection reaches the transport layer through the delivery receipt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerError {
    /// A privileged master operation (Mint, SetTransferLock,
    /// UpdateTransferLock) came from an identity other than the owner
    #[error("sender is not the ledger owner")]
    NotOwner,

    /// The relevant transfer lock flag is set: the global flag for Mint,
    /// the account's cached flag for Transfer
    #[error("transfers are locked")]
    TransfersLocked,

    /// Minting is permanently disabled because supply already reached the cap
    #[error("token is no longer mintable")]
    NotMintable,

    /// The mint would push total supply beyond the immutable cap
    #[error("max supply exceeded")]
    SupplyExceeded,

    /// The transfer or burn amount exceeds the account balance
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The message source failed an actor-level identity check: a transfer
    /// not signed by the holder, a lock propagation not from the master, or
    /// a credit/burn notification not from a derived peer account
    #[error("unauthorized sender")]
    Unauthorized,
}

impl LedgerError {
    /// Stable numeric exit code for this rejection.
    ///
    /// The codes are part of the wire contract: clients match on them, so
    /// they must never change between releases. 705/706 follow the common
    /// wallet-contract convention for unauthorized and underfunded ops.
    pub fn exit_code(&self) -> u32 {
        match self {
            LedgerError::NotOwner => 3734,
            LedgerError::TransfersLocked => 39864,
            LedgerError::NotMintable => 39865,
            LedgerError::SupplyExceeded => 39866,
            LedgerError::Unauthorized => 705,
            LedgerError::InsufficientBalance => 706,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let all = [
            LedgerError::NotOwner,
            LedgerError::TransfersLocked,
            LedgerError::NotMintable,
            LedgerError::SupplyExceeded,
            LedgerError::InsufficientBalance,
            LedgerError::Unauthorized,
        ];

        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a.exit_code(), b.exit_code());
            }
        }
    }

    #[test]
    fn test_wire_codes_are_pinned() {
        assert_eq!(LedgerError::NotOwner.exit_code(), 3734);
        assert_eq!(LedgerError::TransfersLocked.exit_code(), 39864);
        assert_eq!(LedgerError::Unauthorized.exit_code(), 705);
        assert_eq!(LedgerError::InsufficientBalance.exit_code(), 706);
    }
}
