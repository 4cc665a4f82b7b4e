use crate::id::Identity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Correlation id chosen by the submitting client, echoed through the
/// transfer/notify/excess chain so a client can match responses
pub type QueryId = u64;

/// Message hash type (32-byte array)
pub type MessageHash = [u8; 32];

/// Messages accepted by the master actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MasterMessage {
    /// Create `amount` new units and credit them to `receiver`'s account.
    /// Owner only; gated by the global transfer lock and the supply cap.
    Mint {
        receiver: Identity,
        amount: u128,
    },

    /// Toggle the master-held global lock. Gates minting only; existing
    /// account caches are untouched until explicitly propagated.
    SetTransferLock {
        locked: bool,
    },

    /// Propagate a lock value to one holder's account actor, overwriting
    /// its cached flag unconditionally. Owner only.
    UpdateTransferLock {
        holder: Identity,
        locked: bool,
    },

    /// A holder's account actor reports that it burned `amount` units.
    /// Accepted only from the holder's derived account address.
    BurnNotification {
        query_id: QueryId,
        holder: Identity,
        amount: u128,
        response_destination: Option<Identity>,
    },
}

/// Messages accepted by account actors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountMessage {
    /// Move `amount` units from this account to `destination`'s account.
    /// Holder only; gated by this account's cached lock flag.
    Transfer {
        query_id: QueryId,
        amount: u128,
        /// Holder identity of the receiving party (not a derived address)
        destination: Identity,
        /// Where leftover attached value is refunded after delivery
        response_destination: Option<Identity>,
        /// Opaque payload reserved for the transport layer
        custom_payload: Option<Vec<u8>>,
        /// When non-zero, the receiving account forwards a notification
        /// to its holder
        forward_amount: u128,
        forward_payload: Vec<u8>,
    },

    /// Credit leg of a transfer or mint. Accepted only from the master or
    /// from the sending holder's derived account address; always succeeds
    /// for the receiving side and lazily creates the account state.
    TransferNotify {
        query_id: QueryId,
        /// Holder identity the units came from (the owner, for mints)
        from: Identity,
        amount: u128,
        forward_amount: u128,
        forward_payload: Vec<u8>,
        response_destination: Option<Identity>,
    },

    /// Overwrite this account's cached lock flag. Master only.
    LockPropagate {
        locked: bool,
    },

    /// Destroy `amount` units held by this account and notify the master
    /// so total supply is reduced. Holder only.
    Burn {
        query_id: QueryId,
        amount: u128,
        response_destination: Option<Identity>,
    },
}

/// Messages delivered to plain identities outside the ledger: holders being
/// notified of an incoming transfer, and refund targets. Neither carries
/// balance effects; they exist for observability and value accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExternalMessage {
    /// Forwarded notification to the receiving holder, emitted when the
    /// originating transfer carried a non-zero forward amount
    TransferNotified {
        query_id: QueryId,
        from: Identity,
        amount: u128,
        forward_payload: Vec<u8>,
    },

    /// Refund of leftover attached value to the named response destination
    Excesses {
        query_id: QueryId,
    },
}

/// The typed payload of an envelope, discriminated by which kind of actor
/// accepts it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Master(MasterMessage),
    Account(AccountMessage),
    External(ExternalMessage),
}

impl Payload {
    /// Short operation name for logs and receipts
    pub fn name(&self) -> &'static str {
        match self {
            Payload::Master(MasterMessage::Mint { .. }) => "Mint",
            Payload::Master(MasterMessage::SetTransferLock { .. }) => "SetTransferLock",
            Payload::Master(MasterMessage::UpdateTransferLock { .. }) => "UpdateTransferLock",
            Payload::Master(MasterMessage::BurnNotification { .. }) => "BurnNotification",
            Payload::Account(AccountMessage::Transfer { .. }) => "Transfer",
            Payload::Account(AccountMessage::TransferNotify { .. }) => "TransferNotify",
            Payload::Account(AccountMessage::LockPropagate { .. }) => "LockPropagate",
            Payload::Account(AccountMessage::Burn { .. }) => "Burn",
            Payload::External(ExternalMessage::TransferNotified { .. }) => "TransferNotified",
            Payload::External(ExternalMessage::Excesses { .. }) => "Excesses",
        }
    }
}

/// A routed protocol message: who sent it, which identity it is addressed
/// to, and the typed payload.
///
/// For master messages the destination is the master address; for account
/// messages it is the target holder's identity (the transport resolves the
/// holder to the derived account actor, creating it lazily); external
/// payloads may be addressed to any identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub source: Identity,
    pub destination: Identity,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(source: Identity, destination: Identity, payload: Payload) -> Self {
        Self {
            source,
            destination,
            payload,
        }
    }

    /// Content hash of this envelope, used as the message id in delivery
    /// receipts
    pub fn hash(&self) -> MessageHash {
        // Serializing a plain enum tree into bincode cannot fail
        let bytes = bincode::serialize(self).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(b"TALLY_Envelope");
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}
