use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::id::Identity;
use tally_core::messages::{Envelope, MessageHash};
use tally_core::LedgerError;

/// A receipt of one processed envelope.
///
/// Every mutating operation reports success or a specific failure kind to
/// the transport for observability; a rejected message leaves all balances
/// and flags exactly as before, and the receipt is the record of that
/// rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Content hash of the processed envelope
    pub message_hash: MessageHash,

    /// Identity that sent the message
    pub source: Identity,

    /// Identity the message was addressed to
    pub destination: Identity,

    /// Operation name, e.g. "Mint" or "Transfer"
    pub operation: String,

    /// Whether the message was accepted
    pub success: bool,

    /// The specific rejection, when not successful
    pub error: Option<LedgerError>,

    /// Stable numeric code for the rejection, when not successful
    pub exit_code: Option<u32>,

    /// Number of envelopes the handler emitted
    pub emitted: usize,

    /// Unix timestamp when the message was processed
    pub timestamp: i64,
}

impl DeliveryReceipt {
    /// Receipt for an accepted message that emitted `emitted` envelopes
    pub fn accepted(envelope: &Envelope, emitted: usize) -> Self {
        Self {
            message_hash: envelope.hash(),
            source: envelope.source,
            destination: envelope.destination,
            operation: envelope.payload.name().to_string(),
            success: true,
            error: None,
            exit_code: None,
            emitted,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Receipt for a rejected message; nothing was mutated or emitted
    pub fn rejected(envelope: &Envelope, error: LedgerError) -> Self {
        Self {
            message_hash: envelope.hash(),
            source: envelope.source,
            destination: envelope.destination,
            operation: envelope.payload.name().to_string(),
            success: false,
            error: Some(error),
            exit_code: Some(error.exit_code()),
            emitted: 0,
            timestamp: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::messages::{MasterMessage, Payload};

    #[test]
    fn test_receipt_round_trip() {
        let owner = Identity::random();
        let master = Identity::random();
        let envelope = Envelope::new(
            owner,
            master,
            Payload::Master(MasterMessage::SetTransferLock { locked: true }),
        );

        let ok = DeliveryReceipt::accepted(&envelope, 0);
        assert!(ok.success);
        assert_eq!(ok.operation, "SetTransferLock");
        assert_eq!(ok.message_hash, envelope.hash());
        assert!(ok.error.is_none());

        let bad = DeliveryReceipt::rejected(&envelope, LedgerError::NotOwner);
        assert!(!bad.success);
        assert_eq!(bad.error, Some(LedgerError::NotOwner));
        assert_eq!(bad.exit_code, Some(3734));
        assert_eq!(bad.emitted, 0);
    }
}
