use std::collections::VecDeque;

use log::{debug, info, warn};
use tally_core::id::Identity;
use tally_core::messages::{Envelope, MessageHash, Payload};
use tally_core::state::{MasterData, WalletData};
use tally_core::LedgerError;

use crate::directory::AccountDirectory;
use crate::master::MasterActor;
use crate::receipt::DeliveryReceipt;

/// Deterministic in-memory message router for one ledger.
///
/// Owns the master actor and the account directory, and plays the role of
/// the external transport: envelopes are queued and delivered one at a
/// time, FIFO, which refines the contract of ordered delivery per
/// (source, destination) pair. Each processed envelope yields a
/// `DeliveryReceipt`; envelopes addressed to identities outside the ledger
/// land in the external outbox untouched.
///
/// Handlers never block and never reply inline; everything an actor wants
/// delivered comes back as emitted envelopes, which the router enqueues
/// behind whatever is already pending.
#[derive(Debug)]
pub struct LedgerRouter {
    master: MasterActor,
    directory: AccountDirectory,
    queue: VecDeque<Envelope>,
    external_outbox: Vec<Envelope>,
    receipts: Vec<DeliveryReceipt>,
}

impl LedgerRouter {
    /// Create a ledger at genesis: a master with zero supply and an empty
    /// account directory
    pub fn new(owner: Identity, content: Vec<u8>, max_supply: u128) -> Self {
        let master = MasterActor::new(owner, content, max_supply);
        let directory = AccountDirectory::new(*master.address());
        info!(
            "ledger created, master {}, max supply {}",
            master.address(),
            max_supply
        );

        Self {
            master,
            directory,
            queue: VecDeque::new(),
            external_outbox: Vec::new(),
            receipts: Vec::new(),
        }
    }

    /// The master actor's derived address
    pub fn master_address(&self) -> &Identity {
        self.master.address()
    }

    /// Queue an envelope for delivery without processing it yet
    pub fn submit(&mut self, envelope: Envelope) -> MessageHash {
        let hash = envelope.hash();
        self.queue.push_back(envelope);
        hash
    }

    /// Submit one envelope, process it and everything it causes, and
    /// return the receipt of the submitted message itself
    pub fn execute(&mut self, envelope: Envelope) -> DeliveryReceipt {
        let root = self.deliver(envelope);
        self.receipts.push(root.clone());
        self.drain();
        root
    }

    /// Process queued envelopes until quiescence (no messages in flight).
    /// Returns the number of envelopes processed.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Some(envelope) = self.queue.pop_front() {
            let receipt = self.deliver(envelope);
            self.receipts.push(receipt);
            processed += 1;
        }
        processed
    }

    /// Deliver a single envelope to its actor and enqueue whatever the
    /// handler emitted
    fn deliver(&mut self, envelope: Envelope) -> DeliveryReceipt {
        let to_master = envelope.destination == *self.master.address();

        let outcome: Result<Option<Vec<Envelope>>, LedgerError> = match envelope.payload.clone() {
            Payload::Master(message) if to_master => self
                .master
                .handle(&envelope.source, message)
                .map(Some),
            Payload::Account(message) if !to_master => self
                .directory
                .resolve(envelope.destination)
                .handle(&envelope.source, message)
                .map(Some),
            Payload::External(_) => {
                // Addressed outside the ledger; hand over untouched
                self.external_outbox.push(envelope.clone());
                Ok(None)
            }
            Payload::Master(_) => {
                // A master operation aimed at something that is not the
                // master; nothing in this ledger accepts it
                self.external_outbox.push(envelope.clone());
                Ok(None)
            }
            Payload::Account(_) => Err(LedgerError::Unauthorized),
        };

        match outcome {
            Ok(emitted) => {
                let emitted = emitted.unwrap_or_default();
                let receipt = DeliveryReceipt::accepted(&envelope, emitted.len());
                debug!(
                    "{} from {} to {} accepted, {} emitted",
                    envelope.payload.name(),
                    envelope.source,
                    envelope.destination,
                    emitted.len()
                );
                for out in emitted {
                    self.queue.push_back(out);
                }
                receipt
            }
            Err(error) => {
                warn!(
                    "{} from {} to {} rejected: {} (code {})",
                    envelope.payload.name(),
                    envelope.source,
                    envelope.destination,
                    error,
                    error.exit_code()
                );
                DeliveryReceipt::rejected(&envelope, error)
            }
        }
    }

    /// Side-effect-free master data query
    pub fn master_data(&self) -> MasterData {
        self.master.master_data()
    }

    /// Side-effect-free wallet data query; None for a never-credited holder
    pub fn wallet_data(&self, holder: &Identity) -> Option<WalletData> {
        self.directory.wallet_data(holder)
    }

    /// Derived account address for a holder
    pub fn wallet_address(&self, holder: &Identity) -> Identity {
        self.directory.address_of(holder)
    }

    /// All receipts in processing order
    pub fn receipts(&self) -> &[DeliveryReceipt] {
        &self.receipts
    }

    /// Envelopes delivered to identities outside the ledger
    pub fn external_outbox(&self) -> &[Envelope] {
        &self.external_outbox
    }

    /// Diagnostic: sum of all instantiated account balances. Equals the
    /// master's total supply whenever the queue is empty.
    pub fn circulating_balance(&self) -> u128 {
        self.directory.circulating_balance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::messages::{AccountMessage, MasterMessage};

    fn new_ledger() -> (Identity, LedgerRouter) {
        let owner = Identity::random();
        let router = LedgerRouter::new(owner, b"Sample Token".to_vec(), 1_000_000);
        (owner, router)
    }

    #[test]
    fn test_mint_flows_through_to_account() {
        let (owner, mut router) = new_ledger();
        let holder = Identity::random();
        let master = *router.master_address();

        let receipt = router.execute(Envelope::new(
            owner,
            master,
            Payload::Master(MasterMessage::Mint {
                receiver: holder,
                amount: 1000,
            }),
        ));

        assert!(receipt.success);
        assert_eq!(receipt.emitted, 1);
        assert_eq!(router.master_data().total_supply, 1000);
        assert_eq!(router.wallet_data(&holder).unwrap().balance, 1000);
        assert_eq!(router.circulating_balance(), 1000);
    }

    #[test]
    fn test_rejection_produces_receipt_and_no_queue_growth() {
        let (_, mut router) = new_ledger();
        let stranger = Identity::random();
        let master = *router.master_address();

        let receipt = router.execute(Envelope::new(
            stranger,
            master,
            Payload::Master(MasterMessage::SetTransferLock { locked: true }),
        ));

        assert!(!receipt.success);
        assert_eq!(receipt.error, Some(LedgerError::NotOwner));
        assert_eq!(receipt.exit_code, Some(3734));
        assert!(!router.master_data().transfer_locked);
        assert_eq!(router.receipts().len(), 1);
    }

    #[test]
    fn test_account_payload_addressed_to_master_is_rejected() {
        let (_, mut router) = new_ledger();
        let stranger = Identity::random();
        let master = *router.master_address();

        let receipt = router.execute(Envelope::new(
            stranger,
            master,
            Payload::Account(AccountMessage::LockPropagate { locked: true }),
        ));

        assert!(!receipt.success);
        assert_eq!(receipt.error, Some(LedgerError::Unauthorized));
    }

    #[test]
    fn test_external_messages_reach_the_outbox() {
        let (owner, mut router) = new_ledger();
        let sender = Identity::random();
        let receiver = Identity::random();
        let master = *router.master_address();

        // Fund the sender, then transfer with a forward notification
        router.execute(Envelope::new(
            owner,
            master,
            Payload::Master(MasterMessage::Mint {
                receiver: sender,
                amount: 500,
            }),
        ));
        router.execute(Envelope::new(
            sender,
            sender,
            Payload::Account(AccountMessage::Transfer {
                query_id: 7,
                amount: 200,
                destination: receiver,
                response_destination: Some(sender),
                custom_payload: None,
                forward_amount: 1,
                forward_payload: Vec::new(),
            }),
        ));

        // TransferNotified to the receiver plus Excesses back to the sender
        assert_eq!(router.external_outbox().len(), 2);
        assert_eq!(router.wallet_data(&receiver).unwrap().balance, 200);
        assert_eq!(router.circulating_balance(), 500);
    }
}
