use log::{debug, info};
use tally_core::id::{derive_account_address, derive_master_address, Identity};
use tally_core::messages::{AccountMessage, Envelope, ExternalMessage, MasterMessage, Payload};
use tally_core::policy;
use tally_core::state::{MasterData, MasterState};
use tally_core::LedgerError;

/// The singleton master actor for one ledger.
///
/// Owns the authoritative supply bookkeeping and the global transfer lock,
/// and derives account actor addresses deterministically from holder
/// identities. Processes one message at a time; a handler never blocks and
/// returns the envelopes it wants the transport to deliver.
#[derive(Debug, Clone)]
pub struct MasterActor {
    address: Identity,
    state: MasterState,
}

impl MasterActor {
    /// Create the master at genesis with zero supply
    pub fn new(owner: Identity, content: Vec<u8>, max_supply: u128) -> Self {
        let address = derive_master_address(&owner, &content);
        Self {
            address,
            state: MasterState::new(owner, content, max_supply),
        }
    }

    /// The master's own identity, used as the envelope source for every
    /// message it emits
    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn state(&self) -> &MasterState {
        &self.state
    }

    /// Side-effect-free data query; no authorization required
    pub fn master_data(&self) -> MasterData {
        MasterData {
            total_supply: self.state.total_supply,
            mintable: self.state.mintable,
            owner: self.state.owner,
            content: self.state.content.clone(),
            transfer_locked: self.state.transfer_locked,
            max_supply: self.state.max_supply,
        }
    }

    /// Derived account actor address for a holder; pure
    pub fn wallet_address(&self, holder: &Identity) -> Identity {
        derive_account_address(&self.address, holder)
    }

    /// Process one inbound message.
    ///
    /// Returns the envelopes to deliver on success. On rejection no state
    /// was mutated and nothing is emitted.
    pub fn handle(
        &mut self,
        sender: &Identity,
        message: MasterMessage,
    ) -> Result<Vec<Envelope>, LedgerError> {
        match message {
            MasterMessage::Mint { receiver, amount } => self.mint(sender, receiver, amount),
            MasterMessage::SetTransferLock { locked } => self.set_transfer_lock(sender, locked),
            MasterMessage::UpdateTransferLock { holder, locked } => {
                self.update_transfer_lock(sender, holder, locked)
            }
            MasterMessage::BurnNotification {
                query_id,
                holder,
                amount,
                response_destination,
            } => self.burn_notification(sender, query_id, holder, amount, response_destination),
        }
    }

    fn mint(
        &mut self,
        sender: &Identity,
        receiver: Identity,
        amount: u128,
    ) -> Result<Vec<Envelope>, LedgerError> {
        if !policy::is_owner(sender, &self.state.owner) {
            return Err(LedgerError::NotOwner);
        }
        if self.state.transfer_locked {
            return Err(LedgerError::TransfersLocked);
        }
        if !self.state.mintable {
            return Err(LedgerError::NotMintable);
        }

        let new_supply = self
            .state
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyExceeded)?;
        if new_supply > self.state.max_supply {
            return Err(LedgerError::SupplyExceeded);
        }

        self.state.total_supply = new_supply;
        if self.state.total_supply == self.state.max_supply {
            // The cap is final: once reached, minting is disabled for good
            self.state.mintable = false;
            info!("supply cap {} reached, minting disabled", self.state.max_supply);
        }

        info!("minted {} to {}, supply now {}", amount, receiver, new_supply);

        // Credit leg: same shape as a peer transfer, sourced by the master
        Ok(vec![Envelope::new(
            self.address,
            receiver,
            Payload::Account(AccountMessage::TransferNotify {
                query_id: 0,
                from: self.state.owner,
                amount,
                forward_amount: 0,
                forward_payload: Vec::new(),
                response_destination: None,
            }),
        )])
    }

    fn set_transfer_lock(
        &mut self,
        sender: &Identity,
        locked: bool,
    ) -> Result<Vec<Envelope>, LedgerError> {
        if !policy::is_owner(sender, &self.state.owner) {
            return Err(LedgerError::NotOwner);
        }

        // Master flag only. Account caches keep their old value until the
        // owner propagates explicitly, so the two levels can diverge.
        self.state.transfer_locked = locked;
        debug!("global transfer lock set to {}", locked);

        Ok(Vec::new())
    }

    fn update_transfer_lock(
        &mut self,
        sender: &Identity,
        holder: Identity,
        locked: bool,
    ) -> Result<Vec<Envelope>, LedgerError> {
        let from_self = policy::is_master(sender, &self.address);
        if !from_self && !policy::is_owner(sender, &self.state.owner) {
            return Err(LedgerError::NotOwner);
        }

        debug!("propagating lock={} to account of {}", locked, holder);

        Ok(vec![Envelope::new(
            self.address,
            holder,
            Payload::Account(AccountMessage::LockPropagate { locked }),
        )])
    }

    fn burn_notification(
        &mut self,
        sender: &Identity,
        query_id: u64,
        holder: Identity,
        amount: u128,
        response_destination: Option<Identity>,
    ) -> Result<Vec<Envelope>, LedgerError> {
        // Only the holder's derived account actor may report a burn
        let expected = derive_account_address(&self.address, &holder);
        if !policy::is_master(sender, &expected) {
            return Err(LedgerError::Unauthorized);
        }

        // The account already debited its balance, so the subtraction can
        // only fail on a forged amount
        self.state.total_supply = self
            .state
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::Unauthorized)?;

        info!(
            "burned {} from {}, supply now {}",
            amount, holder, self.state.total_supply
        );

        let mut out = Vec::new();
        if let Some(destination) = response_destination {
            out.push(Envelope::new(
                self.address,
                destination,
                Payload::External(ExternalMessage::Excesses { query_id }),
            ));
        }
        Ok(out)
    }
}
