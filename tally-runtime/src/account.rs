use log::{debug, info};
use tally_core::id::{derive_account_address, Identity};
use tally_core::messages::{AccountMessage, Envelope, ExternalMessage, MasterMessage, Payload};
use tally_core::policy;
use tally_core::state::{AccountState, WalletData};
use tally_core::LedgerError;

/// One holder's account actor.
///
/// Owns a single balance and a cached copy of this account's lock flag.
/// The cached flag is updated only by explicit propagation from the master,
/// so it can diverge from the master's global flag at any instant. Like the
/// master, a handler processes one message to completion and returns the
/// envelopes to deliver.
#[derive(Debug, Clone)]
pub struct AccountActor {
    address: Identity,
    state: AccountState,
}

impl AccountActor {
    /// Create a fresh account for `holder` under `master`, zero balance,
    /// unlocked. The address is derived, never chosen.
    pub fn new(master: Identity, holder: Identity) -> Self {
        let address = derive_account_address(&master, &holder);
        Self {
            address,
            state: AccountState::new(holder, master),
        }
    }

    /// This account's derived identity, the envelope source for everything
    /// it emits and the value peers authorize against
    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn holder(&self) -> &Identity {
        &self.state.holder
    }

    /// Side-effect-free data query; no authorization required
    pub fn wallet_data(&self) -> WalletData {
        WalletData {
            balance: self.state.balance,
            holder: self.state.holder,
            master: self.state.master,
            transfer_locked: self.state.transfer_locked,
        }
    }

    /// Process one inbound message.
    ///
    /// Returns the envelopes to deliver on success. On rejection no state
    /// was mutated and nothing is emitted.
    pub fn handle(
        &mut self,
        sender: &Identity,
        message: AccountMessage,
    ) -> Result<Vec<Envelope>, LedgerError> {
        match message {
            AccountMessage::Transfer {
                query_id,
                amount,
                destination,
                response_destination,
                custom_payload: _,
                forward_amount,
                forward_payload,
            } => self.transfer(
                sender,
                query_id,
                amount,
                destination,
                response_destination,
                forward_amount,
                forward_payload,
            ),
            AccountMessage::TransferNotify {
                query_id,
                from,
                amount,
                forward_amount,
                forward_payload,
                response_destination,
            } => self.credit(
                sender,
                query_id,
                from,
                amount,
                forward_amount,
                forward_payload,
                response_destination,
            ),
            AccountMessage::LockPropagate { locked } => self.lock_propagate(sender, locked),
            AccountMessage::Burn {
                query_id,
                amount,
                response_destination,
            } => self.burn(sender, query_id, amount, response_destination),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer(
        &mut self,
        sender: &Identity,
        query_id: u64,
        amount: u128,
        destination: Identity,
        response_destination: Option<Identity>,
        forward_amount: u128,
        forward_payload: Vec<u8>,
    ) -> Result<Vec<Envelope>, LedgerError> {
        if self.state.transfer_locked {
            return Err(LedgerError::TransfersLocked);
        }
        if amount > self.state.balance {
            return Err(LedgerError::InsufficientBalance);
        }
        if !policy::is_holder(sender, &self.state.holder) {
            return Err(LedgerError::Unauthorized);
        }

        self.state.balance -= amount;
        info!(
            "transfer {} from {} to {}, balance now {}",
            amount, self.state.holder, destination, self.state.balance
        );

        Ok(vec![Envelope::new(
            self.address,
            destination,
            Payload::Account(AccountMessage::TransferNotify {
                query_id,
                from: self.state.holder,
                amount,
                forward_amount,
                forward_payload,
                response_destination,
            }),
        )])
    }

    #[allow(clippy::too_many_arguments)]
    fn credit(
        &mut self,
        sender: &Identity,
        query_id: u64,
        from: Identity,
        amount: u128,
        forward_amount: u128,
        forward_payload: Vec<u8>,
        response_destination: Option<Identity>,
    ) -> Result<Vec<Envelope>, LedgerError> {
        // Credits come from the master (mint) or from the sending holder's
        // derived account actor; anything else is forged
        let peer = derive_account_address(&self.state.master, &from);
        if !policy::is_master(sender, &self.state.master) && sender != &peer {
            return Err(LedgerError::Unauthorized);
        }

        // Cannot overflow in practice: total supply is capped
        self.state.balance = self
            .state
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::SupplyExceeded)?;
        debug!(
            "credited {} to {}, balance now {}",
            amount, self.state.holder, self.state.balance
        );

        let mut out = Vec::new();
        if forward_amount > 0 {
            // Signal the receiving holder that units arrived
            out.push(Envelope::new(
                self.address,
                self.state.holder,
                Payload::External(ExternalMessage::TransferNotified {
                    query_id,
                    from,
                    amount,
                    forward_payload,
                }),
            ));
        }
        if let Some(refund_to) = response_destination {
            // Balance-neutral value refund, settled by the transport
            out.push(Envelope::new(
                self.address,
                refund_to,
                Payload::External(ExternalMessage::Excesses { query_id }),
            ));
        }
        Ok(out)
    }

    fn lock_propagate(
        &mut self,
        sender: &Identity,
        locked: bool,
    ) -> Result<Vec<Envelope>, LedgerError> {
        if !policy::is_master(sender, &self.state.master) {
            return Err(LedgerError::Unauthorized);
        }

        // Unconditional overwrite: the master's propagation always wins
        self.state.transfer_locked = locked;
        debug!("account of {} lock set to {}", self.state.holder, locked);

        Ok(Vec::new())
    }

    fn burn(
        &mut self,
        sender: &Identity,
        query_id: u64,
        amount: u128,
        response_destination: Option<Identity>,
    ) -> Result<Vec<Envelope>, LedgerError> {
        // Burn is a supply-reduction path, not a transfer, so the cached
        // transfer lock does not gate it
        if !policy::is_holder(sender, &self.state.holder) {
            return Err(LedgerError::Unauthorized);
        }
        if amount > self.state.balance {
            return Err(LedgerError::InsufficientBalance);
        }

        self.state.balance -= amount;
        info!(
            "burned {} from {}, balance now {}",
            amount, self.state.holder, self.state.balance
        );

        Ok(vec![Envelope::new(
            self.address,
            self.state.master,
            Payload::Master(MasterMessage::BurnNotification {
                query_id,
                holder: self.state.holder,
                amount,
                response_destination,
            }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_account(balance: u128) -> (Identity, Identity, AccountActor) {
        let master = Identity::random();
        let holder = Identity::random();
        let mut account = AccountActor::new(master, holder);

        account
            .handle(
                &master,
                AccountMessage::TransferNotify {
                    query_id: 0,
                    from: holder,
                    amount: balance,
                    forward_amount: 0,
                    forward_payload: Vec::new(),
                    response_destination: None,
                },
            )
            .unwrap();

        (master, holder, account)
    }

    fn transfer_msg(amount: u128, destination: Identity) -> AccountMessage {
        AccountMessage::Transfer {
            query_id: 1,
            amount,
            destination,
            response_destination: None,
            custom_payload: None,
            forward_amount: 0,
            forward_payload: Vec::new(),
        }
    }

    #[test]
    fn test_credit_from_master() {
        let (_, _, account) = funded_account(1000);
        assert_eq!(account.state().balance, 1000);
    }

    #[test]
    fn test_credit_from_forged_sender_rejected() {
        let master = Identity::random();
        let holder = Identity::random();
        let stranger = Identity::random();
        let mut account = AccountActor::new(master, holder);

        let err = account
            .handle(
                &stranger,
                AccountMessage::TransferNotify {
                    query_id: 0,
                    from: stranger,
                    amount: 1000,
                    forward_amount: 0,
                    forward_payload: Vec::new(),
                    response_destination: None,
                },
            )
            .unwrap_err();

        assert_eq!(err, LedgerError::Unauthorized);
        assert_eq!(account.state().balance, 0);
    }

    #[test]
    fn test_transfer_debits_and_notifies() {
        let (_, holder, mut account) = funded_account(1000);
        let receiver = Identity::random();

        let out = account.handle(&holder, transfer_msg(100, receiver)).unwrap();

        assert_eq!(account.state().balance, 900);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination, receiver);
        assert_eq!(out[0].source, *account.address());
        assert!(matches!(
            out[0].payload,
            Payload::Account(AccountMessage::TransferNotify { amount: 100, .. })
        ));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let (_, holder, mut account) = funded_account(1000);
        let receiver = Identity::random();

        let err = account
            .handle(&holder, transfer_msg(1001, receiver))
            .unwrap_err();

        assert_eq!(err, LedgerError::InsufficientBalance);
        assert_eq!(account.state().balance, 1000);
    }

    #[test]
    fn test_transfer_from_non_holder_rejected() {
        let (_, _, mut account) = funded_account(1000);
        let intruder = Identity::random();
        let receiver = Identity::random();

        let err = account
            .handle(&intruder, transfer_msg(100, receiver))
            .unwrap_err();

        assert_eq!(err, LedgerError::Unauthorized);
        assert_eq!(account.state().balance, 1000);
    }

    #[test]
    fn test_locked_account_rejects_transfer() {
        let (master, holder, mut account) = funded_account(1000);
        let receiver = Identity::random();

        account
            .handle(&master, AccountMessage::LockPropagate { locked: true })
            .unwrap();

        let err = account
            .handle(&holder, transfer_msg(100, receiver))
            .unwrap_err();
        assert_eq!(err, LedgerError::TransfersLocked);
        assert_eq!(account.state().balance, 1000);

        // Propagating the unlock restores transfers
        account
            .handle(&master, AccountMessage::LockPropagate { locked: false })
            .unwrap();
        account.handle(&holder, transfer_msg(100, receiver)).unwrap();
        assert_eq!(account.state().balance, 900);
    }

    #[test]
    fn test_lock_propagate_requires_master() {
        let (_, holder, mut account) = funded_account(1000);

        let err = account
            .handle(&holder, AccountMessage::LockPropagate { locked: true })
            .unwrap_err();

        assert_eq!(err, LedgerError::Unauthorized);
        assert!(!account.state().transfer_locked);
    }

    #[test]
    fn test_credit_emits_forward_notification_and_excesses() {
        let master = Identity::random();
        let sender_holder = Identity::random();
        let receiver_holder = Identity::random();
        let refund_to = Identity::random();
        let mut account = AccountActor::new(master, receiver_holder);

        let peer = derive_account_address(&master, &sender_holder);
        let out = account
            .handle(
                &peer,
                AccountMessage::TransferNotify {
                    query_id: 42,
                    from: sender_holder,
                    amount: 250,
                    forward_amount: 1,
                    forward_payload: b"hello".to_vec(),
                    response_destination: Some(refund_to),
                },
            )
            .unwrap();

        assert_eq!(account.state().balance, 250);
        assert_eq!(out.len(), 2);

        // Holder notification first, refund second; neither moves balance
        assert_eq!(out[0].destination, receiver_holder);
        assert!(matches!(
            out[0].payload,
            Payload::External(ExternalMessage::TransferNotified { query_id: 42, .. })
        ));
        assert_eq!(out[1].destination, refund_to);
        assert!(matches!(
            out[1].payload,
            Payload::External(ExternalMessage::Excesses { query_id: 42 })
        ));
    }

    #[test]
    fn test_burn_ignores_transfer_lock() {
        let (master, holder, mut account) = funded_account(1000);

        account
            .handle(&master, AccountMessage::LockPropagate { locked: true })
            .unwrap();

        let out = account
            .handle(
                &holder,
                AccountMessage::Burn {
                    query_id: 9,
                    amount: 400,
                    response_destination: None,
                },
            )
            .unwrap();

        assert_eq!(account.state().balance, 600);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination, master);
        assert!(matches!(
            out[0].payload,
            Payload::Master(MasterMessage::BurnNotification { amount: 400, .. })
        ));
    }

    #[test]
    fn test_burn_requires_holder_and_balance() {
        let (_, holder, mut account) = funded_account(1000);
        let intruder = Identity::random();

        let err = account
            .handle(
                &intruder,
                AccountMessage::Burn {
                    query_id: 9,
                    amount: 1,
                    response_destination: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::Unauthorized);

        let err = account
            .handle(
                &holder,
                AccountMessage::Burn {
                    query_id: 9,
                    amount: 1001,
                    response_destination: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance);
        assert_eq!(account.state().balance, 1000);
    }
}
