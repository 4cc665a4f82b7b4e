//! Tokio-backed mailbox host.
//!
//! Runs the same actor code as the deterministic router, but with real
//! concurrency: the master and every account actor live in their own task
//! behind an unbounded mpsc mailbox, so each processes one message at a
//! time while different actors proceed independently. A router task
//! forwards envelopes between mailboxes and lazily spawns account actors
//! on first delivery.
//!
//! Senders only ever talk to mailboxes, so messages from one source to one
//! destination keep their order; nothing is guaranteed across sources,
//! matching the transport contract. Tasks run until the tokio runtime
//! shuts down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot, Notify};

use tally_core::id::{derive_account_address, Identity};
use tally_core::messages::{Envelope, MessageHash, Payload};
use tally_core::state::{MasterData, WalletData};
use tally_core::LedgerError;

use crate::account::AccountActor;
use crate::master::MasterActor;
use crate::receipt::DeliveryReceipt;

enum MasterRequest {
    Deliver(Envelope),
    Data(oneshot::Sender<MasterData>),
}

enum AccountRequest {
    Deliver(Envelope),
    Data(oneshot::Sender<WalletData>),
}

/// Counts envelopes in flight so callers can await quiescence.
///
/// An envelope is counted from the moment it is handed to the router until
/// its handler has returned and everything the handler emitted has been
/// counted in turn, so the count only reaches zero at true quiescence.
struct Tracker {
    inflight: AtomicUsize,
    notify: Notify,
}

impl Tracker {
    fn new() -> Self {
        Self {
            inflight: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    fn add(&self) {
        self.inflight.fetch_add(1, Ordering::AcqRel);
    }

    fn done(&self) {
        if self.inflight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }

    async fn quiesce(&self) {
        loop {
            let notified = self.notify.notified();
            if self.inflight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// State shared between the host handle and the actor tasks
struct Shared {
    tracker: Tracker,
    receipts: Mutex<Vec<DeliveryReceipt>>,
    externals: Mutex<Vec<Envelope>>,
}

/// Handle to a running mailbox-hosted ledger
pub struct MailboxHost {
    master_address: Identity,
    router_tx: mpsc::UnboundedSender<Envelope>,
    master_tx: mpsc::UnboundedSender<MasterRequest>,
    accounts: Arc<Mutex<HashMap<Identity, mpsc::UnboundedSender<AccountRequest>>>>,
    shared: Arc<Shared>,
}

impl MailboxHost {
    /// Create a ledger at genesis and spawn its master and router tasks.
    /// Must be called inside a tokio runtime.
    pub fn spawn(owner: Identity, content: Vec<u8>, max_supply: u128) -> Self {
        let master = MasterActor::new(owner, content, max_supply);
        let master_address = *master.address();

        let shared = Arc::new(Shared {
            tracker: Tracker::new(),
            receipts: Mutex::new(Vec::new()),
            externals: Mutex::new(Vec::new()),
        });
        let accounts = Arc::new(Mutex::new(HashMap::new()));

        let (router_tx, router_rx) = mpsc::unbounded_channel();
        let (master_tx, master_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_master(
            master,
            master_rx,
            router_tx.clone(),
            Arc::clone(&shared),
        ));
        tokio::spawn(run_router(
            router_rx,
            master_address,
            master_tx.clone(),
            router_tx.clone(),
            Arc::clone(&accounts),
            Arc::clone(&shared),
        ));

        Self {
            master_address,
            router_tx,
            master_tx,
            accounts,
            shared,
        }
    }

    /// The master actor's derived address
    pub fn master_address(&self) -> Identity {
        self.master_address
    }

    /// Derived account address for a holder; pure
    pub fn wallet_address(&self, holder: &Identity) -> Identity {
        derive_account_address(&self.master_address, holder)
    }

    /// Hand an envelope to the router, fire-and-forget
    pub fn submit(&self, envelope: Envelope) -> Result<MessageHash> {
        let hash = envelope.hash();
        self.shared.tracker.add();
        if self.router_tx.send(envelope).is_err() {
            self.shared.tracker.done();
            return Err(anyhow!("router task is gone"));
        }
        Ok(hash)
    }

    /// Wait until no envelopes are in flight anywhere in the ledger
    pub async fn quiesce(&self) {
        self.shared.tracker.quiesce().await;
    }

    /// Side-effect-free master data query
    pub async fn master_data(&self) -> Result<MasterData> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.master_tx
            .send(MasterRequest::Data(reply_tx))
            .map_err(|_| anyhow!("master task is gone"))?;
        reply_rx.await.map_err(|_| anyhow!("master task is gone"))
    }

    /// Side-effect-free wallet data query; None for a never-credited holder
    pub async fn wallet_data(&self, holder: &Identity) -> Result<Option<WalletData>> {
        let account_tx = {
            let accounts = self.accounts.lock().unwrap();
            accounts.get(holder).cloned()
        };
        let Some(account_tx) = account_tx else {
            return Ok(None);
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        account_tx
            .send(AccountRequest::Data(reply_tx))
            .map_err(|_| anyhow!("account task is gone"))?;
        let data = reply_rx
            .await
            .map_err(|_| anyhow!("account task is gone"))?;
        Ok(Some(data))
    }

    /// Snapshot of all receipts recorded so far
    pub fn receipts(&self) -> Vec<DeliveryReceipt> {
        self.shared.receipts.lock().unwrap().clone()
    }

    /// Snapshot of envelopes delivered to identities outside the ledger
    pub fn external_outbox(&self) -> Vec<Envelope> {
        self.shared.externals.lock().unwrap().clone()
    }
}

/// Forwarding loop: resolves destinations to mailboxes, lazily spawning
/// account actors on first delivery
async fn run_router(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    master_address: Identity,
    master_tx: mpsc::UnboundedSender<MasterRequest>,
    router_tx: mpsc::UnboundedSender<Envelope>,
    accounts: Arc<Mutex<HashMap<Identity, mpsc::UnboundedSender<AccountRequest>>>>,
    shared: Arc<Shared>,
) {
    enum Route {
        Master,
        Account,
        Rejected,
        External,
    }

    while let Some(envelope) = rx.recv().await {
        let to_master = envelope.destination == master_address;
        let route = match &envelope.payload {
            Payload::Master(_) if to_master => Route::Master,
            Payload::Account(_) if !to_master => Route::Account,
            // The master does not accept account messages
            Payload::Account(_) => Route::Rejected,
            // Outside the ledger; hand over untouched
            Payload::External(_) | Payload::Master(_) => Route::External,
        };

        match route {
            Route::Master => {
                if master_tx.send(MasterRequest::Deliver(envelope)).is_err() {
                    warn!("master mailbox closed, dropping envelope");
                    shared.tracker.done();
                }
            }
            Route::Account => {
                let holder = envelope.destination;
                let account_tx = {
                    let mut accounts = accounts.lock().unwrap();
                    accounts
                        .entry(holder)
                        .or_insert_with(|| {
                            debug!("spawning account actor for {}", holder);
                            spawn_account(
                                master_address,
                                holder,
                                router_tx.clone(),
                                Arc::clone(&shared),
                            )
                        })
                        .clone()
                };
                if account_tx.send(AccountRequest::Deliver(envelope)).is_err() {
                    warn!("account mailbox closed, dropping envelope");
                    shared.tracker.done();
                }
            }
            Route::Rejected => {
                let receipt = DeliveryReceipt::rejected(&envelope, LedgerError::Unauthorized);
                shared.receipts.lock().unwrap().push(receipt);
                shared.tracker.done();
            }
            Route::External => {
                let receipt = DeliveryReceipt::accepted(&envelope, 0);
                shared.receipts.lock().unwrap().push(receipt);
                shared.externals.lock().unwrap().push(envelope);
                shared.tracker.done();
            }
        }
    }
}

/// Mailbox loop for the master actor
async fn run_master(
    mut actor: MasterActor,
    mut rx: mpsc::UnboundedReceiver<MasterRequest>,
    router_tx: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            MasterRequest::Deliver(envelope) => {
                let Payload::Master(message) = envelope.payload.clone() else {
                    shared.tracker.done();
                    continue;
                };
                let receipt = match actor.handle(&envelope.source, message) {
                    Ok(emitted) => {
                        let receipt = DeliveryReceipt::accepted(&envelope, emitted.len());
                        forward(&router_tx, emitted, &shared);
                        receipt
                    }
                    Err(error) => DeliveryReceipt::rejected(&envelope, error),
                };
                shared.receipts.lock().unwrap().push(receipt);
                shared.tracker.done();
            }
            MasterRequest::Data(reply) => {
                let _ = reply.send(actor.master_data());
            }
        }
    }
}

/// Spawn the mailbox loop for one holder's account actor
fn spawn_account(
    master_address: Identity,
    holder: Identity,
    router_tx: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
) -> mpsc::UnboundedSender<AccountRequest> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut actor = AccountActor::new(master_address, holder);

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                AccountRequest::Deliver(envelope) => {
                    let Payload::Account(message) = envelope.payload.clone() else {
                        shared.tracker.done();
                        continue;
                    };
                    let receipt = match actor.handle(&envelope.source, message) {
                        Ok(emitted) => {
                            let receipt = DeliveryReceipt::accepted(&envelope, emitted.len());
                            forward(&router_tx, emitted, &shared);
                            receipt
                        }
                        Err(error) => DeliveryReceipt::rejected(&envelope, error),
                    };
                    shared.receipts.lock().unwrap().push(receipt);
                    shared.tracker.done();
                }
                AccountRequest::Data(reply) => {
                    let _ = reply.send(actor.wallet_data());
                }
            }
        }
    });

    tx
}

/// Count and enqueue everything a handler emitted.
///
/// Emissions are counted before the triggering envelope is marked done, so
/// the in-flight count cannot touch zero while work remains.
fn forward(
    router_tx: &mpsc::UnboundedSender<Envelope>,
    emitted: Vec<Envelope>,
    shared: &Arc<Shared>,
) {
    for envelope in emitted {
        shared.tracker.add();
        if router_tx.send(envelope).is_err() {
            warn!("router task is gone, dropping emitted envelope");
            shared.tracker.done();
        }
    }
}
