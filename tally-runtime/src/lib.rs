//! Actor hosts for the tally ledger.
//!
//! The actors themselves ([`MasterActor`], [`AccountActor`]) are plain
//! synchronous state machines: a handler takes one message and returns
//! either the envelopes to emit or a rejection, leaving state untouched on
//! rejection. Two hosts run them:
//!
//! - [`LedgerRouter`]: single-threaded and deterministic, delivering
//!   messages in FIFO order until quiescence. The right host for tests and
//!   for replaying a known message sequence.
//! - [`MailboxHost`]: tokio tasks with one mailbox per actor, preserving
//!   only per-sender-per-destination order.

pub mod account;
pub mod directory;
pub mod mailbox;
pub mod master;
pub mod receipt;
pub mod router;

pub use account::AccountActor;
pub use directory::AccountDirectory;
pub use mailbox::MailboxHost;
pub use master::MasterActor;
pub use receipt::DeliveryReceipt;
pub use router::LedgerRouter;
