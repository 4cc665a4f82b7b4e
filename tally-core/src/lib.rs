pub mod error;
pub mod id;
pub mod messages;
pub mod policy;
pub mod state;

// Re-export the main types for convenience
pub use error::LedgerError;
pub use id::{derive_account_address, derive_master_address, Identity};
pub use messages::{
    AccountMessage, Envelope, ExternalMessage, MasterMessage, MessageHash, Payload, QueryId,
};
pub use state::{AccountState, MasterData, MasterState, WalletData};
