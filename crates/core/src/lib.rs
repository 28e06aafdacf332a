//! Shared kernel for the ledger: errors, identifiers, money, versioning.

pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, EntryId, UserId};
pub use money::{Currency, ValueObject};
pub use version::Expected;
