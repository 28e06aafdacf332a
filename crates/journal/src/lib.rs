//! Journal Engine: journal entries, draft validation, posting and reversal.

pub mod draft;
pub mod entry;

pub use draft::{DraftEntry, DraftLine};
pub use entry::{
    BalanceDelta, EntrySource, EntryStatus, JournalEntry, JournalLine, SourceStatus,
};
