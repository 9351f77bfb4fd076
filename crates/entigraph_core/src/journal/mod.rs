//! Commit journal: the record model written per commit and the log that
//! stores it.

mod log;
mod record;

pub(crate) use log::CommitLog;
pub use record::{ChangeRecord, CommitBatch};
