//! The durable, human-readable transaction log: segment bookkeeping,
//! rotation, and crash recovery.
//!
//! The log is a JSON array per segment; see [`log_writer`] for the append
//! mechanics and [`recovery`] for how a missing or stale status file is
//! reconciled against what is actually on disk.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log_info;
pub mod log_writer;
pub mod recovery;

pub use log_info::{LogFileInfo, TxRange};
pub use log_writer::{read_status_file, write_status_file, LogConfig, LogWriter};
pub use recovery::recover;
