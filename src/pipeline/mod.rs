//! Pipeline orchestration
//!
//! ```text
//! LogFileRefs (one per date, newest first)
//!     ↓ shared claim cursor
//! worker slot 1..pool_size  (spawn_blocking)
//!     ↓ per line
//! SessionTracker → expand() → ReportSet::on_data
//!     ↓ all slots retired
//! ReportSet::finalize → ResultBundle
//! ```

pub mod runner;
pub mod worker;

pub use runner::{run, ResultBundle};

use std::path::PathBuf;

/// One scheduled log file. Constructed once at startup from the date range,
/// claimed at most once by a worker slot.
#[derive(Debug, Clone)]
pub struct LogFileRef {
    pub date_index: usize,
    pub file_name: String,
    pub path: PathBuf,
}
