//! Eventflow - Telemetry Log Rollup Pipeline
//!
//! Ingests daily gzip-compressed event logs (one JSON event per line),
//! expands raw events into a richer pseudo-event vocabulary, and fans the
//! expanded stream out to pluggable report engines that produce dimensioned
//! per-date rollups.
//!
//! # Architecture
//!
//! ```text
//! metrics-YYYYMMDD.log.gz → IngestionWorker (gzip + line split + sampling)
//!     ↓
//! SessionTracker (per-date bounce classification)
//!     ↓
//! EventExpander (pseudo-event fan-out)
//!     ↓
//! ReportSet (EventTotals, ABTest, SiteInfo, Feedback)
//!     ↓
//! finalize() → ResultBundle → JsonReportWriter
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod expander;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod sessions;

pub use config::{Config, ConfigOptions};
pub use error::PipelineError;
pub use event::{EventDetails, EventMeta, ExpandedEvent, RawEvent, UserAgent};
pub use pipeline::{run, LogFileRef, ResultBundle};
pub use reports::ReportSet;
pub use sessions::SessionTracker;
