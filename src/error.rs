//! Pipeline error taxonomy
//!
//! A missing log file is the only recoverable condition and is handled inside
//! the orchestrator (it becomes a `missing_days` entry, never an error
//! value). Everything here is fatal: it unwinds the whole run and no partial
//! result bundle is produced.

use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// Invalid run configuration (bad date range, zero event step, ...)
    Config(String),
    /// A report name with no registered constructor
    UnknownReport(String),
    /// I/O failure outside any one log line
    Io(std::io::Error),
    /// A sampled line that is not a valid event record
    Parse {
        file: String,
        line: u64,
        source: serde_json::Error,
    },
    /// Corrupt gzip stream or I/O failure mid-file
    Stream {
        file: String,
        source: std::io::Error,
    },
    /// Another worker hit a fatal error first; this run is already dead
    Aborted,
    /// A worker task panicked or was cancelled
    Join(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::UnknownReport(name) => write!(f, "Unknown report: {}", name),
            PipelineError::Io(e) => write!(f, "IO error: {}", e),
            PipelineError::Parse { file, line, source } => {
                write!(f, "Malformed event in {} line {}: {}", file, line, source)
            }
            PipelineError::Stream { file, source } => {
                write!(f, "Corrupt log stream in {}: {}", file, source)
            }
            PipelineError::Aborted => write!(f, "Run aborted by an earlier fatal error"),
            PipelineError::Join(msg) => write!(f, "Worker task failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            PipelineError::Parse { source, .. } => Some(source),
            PipelineError::Stream { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}
