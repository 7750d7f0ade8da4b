//! Per-file ingestion worker
//!
//! Streams one gzip-compressed log file: decompress, split into lines,
//! sample deterministically, parse, annotate with session state, expand, and
//! fan out to every enabled report engine. Runs on a blocking thread; the
//! `ReportSet` lock is held for the duration of one line's fan-out, which
//! gives every engine the single-writer guarantee the cooperative original
//! relied on.

use crate::config::Config;
use crate::error::PipelineError;
use crate::event::{ExpandedEvent, RawEvent};
use crate::expander::expand;
use crate::pipeline::LogFileRef;
use crate::reports::ReportSet;
use crate::sessions::SessionTracker;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Processed,
    /// File absent or unreadable at its scheduled time; recorded in
    /// `missing_days`, never an error.
    Missing,
}

/// Process one log file to the end of its stream.
///
/// Any failure to open the file is the recoverable missing-file case.
/// Everything after the stream opens (corrupt gzip data, an unparsable
/// line) is fatal.
pub fn process_log_file(
    log_file: &LogFileRef,
    config: &Config,
    sessions: &SessionTracker,
    reports: &Mutex<ReportSet>,
    abort: &AtomicBool,
) -> Result<FileOutcome, PipelineError> {
    let file = match File::open(&log_file.path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("Log file not available: {} ({})", log_file.file_name, e);
            return Ok(FileOutcome::Missing);
        }
    };

    log::debug!("Begin processing {}", log_file.file_name);
    sessions.init(log_file.date_index);

    let result = process_lines(file, log_file, config, sessions, reports, abort);

    // Per-date session state is released the moment the stream ends, so
    // memory stays bounded by the pool size rather than the date range
    sessions.release(log_file.date_index);

    result.map(|_| FileOutcome::Processed)
}

fn process_lines(
    file: File,
    log_file: &LogFileRef,
    config: &Config,
    sessions: &SessionTracker,
    reports: &Mutex<ReportSet>,
    abort: &AtomicBool,
) -> Result<(), PipelineError> {
    let reader = BufReader::new(GzDecoder::new(file));
    let mut line_counter: u64 = 0;

    for line in reader.lines() {
        if abort.load(Ordering::Relaxed) {
            return Err(PipelineError::Aborted);
        }

        let line = line.map_err(|source| PipelineError::Stream {
            file: log_file.file_name.clone(),
            source,
        })?;
        if line.is_empty() {
            continue;
        }

        line_counter += 1;
        if !keep_line(line_counter, config) {
            continue;
        }

        let event: RawEvent =
            serde_json::from_str(&line).map_err(|source| PipelineError::Parse {
                file: log_file.file_name.clone(),
                line: line_counter,
                source,
            })?;

        let session_event_count = sessions.session_event_count(log_file.date_index, &event);
        let names = expand(&event, session_event_count);

        // One lock per line, held across the whole fan-out
        let mut reports = reports.lock().unwrap();
        for name in &names {
            reports.on_data(
                log_file.date_index,
                &ExpandedEvent {
                    name,
                    session_event_count,
                    raw: &event,
                },
            );
        }
    }

    Ok(())
}

/// Deterministic sampling: keep every `event_step`th line, optionally only
/// within the first `keep_top_events` lines of the file. Line numbers are
/// 1-based; re-running the same config over the same file keeps the same
/// lines.
fn keep_line(line_counter: u64, config: &Config) -> bool {
    line_counter % config.event_step == 0
        && config
            .keep_top_events
            .map_or(true, |top| line_counter <= top)
}
