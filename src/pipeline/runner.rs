//! Run orchestrator - bounded worker pool over the scheduled log files
//!
//! Files are claimed in descending DateIndex order (most recent date first).
//! That ordering is a compatibility contract with downstream consumers of
//! the site/location maps, which see denser recent data earlier; keep it
//! even though no enabled engine provably depends on it.

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::worker::{process_log_file, FileOutcome};
use crate::pipeline::LogFileRef;
use crate::reports::ReportSet;
use crate::sessions::SessionTracker;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Everything one run produces, handed to the external serializer.
#[derive(Debug)]
pub struct ResultBundle {
    /// Date indices whose files could not be opened, in completion order.
    pub missing_days: Vec<usize>,
    pub compiled_data_folder: PathBuf,
    /// Finalized output per enabled report name.
    pub reports: BTreeMap<String, Value>,
}

/// Shared worker-pool state: the claim cursor, the abort flag, and the
/// collection points every slot reports into.
struct RunState {
    config: Config,
    log_files: Vec<LogFileRef>,
    /// Next unclaimed position. Starts at `num_files` and counts down;
    /// claim = fetch_sub - 1, exhausted when negative.
    cursor: AtomicI64,
    abort: AtomicBool,
    sessions: SessionTracker,
    reports: Mutex<ReportSet>,
    missing_days: Mutex<Vec<usize>>,
    files_completed: AtomicUsize,
}

/// Run the whole pipeline: ingest every scheduled file through the bounded
/// worker pool, then finalize all report engines.
///
/// A file that cannot be opened is recorded in `missing_days` and the run
/// continues. Any error after a stream opens aborts the entire run; no
/// partial bundle is produced.
pub async fn run(config: Config) -> Result<ResultBundle, PipelineError> {
    let log_files = build_log_file_refs(&config);
    let num_files = log_files.len();
    let pool_size = config.pool_size.min(num_files);

    log::info!(
        "🚀 Starting rollup run: {} dates, {} reports, pool size {}",
        num_files,
        config.reports.len(),
        pool_size
    );

    let state = Arc::new(RunState {
        reports: Mutex::new(ReportSet::from_config(&config)?),
        sessions: SessionTracker::new(config.num_dates),
        cursor: AtomicI64::new(num_files as i64),
        abort: AtomicBool::new(false),
        missing_days: Mutex::new(Vec::new()),
        files_completed: AtomicUsize::new(0),
        log_files,
        config,
    });

    let mut slots = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let state = state.clone();
        slots.push(tokio::task::spawn_blocking(move || worker_slot(&state)));
    }

    // First fatal error wins; Aborted results are echoes of it
    let mut fatal: Option<PipelineError> = None;
    for slot in slots {
        match slot.await {
            Ok(Ok(())) => {}
            Ok(Err(PipelineError::Aborted)) => {}
            Ok(Err(e)) => {
                fatal.get_or_insert(e);
            }
            Err(e) => {
                fatal.get_or_insert(PipelineError::Join(e.to_string()));
            }
        }
    }
    if let Some(e) = fatal {
        return Err(e);
    }

    let state = Arc::try_unwrap(state)
        .unwrap_or_else(|_| panic!("worker slots retired but run state still shared"));

    log::info!("✅ Processing complete, finalizing reports");
    let reports = state.reports.into_inner().unwrap().finalize();

    let missing_days = state.missing_days.into_inner().unwrap();
    if !missing_days.is_empty() {
        log::warn!("{} missing day(s): {:?}", missing_days.len(), missing_days);
    }

    Ok(ResultBundle {
        missing_days,
        compiled_data_folder: state.config.compiled_data_folder.clone(),
        reports,
    })
}

fn build_log_file_refs(config: &Config) -> Vec<LogFileRef> {
    config
        .log_file_names
        .iter()
        .enumerate()
        .map(|(date_index, file_name)| LogFileRef {
            date_index,
            file_name: file_name.clone(),
            path: config.clean_data_folder.join(file_name),
        })
        .collect()
}

/// One worker slot: claim the next unclaimed file (newest first), process
/// it, repeat until the cursor is exhausted, then retire.
fn worker_slot(state: &RunState) -> Result<(), PipelineError> {
    loop {
        let claimed = state.cursor.fetch_sub(1, Ordering::SeqCst) - 1;
        if claimed < 0 {
            return Ok(());
        }
        if state.abort.load(Ordering::Relaxed) {
            return Err(PipelineError::Aborted);
        }

        let log_file = &state.log_files[claimed as usize];
        let outcome = process_log_file(
            log_file,
            &state.config,
            &state.sessions,
            &state.reports,
            &state.abort,
        );

        match outcome {
            Ok(FileOutcome::Processed) => {
                let completed = state.files_completed.fetch_add(1, Ordering::Relaxed) + 1;
                if !state.config.quiet {
                    let percent = 100.0 * completed as f64 / state.config.num_dates as f64;
                    log::info!(
                        "📊 Completed #{} [{:.1}% completed]: {}",
                        log_file.date_index,
                        percent,
                        log_file.file_name
                    );
                }
            }
            Ok(FileOutcome::Missing) => {
                state
                    .missing_days
                    .lock()
                    .unwrap()
                    .push(log_file.date_index);
            }
            Err(e) => {
                state.abort.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOptions;

    #[test]
    fn test_log_file_refs_match_dates() {
        let config = Config::new(ConfigOptions {
            start: Some(20160201),
            end: Some(20160203),
            data_folder: Some(PathBuf::from("/data")),
            ..Default::default()
        })
        .unwrap();

        let refs = build_log_file_refs(&config);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].date_index, 0);
        assert_eq!(refs[2].file_name, "metrics-20160203.log.gz");
        assert_eq!(
            refs[1].path,
            PathBuf::from("/data/clean/metrics-20160202.log.gz")
        );
    }

    #[test]
    fn test_cursor_claims_descending() {
        let cursor = AtomicI64::new(3);
        let claims: Vec<i64> = (0..4).map(|_| cursor.fetch_sub(1, Ordering::SeqCst) - 1).collect();
        assert_eq!(claims, vec![2, 1, 0, -1]);
    }
}
