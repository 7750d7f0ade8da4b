//! Run configuration
//!
//! A run covers an inclusive range of dates. Every per-date structure in the
//! pipeline is indexed by DateIndex: the 0-based ordinal of a date within
//! `dates`, not the calendar value. `dates`, `log_file_names` and `num_dates`
//! always agree in length.

use crate::error::PipelineError;
use chrono::{Duration, NaiveDate, Utc};
use std::env;
use std::path::PathBuf;

/// Earliest date with telemetry data.
pub const BEGINNING_OF_TIME: u32 = 20160201;

const CLEAN_DATA_SUBFOLDER: &str = "clean";
const COMPILED_DATA_SUBFOLDER: &str = "compiled";
const DEFAULT_DATA_FOLDER: &str = "./metrics-data";
const DEFAULT_POOL_SIZE: usize = 10;

/// Inputs to [`Config::new`]. Option parsing itself happens outside the
/// core; the binary fills this from environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Start date as YYYYMMDD (default: [`BEGINNING_OF_TIME`]).
    pub start: Option<u32>,
    /// End date as YYYYMMDD, inclusive (default: yesterday).
    pub end: Option<u32>,
    /// Process every nth day (default: 1).
    pub day_step: Option<u32>,
    pub data_folder: Option<PathBuf>,
    /// Report names to run (default: all registered reports).
    pub reports: Option<Vec<String>>,
    /// Sample every nth line of each file (default: 1 = every line).
    pub event_step: Option<u64>,
    /// Keep only the first n lines of each file. Very fast but not a
    /// representative sample.
    pub keep_top_events: Option<u64>,
    /// Max log files with open streams at once (default: 10).
    pub pool_size: Option<usize>,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_folder: PathBuf,
    pub clean_data_folder: PathBuf,
    pub compiled_data_folder: PathBuf,
    pub reports: Vec<String>,
    /// Dates as YYYYMMDD, ascending; position is the DateIndex.
    pub dates: Vec<u32>,
    /// One file name per date, same order as `dates`.
    pub log_file_names: Vec<String>,
    pub num_dates: usize,
    pub event_step: u64,
    pub keep_top_events: Option<u64>,
    pub pool_size: usize,
    pub quiet: bool,
}

impl Config {
    pub fn new(options: ConfigOptions) -> Result<Self, PipelineError> {
        let start = parse_date(options.start.unwrap_or(BEGINNING_OF_TIME))?;
        let end = match options.end {
            Some(end) => parse_date(end)?,
            None => Utc::now().date_naive() - Duration::days(1),
        };
        let day_step = options.day_step.unwrap_or(1);
        if day_step == 0 {
            return Err(PipelineError::Config("day step must be >= 1".to_string()));
        }

        let event_step = options.event_step.unwrap_or(1);
        if event_step == 0 {
            return Err(PipelineError::Config("event step must be >= 1".to_string()));
        }

        let dates = date_range(start, end, day_step);
        let log_file_names: Vec<String> = dates.iter().map(|d| log_file_name(*d)).collect();
        let num_dates = dates.len();

        let data_folder = options
            .data_folder
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FOLDER));

        Ok(Self {
            clean_data_folder: data_folder.join(CLEAN_DATA_SUBFOLDER),
            compiled_data_folder: data_folder.join(COMPILED_DATA_SUBFOLDER),
            data_folder,
            reports: options
                .reports
                .unwrap_or_else(|| crate::reports::all_report_names()),
            dates,
            log_file_names,
            num_dates,
            event_step,
            keep_top_events: options.keep_top_events,
            pool_size: options.pool_size.unwrap_or(DEFAULT_POOL_SIZE).max(1),
            quiet: options.quiet,
        })
    }
}

impl ConfigOptions {
    /// Read options from environment variables (the binary's entry path).
    ///
    /// `METRICS_START` / `METRICS_END` - YYYYMMDD bounds of the run
    /// `DAY_STEP` - process every nth day
    /// `DATA_FOLDER` - root data directory
    /// `REPORTS` - comma-separated report names
    /// `EVENT_STEP` / `KEEP_TOP_EVENTS` - sampling controls
    /// `POOL_SIZE` - max concurrently open log files
    /// `QUIET` - silence progress logging
    pub fn from_env() -> Self {
        Self {
            start: env_parse("METRICS_START"),
            end: env_parse("METRICS_END"),
            day_step: env_parse("DAY_STEP"),
            data_folder: env::var("DATA_FOLDER").ok().map(PathBuf::from),
            reports: env::var("REPORTS").ok().map(|s| {
                s.split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            }),
            event_step: env_parse("EVENT_STEP"),
            keep_top_events: env_parse("KEEP_TOP_EVENTS"),
            pool_size: env_parse("POOL_SIZE"),
            quiet: env::var("QUIET")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

/// `metrics-20160212.log.gz`
pub fn log_file_name(date: u32) -> String {
    format!("metrics-{}.log.gz", date)
}

fn parse_date(date: u32) -> Result<NaiveDate, PipelineError> {
    let year = (date / 10_000) as i32;
    let month = date / 100 % 100;
    let day = date % 100;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PipelineError::Config(format!("invalid date: {}", date)))
}

fn date_range(start: NaiveDate, end: NaiveDate, day_step: u32) -> Vec<u32> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(date_as_number(current));
        current += Duration::days(i64::from(day_step));
    }
    dates
}

fn date_as_number(date: NaiveDate) -> u32 {
    use chrono::Datelike;
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}
