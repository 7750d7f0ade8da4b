//! Report engines - pluggable reducers over the expanded event stream
//!
//! Every engine implements [`Report`]: pure accumulation in `on_data`,
//! invoked once per expanded event name with interleaved date indices from
//! concurrently processed files. [`ReportSet`] is the explicit registry
//! (name → constructor, no filesystem discovery) and owns one instance of
//! each enabled engine per run; nothing survives across runs.
//!
//! Finalize runs exactly once, after all files are attempted, in dependency
//! order: SiteInfo's noise pruning feeds EventTotals' location pruning, and
//! EventTotals' by-name series feed ABTest's baseline injection.

pub mod event_totals;
pub mod feedback;
pub mod site_info;

pub use ab_test::AbTest;
pub use event_totals::EventTotals;
pub use feedback::Feedback;
pub use site_info::SiteInfo;

use crate::config::Config;
use crate::error::PipelineError;
use crate::event::ExpandedEvent;
use serde_json::Value;
use std::collections::BTreeMap;

pub const EVENT_TOTALS: &str = "eventTotals";
pub const AB_TEST: &str = "abTest";
pub const SITE_INFO: &str = "siteInfo";
pub const FEEDBACK: &str = "feedback";

/// All registered report names, in default execution order.
pub fn all_report_names() -> Vec<String> {
    [EVENT_TOTALS, AB_TEST, SITE_INFO, FEEDBACK]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// One stateful reducer over the expanded event stream.
pub trait Report {
    /// Accumulate one expanded event. Must tolerate many calls per raw line
    /// (one per fan-out name) and interleaved `date_index` values; engines
    /// may not depend on call order among each other.
    fn on_data(&mut self, date_index: usize, event: &ExpandedEvent);
}

/// The enabled report engines for one pipeline run.
pub struct ReportSet {
    event_totals: Option<EventTotals>,
    ab_test: Option<AbTest>,
    site_info: Option<SiteInfo>,
    feedback: Option<Feedback>,
}

impl ReportSet {
    /// Build engines for the names listed in the run configuration.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let mut set = Self {
            event_totals: None,
            ab_test: None,
            site_info: None,
            feedback: None,
        };

        for name in &config.reports {
            match name.as_str() {
                EVENT_TOTALS => set.event_totals = Some(EventTotals::new(config.num_dates)),
                AB_TEST => set.ab_test = Some(AbTest::new(config.num_dates)),
                SITE_INFO => set.site_info = Some(SiteInfo::new()),
                FEEDBACK => set.feedback = Some(Feedback::new()),
                other => return Err(PipelineError::UnknownReport(other.to_string())),
            }
        }

        Ok(set)
    }

    /// Fan one expanded event out to every enabled engine.
    pub fn on_data(&mut self, date_index: usize, event: &ExpandedEvent) {
        if let Some(report) = self.event_totals.as_mut() {
            report.on_data(date_index, event);
        }
        if let Some(report) = self.ab_test.as_mut() {
            report.on_data(date_index, event);
        }
        if let Some(report) = self.site_info.as_mut() {
            report.on_data(date_index, event);
        }
        if let Some(report) = self.feedback.as_mut() {
            report.on_data(date_index, event);
        }
    }

    /// Finalize every engine and serialize its contribution, keyed by
    /// report name. Consumes the set; engines do not outlive the run.
    pub fn finalize(self) -> BTreeMap<String, Value> {
        let mut outputs = BTreeMap::new();

        // SiteInfo first: its pruned-location set feeds EventTotals
        let mut site_info = self.site_info;
        let uninteresting = site_info
            .as_mut()
            .map(|report| report.uninteresting_locations().clone());

        // EventTotals second: ABTest baselines query it after pruning
        let event_totals = self.event_totals;
        if let Some(report) = self.ab_test {
            let output = report.finalize(event_totals.as_ref());
            outputs.insert(AB_TEST.to_string(), to_json(&output));
        }
        if let Some(report) = event_totals {
            let output = report.finalize(uninteresting.as_ref());
            outputs.insert(EVENT_TOTALS.to_string(), to_json(&output));
        }
        if let Some(report) = site_info {
            outputs.insert(SITE_INFO.to_string(), to_json(&report.finalize()));
        }
        if let Some(report) = self.feedback {
            outputs.insert(FEEDBACK.to_string(), to_json(&report.finalize()));
        }

        outputs
    }
}

fn to_json<T: serde::Serialize>(output: &T) -> Value {
    serde_json::to_value(output).expect("report output is always serializable")
}
