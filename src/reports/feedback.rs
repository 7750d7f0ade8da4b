//! Feedback report - free-text feedback grouped by rating
//!
//! Collects the text of every `feedback-sent` event under its rating, in
//! three independent partitions: overall, by browser, and by domain.

use crate::event::ExpandedEvent;
use crate::reports::Report;
use serde::Serialize;
use std::collections::HashMap;

const FEEDBACK_SENT: &str = "feedback-sent";

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub text: String,
}

type ByRating = HashMap<i64, Vec<FeedbackEntry>>;

#[derive(Default)]
pub struct Feedback {
    all: ByRating,
    by_ua: HashMap<String, ByRating>,
    by_domain: HashMap<String, ByRating>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutput {
    pub all: ByRating,
    pub by_ua: HashMap<String, ByRating>,
    pub by_domain: HashMap<String, ByRating>,
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finalize(self) -> FeedbackOutput {
        FeedbackOutput {
            all: self.all,
            by_ua: self.by_ua,
            by_domain: self.by_domain,
        }
    }
}

impl Report for Feedback {
    fn on_data(&mut self, _date_index: usize, event: &ExpandedEvent) {
        if event.name != FEEDBACK_SENT {
            return;
        }

        let rating = event.raw.details.rating.unwrap_or(0);
        let entry = FeedbackEntry {
            text: event
                .raw
                .details
                .feedback_text
                .clone()
                .unwrap_or_default(),
        };

        self.all.entry(rating).or_default().push(entry.clone());
        self.by_ua
            .entry(event.raw.meta.ua.browser.clone())
            .or_default()
            .entry(rating)
            .or_default()
            .push(entry.clone());
        self.by_domain
            .entry(event.raw.meta.domain.clone())
            .or_default()
            .entry(rating)
            .or_default()
            .push(entry);
    }
}
