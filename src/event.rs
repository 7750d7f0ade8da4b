//! Raw and expanded event models
//!
//! One `RawEvent` is deserialized per sampled log line (wire format is
//! camelCase JSON). It lives only for the duration of that line's processing;
//! the report engines see it through borrowed `ExpandedEvent` views, one per
//! fanned-out event name.

use serde::Deserialize;

/// One parsed telemetry event record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub name: String,
    #[serde(default)]
    pub site_id: String,
    /// Session UUID; absent for anonymous events.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Dot-delimited A/B test tag, e.g. `checkout.button-color.red`.
    #[serde(default)]
    pub ab_test: Option<String>,
    #[serde(default)]
    pub details: EventDetails,
    #[serde(default)]
    pub meta: EventMeta,
}

/// The slice of the free-form `details` field the report engines consume.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub feedback_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    /// Ordered location tags (paths, hostnames, bare TLDs like `.com`).
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub ua: UserAgent,
    /// Tags to expand into `name::tag` pseudo-events.
    #[serde(default)]
    pub pseudo_events: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgent {
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub browser_version: Option<f64>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// One fan-out view of a raw event: the effective event name plus the
/// session annotation computed when the line was read.
#[derive(Debug, Clone, Copy)]
pub struct ExpandedEvent<'a> {
    /// Effective name for this fan-out (original or derived pseudo-event).
    pub name: &'a str,
    /// Running count of this session's events within the current date;
    /// `None` when the event name is on the bounce-classification ignore
    /// list, `Some(0)` for anonymous events.
    pub session_event_count: Option<u32>,
    pub raw: &'a RawEvent,
}
