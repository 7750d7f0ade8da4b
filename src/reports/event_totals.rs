//! EventTotals report - per-date counts by (location, event name, UA tag)
//!
//! The deepest rollup in the set: every expanded event increments one cell
//! per (location tag x UA tag) combination at its DateIndex, plus the flat
//! by-name and by-UA totals. The by-name series also backs the ABTest
//! baseline query.

use crate::event::ExpandedEvent;
use crate::reports::Report;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// location -> event name -> UA tag -> per-date counts
type LocationMap = HashMap<String, HashMap<String, HashMap<String, Vec<u64>>>>;

pub struct EventTotals {
    num_dates: usize,
    by_location: LocationMap,
    /// Per-date series per event name (queried by ABTest for baselines).
    by_name_only: HashMap<String, Vec<u64>>,
    /// Flat totals per UA tag.
    by_user_agent_only: HashMap<String, u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTotalsOutput {
    pub by_name_only: HashMap<String, Vec<u64>>,
    pub by_user_agent_only: HashMap<String, u64>,
    pub by_location: LocationMap,
}

impl EventTotals {
    pub fn new(num_dates: usize) -> Self {
        Self {
            num_dates,
            by_location: HashMap::new(),
            by_name_only: HashMap::new(),
            by_user_agent_only: HashMap::new(),
        }
    }

    /// Per-date counts for an event name over `[start_index, end_index]`
    /// inclusive, zero-filled for unknown names.
    pub fn totals_by_name(&self, name: &str, start_index: usize, end_index: usize) -> Vec<u64> {
        match self.by_name_only.get(name) {
            Some(series) => series[start_index..=end_index].to_vec(),
            None => vec![0; end_index - start_index + 1],
        }
    }

    /// Drop location entries flagged uninteresting by SiteInfo, then emit.
    pub fn finalize(mut self, uninteresting_locations: Option<&HashSet<String>>) -> EventTotalsOutput {
        if let Some(uninteresting) = uninteresting_locations {
            self.by_location
                .retain(|location, _| !uninteresting.contains(location));
        }

        EventTotalsOutput {
            by_name_only: self.by_name_only,
            by_user_agent_only: self.by_user_agent_only,
            by_location: self.by_location,
        }
    }
}

impl Report for EventTotals {
    fn on_data(&mut self, date_index: usize, event: &ExpandedEvent) {
        let ua_tags = user_agent_tags(event);
        let locations = location_tags(event);

        for location in &locations {
            let event_map = self.by_location.entry(location.clone()).or_default();
            let ua_map = event_map.entry(event.name.to_string()).or_default();
            for ua_tag in &ua_tags {
                let series = ua_map
                    .entry(ua_tag.clone())
                    .or_insert_with(|| vec![0; self.num_dates]);
                series[date_index] += 1;
            }
        }

        let name_series = self
            .by_name_only
            .entry(event.name.to_string())
            .or_insert_with(|| vec![0; self.num_dates]);
        name_series[date_index] += 1;

        for ua_tag in ua_tags {
            *self.by_user_agent_only.entry(ua_tag).or_insert(0) += 1;
        }
    }
}

/// Declared locations plus the site tag, the domain, and the wildcard.
fn location_tags(event: &ExpandedEvent) -> Vec<String> {
    let meta = &event.raw.meta;
    let mut tags = Vec::with_capacity(meta.locations.len() + 3);
    tags.extend(meta.locations.iter().cloned());
    tags.push(format!("#{}", event.raw.site_id));
    tags.push(meta.domain.clone());
    tags.push("@any".to_string());
    tags
}

/// Browser groups, the browser itself, the wildcard, and a versioned tag for
/// the IE 6-11 / Safari 5-99 ranges the product cares about individually.
fn user_agent_tags(event: &ExpandedEvent) -> Vec<String> {
    let ua = &event.raw.meta.ua;
    let mut tags = Vec::with_capacity(ua.groups.len() + 3);
    tags.extend(ua.groups.iter().cloned());
    tags.push(ua.browser.clone());
    tags.push("@any".to_string());

    if let Some(version) = ua.browser_version {
        let versioned = match ua.browser.as_str() {
            "IE" => (6.0..=11.0).contains(&version),
            "Safari" => (5.0..=99.0).contains(&version), // Future proof enough? :)
            _ => false,
        };
        if versioned {
            tags.push(format!("{}{}", ua.browser, version));
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;

    fn raw(browser: &str, version: f64) -> RawEvent {
        serde_json::from_value(serde_json::json!({
            "name": "page-visited",
            "siteId": "s-1",
            "meta": {
                "locations": ["www.example.com"],
                "domain": "example.com",
                "ua": { "browser": browser, "browserVersion": version, "groups": ["desktop"] },
            },
        }))
        .unwrap()
    }

    fn expanded<'a>(name: &'a str, raw: &'a RawEvent) -> ExpandedEvent<'a> {
        ExpandedEvent {
            name,
            session_event_count: Some(1),
            raw,
        }
    }

    #[test]
    fn test_counts_every_location_ua_combination() {
        let mut totals = EventTotals::new(3);
        let event = raw("IE", 11.0);
        totals.on_data(1, &expanded("page-visited", &event));

        // Locations: declared + #site + domain + @any
        for location in ["www.example.com", "#s-1", "example.com", "@any"] {
            // UA tags: group + browser + @any + versioned
            for ua_tag in ["desktop", "IE", "@any", "IE11"] {
                let series = &totals.by_location[location]["page-visited"][ua_tag];
                assert_eq!(series, &vec![0, 1, 0], "{}/{}", location, ua_tag);
            }
        }
        assert_eq!(totals.by_name_only["page-visited"], vec![0, 1, 0]);
        assert_eq!(totals.by_user_agent_only["IE11"], 1);
        assert_eq!(totals.by_user_agent_only["@any"], 1);
    }

    #[test]
    fn test_versioned_ua_tag_ranges() {
        let mut totals = EventTotals::new(1);
        totals.on_data(0, &expanded("e", &raw("IE", 5.0)));
        assert!(!totals.by_user_agent_only.contains_key("IE5"));

        totals.on_data(0, &expanded("e", &raw("IE", 6.0)));
        assert!(totals.by_user_agent_only.contains_key("IE6"));

        totals.on_data(0, &expanded("e", &raw("Safari", 9.1)));
        assert!(totals.by_user_agent_only.contains_key("Safari9.1"));

        totals.on_data(0, &expanded("e", &raw("Firefox", 44.0)));
        assert!(!totals.by_user_agent_only.contains_key("Firefox44"));
    }

    #[test]
    fn test_totals_by_name_slice() {
        let mut totals = EventTotals::new(4);
        let event = raw("Firefox", 44.0);
        totals.on_data(1, &expanded("page-visited", &event));
        totals.on_data(2, &expanded("page-visited", &event));
        totals.on_data(2, &expanded("page-visited", &event));

        assert_eq!(totals.totals_by_name("page-visited", 1, 2), vec![1, 2]);
        assert_eq!(totals.totals_by_name("page-visited", 0, 3), vec![0, 1, 2, 0]);
        // Unknown names come back zero-filled
        assert_eq!(totals.totals_by_name("no-such-event", 1, 3), vec![0, 0, 0]);
    }

    #[test]
    fn test_finalize_prunes_uninteresting_locations() {
        let mut totals = EventTotals::new(1);
        let event = raw("Firefox", 44.0);
        totals.on_data(0, &expanded("page-visited", &event));

        let uninteresting: HashSet<String> = ["www.example.com".to_string()].into();
        let output = totals.finalize(Some(&uninteresting));

        assert!(!output.by_location.contains_key("www.example.com"));
        assert!(output.by_location.contains_key("#s-1"));
        // Flat totals are not pruned
        assert!(output.by_name_only.contains_key("page-visited"));
    }
}
