//! SiteInfo report - location ↔ site associations from page visits
//!
//! Tracks which locations belong to which sites and vice versa, counting
//! page visits per pair. At finalize time, locations carrying too little
//! signal (a single associated site with fewer than 10 visits) are pruned
//! from both maps; the discarded set is exposed so EventTotals can drop the
//! same locations and bound output size.

use crate::event::ExpandedEvent;
use crate::reports::Report;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const PAGE_VISITED: &str = "page-visited";

/// A path-based location is interesting if it has multiple matching sites
/// or at least this many page visits.
const MIN_PAGE_VISITS: u64 = 10;

type PairCounts = HashMap<String, HashMap<String, u64>>;

pub struct SiteInfo {
    /// "#siteId" -> location -> visit count. Bare TLDs are excluded here.
    site_to_locations: PairCounts,
    /// location -> "#siteId" -> visit count.
    location_to_sites: PairCounts,
    /// Cached noise-heuristic result; computed once.
    uninteresting: Option<HashSet<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfoOutput {
    pub all_site_ids: Vec<String>,
    /// Sites with more than one associated location, most locations first.
    pub site_ids_with_multiple_domains: Vec<String>,
    pub location_to_site_id_map: PairCounts,
    pub uninteresting_locations: Vec<String>,
    pub site_id_to_locations_map: PairCounts,
}

impl SiteInfo {
    pub fn new() -> Self {
        Self {
            site_to_locations: HashMap::new(),
            location_to_sites: HashMap::new(),
            uninteresting: None,
        }
    }

    /// Apply the noise heuristic, pruning uninteresting locations from both
    /// maps. Idempotent; the computed set is cached.
    pub fn uninteresting_locations(&mut self) -> &HashSet<String> {
        if self.uninteresting.is_none() {
            let mut uninteresting = HashSet::new();

            for (location, sites) in &self.location_to_sites {
                if sites.len() <= 1 && sites.values().all(|count| *count < MIN_PAGE_VISITS) {
                    log::debug!("Removing low-signal location: {}", location);
                    uninteresting.insert(location.clone());
                }
            }

            self.location_to_sites
                .retain(|location, _| !uninteresting.contains(location));
            for locations in self.site_to_locations.values_mut() {
                locations.retain(|location, _| !uninteresting.contains(location));
            }

            self.uninteresting = Some(uninteresting);
        }

        self.uninteresting.as_ref().unwrap()
    }

    /// The site with the most visits recorded for this location.
    pub fn site_id_for(&self, location: &str) -> Option<&str> {
        self.location_to_sites.get(location).and_then(|sites| {
            sites
                .iter()
                .max_by_key(|(_, count)| **count)
                .map(|(site_id, _)| site_id.as_str())
        })
    }

    pub fn finalize(mut self) -> SiteInfoOutput {
        self.uninteresting_locations();

        let all_site_ids: Vec<String> = self.site_to_locations.keys().cloned().collect();

        let mut multi_domain: Vec<String> = all_site_ids
            .iter()
            .filter(|site_id| self.site_to_locations[*site_id].len() > 1)
            .cloned()
            .collect();
        multi_domain.sort_by_key(|site_id| {
            std::cmp::Reverse(self.site_to_locations[site_id].len())
        });

        let mut uninteresting: Vec<String> =
            self.uninteresting.take().unwrap_or_default().into_iter().collect();
        uninteresting.sort();

        SiteInfoOutput {
            all_site_ids,
            site_ids_with_multiple_domains: multi_domain,
            location_to_site_id_map: self.location_to_sites,
            uninteresting_locations: uninteresting,
            site_id_to_locations_map: self.site_to_locations,
        }
    }
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl Report for SiteInfo {
    fn on_data(&mut self, _date_index: usize, event: &ExpandedEvent) {
        if event.name != PAGE_VISITED {
            return;
        }

        let site_tag = format!("#{}", event.raw.site_id);

        for location in &event.raw.meta.locations {
            *self
                .location_to_sites
                .entry(location.clone())
                .or_default()
                .entry(site_tag.clone())
                .or_insert(0) += 1;

            // Bare TLDs like .gov, .edu, .com carry no site identity
            if !location.starts_with('.') {
                *self
                    .site_to_locations
                    .entry(site_tag.clone())
                    .or_default()
                    .entry(location.clone())
                    .or_insert(0) += 1;
            }
        }
    }
}
