//! Pseudo-event derivation
//!
//! Each raw event fans out as its original name plus derived pseudo-event
//! names built from its tags and session state. Not done during the upstream
//! repair/clean/precompile stages, so it must happen here.

use crate::event::RawEvent;

const PAGE_VISITED: &str = "page-visited";
const NONBOUNCE: &str = "page-visited::nonbounce";

/// Full ordered fan-out for one event: the original name first, then one
/// `name::tag` per pseudo-event tag, then the session-derived names.
///
/// The two session rules are evaluated independently and may both fire on
/// the same event (a session's second `page-visited` carrying the
/// `operational` tag emits `page-visited::nonbounce` twice). Duplicates are
/// deliberately not collapsed; downstream counts depend on the exact
/// multiplicity.
pub fn expand(event: &RawEvent, session_event_count: Option<u32>) -> Vec<String> {
    let mut names = Vec::with_capacity(event.meta.pseudo_events.len() + 3);
    names.push(event.name.clone());

    // Names like page-visited::supported
    for tag in &event.meta.pseudo_events {
        names.push(format!("{}::{}", event.name, tag));
    }

    if let Some(count) = session_event_count {
        if count > 1 {
            // Second and later page visits are non-bounce visits
            if event.name == PAGE_VISITED
                && names[1..].iter().any(|n| n == "page-visited::operational")
            {
                names.push(NONBOUNCE.to_string());
            }

            // On event #2, emit one more nonbounce crediting the session's
            // first page-visited event retroactively
            if count == 2 {
                names.push(NONBOUNCE.to_string());
            }
        }
    }

    names
}
