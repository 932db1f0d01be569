//! Tag extraction utilities for feed events
//!
//! Provides helper functions to reduce boilerplate when reading tags from Nostr events.

use nostr_sdk::prelude::*;

/// Extract a single string value from a tag by name.
/// Returns the first occurrence if multiple tags exist.
pub fn extract_tag_str<'a>(event: &'a Event, tag_name: &str) -> Option<&'a str> {
    event.tags.iter().find_map(|tag| {
        let slice = tag.as_slice();
        if slice.first().map(|s| s.as_str()) == Some(tag_name) {
            slice.get(1).map(|s| s.as_str())
        } else {
            None
        }
    })
}

/// Extract every event id referenced by an `e` tag, in tag order, without repeats.
/// Values that are not valid event ids are skipped.
pub fn referenced_event_ids(event: &Event) -> Vec<EventId> {
    let mut ids: Vec<EventId> = Vec::new();
    for tag in event.tags.iter() {
        let slice = tag.as_slice();
        if slice.first().map(|s| s.as_str()) != Some("e") {
            continue;
        }
        if let Some(id) = slice.get(1).and_then(|v| EventId::from_hex(v).ok()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// The first event id referenced by an `e` tag.
pub fn first_referenced_event_id(event: &Event) -> Option<EventId> {
    event.tags.iter().find_map(|tag| {
        let slice = tag.as_slice();
        if slice.first().map(|s| s.as_str()) == Some("e") {
            slice.get(1).and_then(|v| EventId::from_hex(v).ok())
        } else {
            None
        }
    })
}
