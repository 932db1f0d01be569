use std::time::Instant;

use nostr_sdk::EventId;

/// A contiguous window of the render list with its own related-data subscription.
#[derive(Debug)]
pub struct Slice<H> {
    /// First id of the window's list range; slices are matched by anchor
    pub anchor: EventId,
    /// Ids this slice subscribes for (window minus ids owned by other live slices)
    pub event_ids: Vec<EventId>,
    pub start_index: usize,
    pub end_index: usize,
    /// Absent when the open failed
    pub handle: Option<H>,
    /// Close deadline while the slice is off-screen
    pub pending_teardown: Option<Instant>,
}

impl<H> Slice<H> {
    pub fn is_live(&self) -> bool {
        self.pending_teardown.is_none()
    }
}

/// A window the current viewport needs, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub anchor: EventId,
    pub ids: Vec<EventId>,
    pub start_index: usize,
    pub end_index: usize,
}

/// `[index - size, index)` and `[index, index + size)`, clipped to the list.
pub fn windows_around(list: &[EventId], index: usize, size: usize) -> Vec<Window> {
    let index = index.min(list.len());
    let ranges = [
        (index.saturating_sub(size), index),
        (index, index.saturating_add(size).min(list.len())),
    ];

    ranges
        .into_iter()
        .filter(|(start, end)| start < end)
        .map(|(start, end)| Window {
            anchor: list[start],
            ids: list[start..end].to_vec(),
            start_index: start,
            end_index: end,
        })
        .collect()
}
