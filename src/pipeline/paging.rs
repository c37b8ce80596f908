//! Paged reads of keyed server resources with latest-request-wins semantics.
//!
//! Every request gets a sequence number from a counter shared by all keys. When a
//! response completes, it is applied only if its sequence number is still the latest
//! one issued for its key; anything older is dropped without touching state. Overlapping
//! requests are allowed and are never cancelled, only ignored.

use crate::remote::RemoteError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Which page of which resource to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub key: String,
    pub page_number: u32,
    pub items_per_page: u32,
}

impl PageWindow {
    pub fn new(key: impl Into<String>, page_number: u32, items_per_page: u32) -> Self {
        Self {
            key: key.into(),
            page_number: page_number.max(1),
            items_per_page: items_per_page.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
}

/// Handle for one issued request; pass it back to `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub window: PageWindow,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Applied,
    Superseded,
}

/// What a caller may render for one key. `items` stay from the last successful page
/// when a later request fails; `error` records that failure separately.
/// `requested_page` is the page most recently asked for, which differs from
/// `page_number` while it is pending or after it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    pub key: String,
    pub page_number: Option<u32>,
    pub requested_page: Option<u32>,
    pub items: Vec<T>,
    pub total_pages: Option<u32>,
    pub error: Option<RemoteError>,
    pub pending: bool,
}

impl<T> PageView<T> {
    /// View of a key nothing has been shown for yet.
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            page_number: None,
            requested_page: None,
            items: Vec::new(),
            total_pages: None,
            error: None,
            pending: false,
        }
    }
}

pub trait PageSource<T> {
    fn fetch_page(&self, window: &PageWindow) -> Result<Page<T>, RemoteError>;
}

#[derive(Debug)]
struct PageSlot<T> {
    latest_sequence: u64,
    requested_page: u32,
    shown_page: Option<u32>,
    items: Vec<T>,
    total_pages: Option<u32>,
    error: Option<RemoteError>,
}

#[derive(Debug)]
struct ControllerState<T> {
    next_sequence: u64,
    slots: HashMap<String, PageSlot<T>>,
}

#[derive(Debug)]
pub struct PagedFetchController<T> {
    state: Mutex<ControllerState<T>>,
}

impl<T> Default for PagedFetchController<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ControllerState {
                next_sequence: 1,
                slots: HashMap::new(),
            }),
        }
    }
}

/// Clamps a requested page into `[1, total_pages]`; unknown or empty totals allow page 1 only
/// until the first response arrives.
pub fn clamp_page(requested: u32, total_pages: Option<u32>) -> u32 {
    match total_pages {
        Some(total) => requested.clamp(1, total.max(1)),
        None => requested.max(1),
    }
}

impl<T: Clone> PagedFetchController<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState<T>> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Registers a read of `window` and makes it the latest request for its key.
    pub fn request(&self, window: PageWindow) -> PageTicket {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let slot = state
            .slots
            .entry(window.key.clone())
            .or_insert_with(|| PageSlot {
                latest_sequence: 0,
                requested_page: window.page_number,
                shown_page: None,
                items: Vec::new(),
                total_pages: None,
                error: None,
            });
        slot.latest_sequence = sequence;
        slot.requested_page = window.page_number;
        tracing::debug!(key = %window.key, page = window.page_number, sequence, "page requested");
        PageTicket { window, sequence }
    }

    pub fn complete(&self, ticket: PageTicket, result: Result<Page<T>, RemoteError>) -> PageOutcome {
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(&ticket.window.key) else {
            tracing::debug!(key = %ticket.window.key, sequence = ticket.sequence, "page response for cleared key dropped");
            return PageOutcome::Superseded;
        };
        if slot.latest_sequence != ticket.sequence {
            tracing::debug!(
                key = %ticket.window.key,
                sequence = ticket.sequence,
                latest = slot.latest_sequence,
                "superseded page response dropped"
            );
            return PageOutcome::Superseded;
        }
        match result {
            Ok(page) => {
                slot.items = page.items;
                slot.total_pages = Some(page.total_pages);
                slot.shown_page = Some(ticket.window.page_number);
                slot.error = None;
            }
            Err(err) => {
                tracing::warn!(key = %ticket.window.key, page = ticket.window.page_number, error = %err, "page fetch failed");
                slot.error = Some(err);
            }
        }
        // Settled: a duplicate completion for the same ticket must not apply twice.
        slot.latest_sequence = 0;
        PageOutcome::Applied
    }

    /// Issues the request, runs the read, and completes it.
    pub fn fetch<S: PageSource<T> + ?Sized>(&self, source: &S, window: PageWindow) -> PageOutcome {
        let ticket = self.request(window);
        let result = source.fetch_page(&ticket.window);
        self.complete(ticket, result)
    }

    pub fn view(&self, key: &str) -> Option<PageView<T>> {
        let state = self.lock();
        state.slots.get(key).map(|slot| PageView {
            key: key.to_string(),
            page_number: slot.shown_page,
            requested_page: Some(slot.requested_page),
            items: slot.items.clone(),
            total_pages: slot.total_pages,
            error: slot.error.clone(),
            pending: slot.latest_sequence != 0,
        })
    }

    pub fn total_pages(&self, key: &str) -> Option<u32> {
        self.lock().slots.get(key).and_then(|slot| slot.total_pages)
    }

    /// Forgets every key. Responses still in flight for them are dropped on arrival.
    pub fn clear(&self) {
        self.lock().slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: &[&str], total_pages: u32) -> Page<String> {
        Page {
            items: items.iter().map(|v| v.to_string()).collect(),
            total_pages,
        }
    }

    #[test]
    fn latest_request_wins_regardless_of_arrival_order() {
        let controller = PagedFetchController::new();
        let t1 = controller.request(PageWindow::new("preview:r", 1, 2));
        let t2 = controller.request(PageWindow::new("preview:r", 2, 2));
        let t3 = controller.request(PageWindow::new("preview:r", 3, 2));

        assert_eq!(controller.complete(t3, Ok(page(&["e", "f"], 3))), PageOutcome::Applied);
        assert_eq!(controller.complete(t1, Ok(page(&["a", "b"], 3))), PageOutcome::Superseded);
        assert_eq!(controller.complete(t2, Ok(page(&["c", "d"], 3))), PageOutcome::Superseded);

        let view = controller.view("preview:r").expect("view");
        assert_eq!(view.items, vec!["e".to_string(), "f".to_string()]);
        assert_eq!(view.page_number, Some(3));
        assert!(!view.pending);
    }

    #[test]
    fn failure_keeps_stale_items_and_records_error() {
        let controller = PagedFetchController::new();
        let t1 = controller.request(PageWindow::new("k", 1, 2));
        controller.complete(t1, Ok(page(&["a", "b"], 2)));

        let t2 = controller.request(PageWindow::new("k", 2, 2));
        controller.complete(t2, Err(RemoteError::new(Some(500), "boom")));

        let view = controller.view("k").expect("view");
        assert_eq!(view.items, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(view.page_number, Some(1));
        assert_eq!(view.error.map(|e| e.message), Some("boom".to_string()));

        let t3 = controller.request(PageWindow::new("k", 2, 2));
        controller.complete(t3, Ok(page(&["c"], 2)));
        let view = controller.view("k").expect("view");
        assert_eq!(view.error, None);
        assert_eq!(view.page_number, Some(2));
    }

    #[test]
    fn superseded_failure_is_silent() {
        let controller = PagedFetchController::new();
        let old = controller.request(PageWindow::new("k", 1, 5));
        let new = controller.request(PageWindow::new("k", 2, 5));
        assert_eq!(
            controller.complete(old, Err(RemoteError::new(None, "late"))),
            PageOutcome::Superseded
        );
        let view = controller.view("k").expect("view");
        assert_eq!(view.error, None);
        assert!(view.pending);
        controller.complete(new, Ok(page(&["x"], 1)));
    }

    #[test]
    fn keys_are_independent() {
        let controller = PagedFetchController::new();
        let a = controller.request(PageWindow::new("a", 1, 1));
        let b = controller.request(PageWindow::new("b", 1, 1));
        assert_eq!(controller.complete(a, Ok(page(&["a1"], 1))), PageOutcome::Applied);
        assert_eq!(controller.complete(b, Ok(page(&["b1"], 1))), PageOutcome::Applied);
    }

    #[test]
    fn cleared_keys_drop_late_responses() {
        let controller = PagedFetchController::new();
        let ticket = controller.request(PageWindow::new("k", 1, 1));
        controller.clear();
        assert_eq!(controller.complete(ticket, Ok(page(&["x"], 1))), PageOutcome::Superseded);
        assert!(controller.view("k").is_none());
    }

    #[test]
    fn clamp_page_respects_known_totals() {
        assert_eq!(clamp_page(0, None), 1);
        assert_eq!(clamp_page(4, None), 4);
        assert_eq!(clamp_page(9, Some(3)), 3);
        assert_eq!(clamp_page(0, Some(3)), 1);
        assert_eq!(clamp_page(2, Some(0)), 1);
    }
}
