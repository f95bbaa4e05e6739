use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::{Caller, FeedQuery};
use crate::data::FeedService;
use crate::error::{FeedError, FeedResult};
use crate::model::{FeedItem, FilterSet};
use crate::session::Epoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// Full reset in flight; the list is empty.
    Loading,
    /// Next page in flight; existing items stay visible.
    Refreshing,
    Failed,
}

impl Status {
    pub fn in_flight(&self) -> bool {
        matches!(self, Status::Loading | Status::Refreshing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was applied; `added` counts items that were new to the list.
    Applied { added: usize },
    /// Nothing to do: a load is in flight, the feed is exhausted, or the
    /// cursor was already consumed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub items: Vec<FeedItem>,
    pub status: Status,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct State {
    items: Vec<FeedItem>,
    ids: HashSet<String>,
    status: Status,
    cursor: Option<String>,
    has_more: bool,
    consumed: HashSet<Option<String>>,
    error: Option<String>,
    epoch: Epoch,
    generation: u64,
}

impl State {
    fn new(epoch: Epoch) -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
            status: Status::Idle,
            cursor: None,
            has_more: true,
            consumed: HashSet::new(),
            error: None,
            epoch,
            generation: 0,
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.cursor = None;
        self.has_more = true;
        self.consumed.clear();
    }
}

struct Ticket {
    epoch: Epoch,
    generation: u64,
    cursor: Option<String>,
}

/// Cursor-paginated, append-only feed list.
pub struct Pager {
    service: Arc<dyn FeedService>,
    page_size: usize,
    state: Mutex<State>,
}

impl Pager {
    pub fn new(service: Arc<dyn FeedService>, page_size: usize, epoch: Epoch) -> Self {
        Self {
            service,
            page_size,
            state: Mutex::new(State::new(epoch)),
        }
    }

    /// Drops every item and moves the pager to `epoch`. Responses to requests
    /// issued before this call are discarded when they land.
    pub fn invalidate(&self, epoch: Epoch) {
        let mut state = self.state.lock();
        state.clear();
        state.status = Status::Idle;
        state.error = None;
        state.epoch = epoch;
        state.generation += 1;
    }

    pub fn load(
        &self,
        caller: &Caller,
        filters: &FilterSet,
        reset: bool,
    ) -> FeedResult<LoadOutcome> {
        let Some(ticket) = self.begin(reset) else {
            return Ok(LoadOutcome::Skipped);
        };
        let query = FeedQuery {
            cursor: ticket.cursor.clone(),
            limit: self.page_size,
            filters: filters.clone(),
        };
        debug!(cursor = ?query.cursor, reset, "loading feed page");
        let result = self.service.load_page(caller, &query);
        self.finish(ticket, result)
    }

    fn begin(&self, reset: bool) -> Option<Ticket> {
        let mut state = self.state.lock();
        if reset {
            state.clear();
            state.generation += 1;
            state.status = Status::Loading;
        } else {
            if state.status.in_flight() || !state.has_more {
                return None;
            }
            if state.consumed.contains(&state.cursor) {
                return None;
            }
            state.status = Status::Refreshing;
        }
        state.error = None;
        Some(Ticket {
            epoch: state.epoch,
            generation: state.generation,
            cursor: state.cursor.clone(),
        })
    }

    fn finish(
        &self,
        ticket: Ticket,
        result: FeedResult<crate::model::FeedPage>,
    ) -> FeedResult<LoadOutcome> {
        let mut state = self.state.lock();
        if state.epoch != ticket.epoch || state.generation != ticket.generation {
            warn!(
                epoch = ticket.epoch.value(),
                "dropping feed page issued for a previous context"
            );
            return Err(FeedError::StaleResponse);
        }

        match result {
            Ok(page) => {
                let mut added = 0;
                for item in page.items {
                    if state.ids.insert(item.id.clone()) {
                        state.items.push(item);
                        added += 1;
                    }
                }
                state.consumed.insert(ticket.cursor);
                // A cursor the feed already served would replay the same page.
                let repeated = page
                    .next_cursor
                    .as_ref()
                    .is_some_and(|next| state.consumed.contains(&Some(next.clone())));
                if repeated {
                    warn!(cursor = ?page.next_cursor, "feed returned an already used cursor");
                }
                state.has_more =
                    page.has_more && page.next_cursor.is_some() && added > 0 && !repeated;
                state.cursor = page.next_cursor;
                state.status = Status::Idle;
                info!(
                    added,
                    total = state.items.len(),
                    has_more = state.has_more,
                    "feed page applied"
                );
                Ok(LoadOutcome::Applied { added })
            }
            Err(err) => {
                warn!(error = %err, "feed page failed");
                state.status = Status::Failed;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Whether scrolling to `visible_index` should pull the next page.
    pub fn should_load_more(&self, visible_index: usize, threshold: usize) -> bool {
        let state = self.state.lock();
        state.has_more
            && !state.status.in_flight()
            && !state.items.is_empty()
            && visible_index + threshold >= state.items.len().saturating_sub(1)
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            items: state.items.clone(),
            status: state.status,
            cursor: state.cursor.clone(),
            has_more: state.has_more,
            error: state.error.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item(&self, id: &str) -> Option<FeedItem> {
        self.state.lock().items.iter().find(|i| i.id == id).cloned()
    }

    pub fn item_at(&self, index: usize) -> Option<FeedItem> {
        self.state.lock().items.get(index).cloned()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.state.lock().items.iter().position(|i| i.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.state.lock().items.iter().map(|i| i.id.clone()).collect()
    }

    /// Applies `update` to the item with `id`, if it is still listed under
    /// `epoch`. Returns whether an item was touched.
    pub fn update_item(
        &self,
        epoch: Epoch,
        id: &str,
        update: impl FnOnce(&mut FeedItem),
    ) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }
        match state.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&self, epoch: Epoch, id: &str) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        before != state.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_item, sample_items, MockFeedService};
    use crate::model::FeedPage;

    fn page(ids: &[usize], next: Option<&str>, has_more: bool) -> FeedResult<FeedPage> {
        Ok(FeedPage {
            items: ids.iter().map(|n| sample_item(*n)).collect(),
            next_cursor: next.map(str::to_string),
            has_more,
        })
    }

    fn pager(pages: Vec<FeedResult<FeedPage>>) -> (Pager, Arc<MockFeedService>) {
        let service = Arc::new(MockFeedService::scripted(pages));
        (Pager::new(service.clone(), 20, Epoch::default()), service)
    }

    fn ids(pager: &Pager) -> Vec<String> {
        pager.ids()
    }

    #[test]
    fn duplicate_ids_keep_first_position() {
        let (pager, _) = pager(vec![
            page(&[1, 2, 3], Some("c1"), true),
            page(&[2, 4], Some("c2"), true),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        let outcome = pager.load(&caller, &filters, false).unwrap();
        assert_eq!(outcome, LoadOutcome::Applied { added: 1 });
        assert_eq!(ids(&pager), vec!["v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn null_cursor_ends_feed() {
        let (pager, _) = pager(vec![page(&[1, 2], None, true)]);
        pager
            .load(&Caller::default(), &FilterSet::default(), true)
            .unwrap();
        assert!(!pager.snapshot().has_more);
        assert_eq!(
            pager
                .load(&Caller::default(), &FilterSet::default(), false)
                .unwrap(),
            LoadOutcome::Skipped
        );
    }

    #[test]
    fn repeated_page_without_new_ids_ends_feed() {
        let (pager, _) = pager(vec![
            page(&[1, 2], Some("c1"), true),
            page(&[1, 2], Some("c2"), true),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        pager.load(&caller, &filters, false).unwrap();
        assert!(!pager.snapshot().has_more);
    }

    #[test]
    fn cursor_pointing_back_at_a_used_page_ends_feed() {
        let (pager, service) = pager(vec![
            page(&[1, 2], Some("c1"), true),
            page(&[3, 4], Some("c1"), true),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        let outcome = pager.load(&caller, &filters, false).unwrap();
        assert_eq!(outcome, LoadOutcome::Applied { added: 2 });
        let snap = pager.snapshot();
        assert!(!snap.has_more);
        assert!(!pager.should_load_more(3, 3));
        assert_eq!(
            pager.load(&caller, &filters, false).unwrap(),
            LoadOutcome::Skipped
        );
        assert_eq!(service.queries().len(), 2);
    }

    #[test]
    fn append_uses_stored_cursor() {
        let (pager, service) = pager(vec![
            page(&[1], Some("c1"), true),
            page(&[2], Some("c2"), true),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        pager.load(&caller, &filters, false).unwrap();
        let cursors: Vec<Option<String>> =
            service.queries().into_iter().map(|q| q.cursor).collect();
        assert_eq!(cursors, vec![None, Some("c1".to_string())]);
    }

    #[test]
    fn failure_keeps_items_and_records_error() {
        let (pager, _) = pager(vec![
            page(&[1, 2], Some("c1"), true),
            Err(FeedError::network("gateway timeout")),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        assert!(pager.load(&caller, &filters, false).is_err());
        let snap = pager.snapshot();
        assert_eq!(snap.status, Status::Failed);
        assert_eq!(snap.items.len(), 2);
        assert_eq!(snap.error.as_deref(), Some("gateway timeout"));
        assert_eq!(snap.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn retry_after_failure_reuses_cursor() {
        let (pager, service) = pager(vec![
            page(&[1], Some("c1"), true),
            Err(FeedError::network("flaky")),
            page(&[2], None, false),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        let _ = pager.load(&caller, &filters, false);
        pager.load(&caller, &filters, false).unwrap();
        let cursors: Vec<Option<String>> =
            service.queries().into_iter().map(|q| q.cursor).collect();
        assert_eq!(cursors[1], cursors[2]);
        assert_eq!(pager.len(), 2);
    }

    #[test]
    fn reset_clears_before_request() {
        let (pager, service) = pager(vec![
            page(&[1, 2], Some("c1"), true),
            page(&[5], Some("c9"), true),
        ]);
        let caller = Caller::default();
        let filters = FilterSet::default();
        pager.load(&caller, &filters, true).unwrap();
        pager.load(&caller, &filters, true).unwrap();
        assert_eq!(ids(&pager), vec!["v5"]);
        assert_eq!(service.queries()[1].cursor, None);
    }

    #[test]
    fn invalidated_response_is_dropped() {
        let (pager, _) = pager(vec![page(&[1], Some("c1"), true)]);
        let ticket = pager.begin(true).unwrap();
        pager.invalidate(Epoch::default().next());
        let result = pager.finish(ticket, page(&[1], Some("c1"), true));
        assert_eq!(result, Err(FeedError::StaleResponse));
        assert!(pager.is_empty());
    }

    #[test]
    fn overlapping_append_is_skipped() {
        let (pager, _) = pager(vec![page(&[1], Some("c1"), true)]);
        pager
            .load(&Caller::default(), &FilterSet::default(), true)
            .unwrap();
        let _first = pager.begin(false).unwrap();
        assert!(pager.begin(false).is_none());
    }

    #[test]
    fn load_more_trigger_tracks_scroll_position() {
        let service = Arc::new(MockFeedService::paged(sample_items(40), 20));
        let pager = Pager::new(service, 20, Epoch::default());
        pager
            .load(&Caller::default(), &FilterSet::default(), true)
            .unwrap();
        assert!(!pager.should_load_more(5, 3));
        assert!(pager.should_load_more(16, 3));
        assert!(pager.should_load_more(18, 3));
    }

    #[test]
    fn update_item_ignores_other_epochs() {
        let (pager, _) = pager(vec![page(&[1], None, false)]);
        pager
            .load(&Caller::default(), &FilterSet::default(), true)
            .unwrap();
        assert!(!pager.update_item(Epoch::default().next(), "v1", |i| i.likes_count = 99));
        assert!(pager.update_item(Epoch::default(), "v1", |i| i.likes_count = 99));
        assert_eq!(pager.item("v1").unwrap().likes_count, 99);
    }
}
