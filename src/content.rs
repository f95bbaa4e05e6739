use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::api::Caller;
use crate::data::ContentService;
use crate::error::{FeedError, FeedResult};
use crate::model::ContentDetail;
use crate::session::Epoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Absent,
    Loading,
    Settled,
}

/// Read view of one cache entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentState {
    pub detail: Option<ContentDetail>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ContentState {
    pub fn status(&self) -> EntryStatus {
        if self.loading {
            EntryStatus::Loading
        } else if self.detail.is_some() || self.error.is_some() {
            EntryStatus::Settled
        } else {
            EntryStatus::Absent
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    Fetched,
    /// Already loading or already holding a detail.
    Skipped,
}

struct Inner {
    entries: HashMap<String, ContentState>,
    epoch: Epoch,
}

/// Lazily populated per-video detail, at most one fetch in flight per id.
pub struct ContentCache {
    service: Arc<dyn ContentService>,
    inner: Mutex<Inner>,
}

impl ContentCache {
    pub fn new(service: Arc<dyn ContentService>, epoch: Epoch) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                epoch,
            }),
        }
    }

    pub fn ensure_loaded(&self, caller: &Caller, id: &str) -> FeedResult<Ensure> {
        self.fetch(caller, id, false)
    }

    /// Refetches even when a detail is cached. A failed refresh keeps the
    /// detail that was already there.
    pub fn refresh(&self, caller: &Caller, id: &str) -> FeedResult<Ensure> {
        self.fetch(caller, id, true)
    }

    fn fetch(&self, caller: &Caller, id: &str, force: bool) -> FeedResult<Ensure> {
        let epoch = {
            let mut inner = self.inner.lock();
            let entry = inner.entries.entry(id.to_string()).or_default();
            if entry.loading || (!force && entry.detail.is_some()) {
                debug!(id, "content already cached or in flight");
                return Ok(Ensure::Skipped);
            }
            entry.loading = true;
            entry.error = None;
            inner.epoch
        };

        let result = self.service.load_content(caller, id);

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            warn!(id, "dropping content fetched for a previous context");
            return Err(FeedError::StaleResponse);
        }
        let entry = inner.entries.entry(id.to_string()).or_default();
        entry.loading = false;
        match result {
            Ok(detail) => {
                entry.detail = Some(detail);
                entry.error = None;
                Ok(Ensure::Fetched)
            }
            Err(err) => {
                warn!(id, error = %err, "content fetch failed");
                entry.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn get(&self, id: &str) -> ContentState {
        self.inner
            .lock()
            .entries
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn detail(&self, id: &str) -> Option<ContentDetail> {
        self.inner
            .lock()
            .entries
            .get(id)
            .and_then(|e| e.detail.clone())
    }

    /// Replaces the cached detail with an authoritative copy from a write.
    pub fn replace(&self, epoch: Epoch, detail: ContentDetail) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        let entry = inner.entries.entry(detail.id.clone()).or_default();
        entry.detail = Some(detail);
        entry.error = None;
        true
    }

    pub fn update(&self, epoch: Epoch, id: &str, update: impl FnOnce(&mut ContentDetail)) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        match inner.entries.get_mut(id).and_then(|e| e.detail.as_mut()) {
            Some(detail) => {
                update(detail);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) {
        self.inner.lock().entries.remove(id);
    }

    /// Forgets every entry and moves to `epoch`; fetches still in flight land
    /// as stale.
    pub fn invalidate(&self, epoch: Epoch) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.epoch = epoch;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
