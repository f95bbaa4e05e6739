use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::content::ContentCache;
use crate::data::InteractionService;
use crate::error::{FeedError, FeedResult};
use crate::model::LikeState;
use crate::pager::Pager;
use crate::sequence::WriteSequencer;
use crate::session::{self, Epoch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Applied(LikeState),
    /// A newer toggle for the same video was sent; this response was dropped.
    Superseded,
}

/// Last server answers per video, in issue order.
#[derive(Debug, Default)]
struct Confirmed {
    /// Sequence of the response currently shown on the item.
    applied: u64,
    /// Newest success that landed while a later toggle was still in flight.
    held: Option<(u64, LikeState)>,
}

/// Server-confirmed like/unlike. Nothing changes locally until the server
/// answers, and the answer overwrites the local count and flag.
pub struct LikeToggle {
    service: Arc<dyn InteractionService>,
    writes: WriteSequencer,
    pending: Mutex<HashMap<String, bool>>,
    confirmed: Mutex<HashMap<String, Confirmed>>,
}

impl LikeToggle {
    pub fn new(service: Arc<dyn InteractionService>) -> Self {
        Self {
            service,
            writes: WriteSequencer::default(),
            pending: Mutex::new(HashMap::new()),
            confirmed: Mutex::new(HashMap::new()),
        }
    }

    /// Sends the negation of the latest intent for `id`. Only the newest
    /// toggle's answer is shown; when it fails, the newest earlier success
    /// is shown instead and the error is still returned.
    pub fn toggle(
        &self,
        session: &session::Manager,
        pager: &Pager,
        cache: &ContentCache,
        id: &str,
    ) -> FeedResult<LikeOutcome> {
        let caller = session.member_caller()?;
        let epoch = session.epoch();
        let (desired, ticket) = {
            let mut pending = self.pending.lock();
            // A toggle still in flight is the most recent intent.
            let current = pending
                .get(id)
                .copied()
                .or_else(|| pager.item(id).map(|item| item.is_liked))
                .unwrap_or(false);
            let desired = !current;
            pending.insert(id.to_string(), desired);
            (desired, self.writes.begin(id))
        };

        let result = self.service.set_like(&caller, id, desired);

        let fresh = session.epoch() == epoch;
        let shown = {
            let mut pending = self.pending.lock();
            let latest = self.writes.finish(&ticket);
            if latest {
                pending.remove(id);
            }
            let settled = latest || !self.writes.in_flight(id);
            if fresh {
                self.settle(id, ticket.seq(), latest, settled, &result)
            } else {
                None
            }
        };

        match result {
            Err(err) => {
                warn!(id, error = %err, "like update failed");
                if let Some(state) = shown {
                    Self::apply(pager, cache, epoch, id, state);
                    info!(id, liked = state.is_liked, "like restored to last confirmed state");
                }
                Err(err)
            }
            Ok(_) if !fresh => Err(FeedError::StaleResponse),
            Ok(_) => match shown {
                Some(state) => {
                    Self::apply(pager, cache, epoch, id, state);
                    info!(id, liked = state.is_liked, count = state.likes_count, "like reconciled");
                    Ok(LikeOutcome::Applied(state))
                }
                None => {
                    info!(id, "like response superseded by a newer toggle");
                    Ok(LikeOutcome::Superseded)
                }
            },
        }
    }

    /// Decides which server state, if any, the item should show after the
    /// response for `seq` lands. `settled` means no later toggle is pending.
    fn settle(
        &self,
        id: &str,
        seq: u64,
        latest: bool,
        settled: bool,
        result: &FeedResult<LikeState>,
    ) -> Option<LikeState> {
        let mut confirmed = self.confirmed.lock();
        let entry = confirmed.entry(id.to_string()).or_default();
        let chosen = match result {
            Ok(state) if settled => Some((seq, *state)),
            Ok(state) => {
                if entry.held.map_or(true, |(held, _)| held < seq) {
                    entry.held = Some((seq, *state));
                }
                None
            }
            Err(_) if latest => entry.held,
            Err(_) => None,
        };
        if latest {
            entry.held = None;
        }
        let (seq, state) = chosen.filter(|(seq, _)| *seq > entry.applied)?;
        entry.applied = seq;
        Some(state)
    }

    fn apply(pager: &Pager, cache: &ContentCache, epoch: Epoch, id: &str, state: LikeState) {
        pager.update_item(epoch, id, |item| {
            item.likes_count = state.likes_count;
            item.is_liked = state.is_liked;
        });
        cache.update(epoch, id, |detail| {
            detail.likes_count = state.likes_count;
            detail.is_liked = state.is_liked;
        });
    }

    pub fn reset(&self) {
        self.pending.lock().clear();
        self.confirmed.lock().clear();
        self.writes.clear();
    }
}
