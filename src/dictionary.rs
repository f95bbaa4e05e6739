use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::data::DictionaryService;
use crate::error::{FeedError, FeedResult};
use crate::model::{DictionaryEntry, NewDictionaryEntry};
use crate::session::{self, Epoch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictionaryStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictionarySnapshot {
    pub items: Vec<DictionaryEntry>,
    pub status: DictionaryStatus,
    pub error: Option<String>,
}

struct State {
    epoch: Epoch,
    generation: u64,
    items: Vec<DictionaryEntry>,
    status: DictionaryStatus,
    error: Option<String>,
}

impl State {
    fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            generation: 0,
            items: Vec::new(),
            status: DictionaryStatus::Idle,
            error: None,
        }
    }

    /// Moves to `epoch`, dropping anything listed for an earlier viewer.
    fn enter(&mut self, epoch: Epoch) {
        if self.epoch != epoch {
            *self = State {
                generation: self.generation + 1,
                ..State::new(epoch)
            };
        }
    }
}

/// The signed-in member's saved words. Newest entries come first.
pub struct Dictionary {
    service: Arc<dyn DictionaryService>,
    state: Mutex<State>,
}

impl Dictionary {
    pub fn new(service: Arc<dyn DictionaryService>, epoch: Epoch) -> Self {
        Self {
            service,
            state: Mutex::new(State::new(epoch)),
        }
    }

    /// Replaces the list with the server's. A failure keeps the current
    /// list and records the error.
    pub fn fetch(&self, session: &session::Manager) -> FeedResult<usize> {
        let epoch = session.epoch();
        let caller = match session.member_caller() {
            Ok(caller) => caller,
            Err(err) => {
                let mut state = self.state.lock();
                state.enter(epoch);
                state.status = DictionaryStatus::Failed;
                state.error = Some("sign in to see your dictionary".into());
                return Err(err);
            }
        };
        let generation = {
            let mut state = self.state.lock();
            state.enter(epoch);
            state.generation += 1;
            state.status = DictionaryStatus::Loading;
            state.error = None;
            state.generation
        };
        debug!(epoch = epoch.value(), "loading dictionary");

        let result = self.service.entries(&caller);

        let mut state = self.state.lock();
        if state.epoch != epoch || state.generation != generation || session.epoch() != epoch {
            debug!(epoch = epoch.value(), "dropping dictionary for a previous context");
            return Err(FeedError::StaleResponse);
        }
        match result {
            Ok(items) => {
                let count = items.len();
                state.items = items;
                state.status = DictionaryStatus::Idle;
                info!(count, "dictionary loaded");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, "dictionary load failed");
                state.status = DictionaryStatus::Failed;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn add(
        &self,
        session: &session::Manager,
        entry: &NewDictionaryEntry,
    ) -> FeedResult<DictionaryEntry> {
        let caller = session.member_caller()?;
        let epoch = session.epoch();
        let saved = self.service.add_entry(&caller, entry).map_err(|err| {
            warn!(word = %entry.word, error = %err, "saving word failed");
            err
        })?;
        if session.epoch() != epoch {
            return Err(FeedError::StaleResponse);
        }
        let mut state = self.state.lock();
        state.enter(epoch);
        state.items.retain(|item| item.id != saved.id);
        state.items.insert(0, saved.clone());
        info!(id = %saved.id, word = %saved.word, "word saved");
        Ok(saved)
    }

    pub fn remove(&self, session: &session::Manager, id: &str) -> FeedResult<()> {
        let caller = session.member_caller()?;
        let epoch = session.epoch();
        self.service.delete_entry(&caller, id).map_err(|err| {
            warn!(id, error = %err, "removing word failed");
            err
        })?;
        if session.epoch() != epoch {
            return Err(FeedError::StaleResponse);
        }
        let mut state = self.state.lock();
        state.enter(epoch);
        state.items.retain(|item| item.id != id);
        info!(id, "word removed");
        Ok(())
    }

    pub fn snapshot(&self) -> DictionarySnapshot {
        let state = self.state.lock();
        DictionarySnapshot {
            items: state.items.clone(),
            status: state.status,
            error: state.error.clone(),
        }
    }

    pub fn invalidate(&self, epoch: Epoch) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = State {
            generation,
            ..State::new(epoch)
        };
    }
}
