use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::AuthFlow;
use crate::config::Config;
use crate::content::{ContentCache, ContentState};
use crate::data::Services;
use crate::dictionary::{Dictionary, DictionarySnapshot};
use crate::error::{FeedError, FeedResult};
use crate::exercise::{AnswerReporter, ExerciseSession, ExerciseSettings, WordIndex};
use crate::like::{LikeOutcome, LikeToggle};
use crate::model::{
    Author, DictionaryEntry, FeedItem, FilterSet, ModerationUpdate, NewDictionaryEntry,
    TranscriptChunk, UserProfile,
};
use crate::moderation::{ModerationOutcome, Moderator};
use crate::pager::{LoadOutcome, Pager, Snapshot};
use crate::prefetch;
use crate::session::{self, Epoch};
use crate::tracker::{ActiveCardTracker, Switch};
use crate::transcript;
use crate::view::{CardView, ViewStore};

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub page_size: usize,
    pub load_more_threshold: usize,
    pub activation_ratio: f64,
    pub subtitle_grace: f64,
    pub exercises: ExerciseSettings,
    /// Seconds before the playback position whose subtitles feed an exercise.
    pub exercise_window: f64,
    pub filters: FilterSet,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FeedSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            page_size: cfg.feed.page_size,
            load_more_threshold: cfg.feed.load_more_threshold,
            activation_ratio: cfg.feed.activation_ratio,
            subtitle_grace: cfg.feed.subtitle_grace,
            exercises: ExerciseSettings {
                word_limit: cfg.exercises.word_limit,
                exercise_limit: Some(cfg.exercises.exercise_limit).filter(|n| *n > 0),
                advance_delay: cfg.exercises.advance_delay,
            },
            exercise_window: cfg.exercises.window.as_secs_f64(),
            filters: cfg.filters.clone(),
        }
    }
}

/// Subtitle lines on screen for one card. `None` means the track is hidden
/// or has nothing at the current position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subtitles {
    pub original: Option<String>,
    pub translation: Option<String>,
}

/// Everything needed to draw one card, composed at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub index: usize,
    pub item: FeedItem,
    pub content: ContentState,
    pub view: CardView,
    pub active: bool,
    pub should_load: bool,
}

/// The vertical feed: paging, per-card content, playback selection and the
/// interactions hanging off each card.
pub struct Feed {
    services: Services,
    session: Arc<session::Manager>,
    settings: FeedSettings,
    pager: Pager,
    cache: ContentCache,
    tracker: Mutex<ActiveCardTracker>,
    views: ViewStore,
    likes: LikeToggle,
    moderator: Moderator,
    auth: AuthFlow,
    words: WordIndex,
    reporter: Arc<AnswerReporter>,
    dictionary: Dictionary,
    filters: RwLock<FilterSet>,
    notice: Mutex<Option<String>>,
}

impl Feed {
    pub fn new(services: Services, session: Arc<session::Manager>, settings: FeedSettings) -> Self {
        let epoch = session.epoch();
        let filters = match session.saved_filters() {
            Ok(Some(saved)) => saved,
            Ok(None) => settings.filters.clone(),
            Err(err) => {
                warn!(error = %err, "could not restore saved filters");
                settings.filters.clone()
            }
        };
        Self {
            pager: Pager::new(services.feed.clone(), settings.page_size, epoch),
            cache: ContentCache::new(services.content.clone(), epoch),
            tracker: Mutex::new(ActiveCardTracker::new(settings.activation_ratio)),
            views: ViewStore::default(),
            likes: LikeToggle::new(services.interaction.clone()),
            moderator: Moderator::new(services.interaction.clone()),
            auth: AuthFlow::new(services.auth.clone(), session.clone()),
            words: WordIndex::new(services.words.clone()),
            reporter: Arc::new(AnswerReporter::new(services.exercises.clone())),
            dictionary: Dictionary::new(services.dictionary.clone(), epoch),
            filters: RwLock::new(filters),
            notice: Mutex::new(None),
            services,
            session,
            settings,
        }
    }

    pub fn session(&self) -> &session::Manager {
        &self.session
    }

    pub fn filters(&self) -> FilterSet {
        self.filters.read().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.pager.snapshot()
    }

    pub fn len(&self) -> usize {
        self.pager.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pager.is_empty()
    }

    pub fn active(&self) -> Option<String> {
        self.tracker.lock().active().map(str::to_string)
    }

    /// Last user-facing failure, cleared on read.
    pub fn take_notice(&self) -> Option<String> {
        self.notice.lock().take()
    }

    fn notice_for(&self, err: FeedError) -> FeedError {
        if err != FeedError::StaleResponse {
            *self.notice.lock() = Some(err.to_string());
        }
        err
    }

    /// Loads the first page from scratch.
    pub fn start(&self) -> FeedResult<LoadOutcome> {
        self.reload()
    }

    pub fn refresh(&self) -> FeedResult<LoadOutcome> {
        self.reload()
    }

    fn reload(&self) -> FeedResult<LoadOutcome> {
        let filters = self.filters();
        let outcome = self.pager.load(&self.session.caller(), &filters, true)?;
        self.after_load();
        Ok(outcome)
    }

    pub fn load_more(&self) -> FeedResult<LoadOutcome> {
        let filters = self.filters();
        let outcome = self.pager.load(&self.session.caller(), &filters, false)?;
        self.after_load();
        Ok(outcome)
    }

    fn after_load(&self) {
        if let Some(first) = self.pager.item_at(0) {
            let switch = self
                .tracker
                .lock()
                .sync_with_feed(std::slice::from_ref(&first));
            if let Some(switch) = switch {
                self.views.play(&switch.current);
            }
        }
        self.prefetch();
    }

    /// Pulls the next page when `visible_index` is close to the end.
    pub fn on_scroll(&self, visible_index: usize) -> FeedResult<Option<LoadOutcome>> {
        if !self
            .pager
            .should_load_more(visible_index, self.settings.load_more_threshold)
        {
            return Ok(None);
        }
        debug!(visible_index, "near end of feed");
        self.load_more().map(Some)
    }

    pub fn on_visibility_changed(&self, id: &str, ratio: f64) -> Option<Switch> {
        let switch = self.tracker.lock().on_visibility_changed(id, ratio)?;
        if let Some(previous) = switch.previous.as_deref() {
            self.views.pause(previous);
        }
        self.views.play(&switch.current);
        self.prefetch();
        Some(switch)
    }

    fn active_index(&self) -> Option<usize> {
        let active = self.active()?;
        self.pager.index_of(&active)
    }

    /// Loads content for the active card and the one after it. Failures stay
    /// on the cache entry for the card to show.
    pub fn prefetch(&self) -> Vec<usize> {
        let planned = prefetch::plan(self.pager.len(), self.active_index());
        let caller = self.session.caller();
        for index in &planned {
            let Some(item) = self.pager.item_at(*index) else {
                continue;
            };
            if let Err(err) = self.cache.ensure_loaded(&caller, &item.id) {
                debug!(id = %item.id, error = %err, "prefetch failed");
            }
        }
        planned
    }

    pub fn card(&self, index: usize) -> Option<Card> {
        let item = self.pager.item_at(index)?;
        let active_index = self.active_index();
        Some(Card {
            index,
            content: self.cache.get(&item.id),
            view: self.views.get(&item.id),
            active: active_index == Some(index),
            should_load: prefetch::should_load(index, active_index),
            item,
        })
    }

    /// Retries content for one card after a failure.
    pub fn retry_content(&self, id: &str) -> FeedResult<()> {
        self.cache.refresh(&self.session.caller(), id).map(|_| ())
    }

    pub fn set_position(&self, id: &str, position: f64, duration: Option<f64>) {
        self.views.set_position(id, position, duration);
    }

    pub fn set_muted(&self, id: &str, muted: bool) {
        self.views.set_muted(id, muted);
    }

    pub fn subtitles(&self, id: &str) -> Subtitles {
        let Some(detail) = self.cache.detail(id) else {
            return Subtitles::default();
        };
        let filters = self.filters.read();
        let position = self.views.get(id).position;
        let grace = self.settings.subtitle_grace;
        let line = |chunks: &[TranscriptChunk]| {
            let found = transcript::locate(chunks, position, grace);
            Some(found.text.to_string()).filter(|_| found.is_found())
        };
        Subtitles {
            original: filters
                .show_english_subtitles
                .then(|| line(detail.transcript_chunks()))
                .flatten(),
            translation: filters
                .show_russian_subtitles
                .then(|| line(detail.translation_chunks()))
                .flatten(),
        }
    }

    /// Applies new filters. A change that alters the server query starts a
    /// new epoch and reloads the feed; subtitle toggles apply in place.
    pub fn set_filters(&self, filters: FilterSet) -> FeedResult<Option<LoadOutcome>> {
        let reload = {
            let mut current = self.filters.write();
            let reload = current.affects_query(&filters);
            *current = filters.clone();
            reload
        };
        if let Err(err) = self.session.save_filters(&filters) {
            warn!(error = %err, "could not persist filters");
        }
        if !reload {
            return Ok(None);
        }
        let epoch = self.session.advance();
        info!(epoch = epoch.value(), "filters changed, reloading feed");
        self.reset_context(epoch);
        self.reload().map(Some)
    }

    /// Drops everything fetched for the previous viewer and reloads.
    pub fn on_identity_changed(&self, epoch: Epoch) -> FeedResult<LoadOutcome> {
        info!(epoch = epoch.value(), "identity changed, reloading feed");
        self.reset_context(epoch);
        self.reload()
    }

    /// The identity change already happened; a failed reload only shows up
    /// in the feed snapshot.
    fn reload_after_identity_change(&self, epoch: Epoch) {
        if let Err(err) = self.on_identity_changed(epoch) {
            warn!(
                epoch = epoch.value(),
                error = %err,
                "feed reload after identity change failed"
            );
        }
    }

    fn reset_context(&self, epoch: Epoch) {
        self.pager.invalidate(epoch);
        self.cache.invalidate(epoch);
        self.tracker.lock().reset();
        self.views.clear();
        self.likes.reset();
        self.moderator.reset();
        self.dictionary.invalidate(epoch);
        self.notice.lock().take();
    }

    pub fn login(&self, email: &str, password: &str) -> anyhow::Result<UserProfile> {
        let (profile, epoch) = self.auth.login(email, password)?;
        self.reload_after_identity_change(epoch);
        Ok(profile)
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> anyhow::Result<UserProfile> {
        let (profile, epoch) = self.auth.register(email, password, full_name)?;
        self.reload_after_identity_change(epoch);
        Ok(profile)
    }

    pub fn telegram(&self, init_data: &str) -> anyhow::Result<UserProfile> {
        let (profile, epoch) = self.auth.telegram(init_data)?;
        self.reload_after_identity_change(epoch);
        Ok(profile)
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        let epoch = self.auth.logout()?;
        self.reload_after_identity_change(epoch);
        Ok(())
    }

    pub fn toggle_like(&self, id: &str) -> FeedResult<LikeOutcome> {
        self.likes
            .toggle(&self.session, &self.pager, &self.cache, id)
            .map_err(|err| self.notice_for(err))
    }

    pub fn moderate(&self, id: &str, update: ModerationUpdate) -> FeedResult<ModerationOutcome> {
        self.moderator
            .update(&self.session, &self.pager, &self.cache, id, update)
            .map_err(|err| self.notice_for(err))
    }

    /// Deletes a video. When it was playing, the card that slides into its
    /// slot (or the new last card) takes over playback.
    pub fn delete(&self, id: &str) -> FeedResult<()> {
        let slot = self.pager.index_of(id);
        self.moderator
            .delete(&self.session, &self.pager, &self.cache, id)
            .map_err(|err| self.notice_for(err))?;
        self.views.remove(id);
        let successor = slot.and_then(|slot| {
            self.pager
                .item_at(slot)
                .or_else(|| slot.checked_sub(1).and_then(|i| self.pager.item_at(i)))
        });
        let switch = self
            .tracker
            .lock()
            .hand_off(id, successor.as_ref().map(|item| item.id.as_str()));
        if let Some(switch) = switch {
            self.views.play(&switch.current);
            self.prefetch();
        }
        Ok(())
    }

    pub fn authors(&self) -> FeedResult<Vec<Author>> {
        self.moderator.authors(&self.session)
    }

    pub fn dictionary(&self) -> DictionarySnapshot {
        self.dictionary.snapshot()
    }

    pub fn fetch_dictionary(&self) -> FeedResult<usize> {
        self.dictionary
            .fetch(&self.session)
            .map_err(|err| self.notice_for(err))
    }

    pub fn save_word(&self, entry: &NewDictionaryEntry) -> FeedResult<DictionaryEntry> {
        self.dictionary
            .add(&self.session, entry)
            .map_err(|err| self.notice_for(err))
    }

    pub fn remove_word(&self, id: &str) -> FeedResult<()> {
        self.dictionary
            .remove(&self.session, id)
            .map_err(|err| self.notice_for(err))
    }

    /// Builds a quiz from the subtitles shown on the card up to its current
    /// playback position.
    pub fn start_exercises(&self, id: &str) -> FeedResult<ExerciseSession> {
        let caller = self.session.caller();
        if self.cache.detail(id).is_none() {
            self.cache.ensure_loaded(&caller, id)?;
        }
        let detail = self.cache.detail(id).ok_or(FeedError::EmptyResult)?;
        let position = self.views.get(id).position;
        let from = (position - self.settings.exercise_window).max(0.0);
        let all = detail.transcript_chunks();
        let mut chunks = transcript::visible_between(all, from, position);
        if chunks.is_empty() {
            let shown = transcript::locate(all, position, self.settings.subtitle_grace);
            if let Some(index) = shown.index {
                chunks.push(&all[index]);
            }
        }
        ExerciseSession::start(
            self.services.exercises.as_ref(),
            &self.words,
            self.reporter.clone(),
            caller,
            id,
            &chunks,
            self.settings.exercises,
        )
    }
}
