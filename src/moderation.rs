use std::sync::Arc;

use tracing::{info, warn};

use crate::api::Caller;
use crate::content::ContentCache;
use crate::data::InteractionService;
use crate::error::{FeedError, FeedResult};
use crate::model::{Author, ContentDetail, FeedItem, ModerationUpdate};
use crate::pager::Pager;
use crate::sequence::WriteSequencer;
use crate::session;

#[derive(Debug, Clone, PartialEq)]
pub enum ModerationOutcome {
    Applied(ContentDetail),
    Superseded,
}

/// Staff-only edits to a video's metadata.
pub struct Moderator {
    service: Arc<dyn InteractionService>,
    writes: WriteSequencer,
}

impl Moderator {
    pub fn new(service: Arc<dyn InteractionService>) -> Self {
        Self {
            service,
            writes: WriteSequencer::default(),
        }
    }

    fn staff_caller(session: &session::Manager) -> FeedResult<Caller> {
        let caller = session.member_caller()?;
        match caller.role {
            Some(role) if role.is_staff() => Ok(caller),
            _ => Err(FeedError::Forbidden),
        }
    }

    pub fn update(
        &self,
        session: &session::Manager,
        pager: &Pager,
        cache: &ContentCache,
        id: &str,
        update: ModerationUpdate,
    ) -> FeedResult<ModerationOutcome> {
        let caller = Self::staff_caller(session)?;
        let epoch = session.epoch();
        let ticket = self.writes.begin(id);
        let result = self.service.moderate(&caller, id, &update);
        let latest = self.writes.finish(&ticket);

        let detail = result.map_err(|err| {
            warn!(id, field = update.path_segment(), error = %err, "moderation failed");
            err
        })?;
        if session.epoch() != epoch {
            return Err(FeedError::StaleResponse);
        }
        if !latest {
            return Ok(ModerationOutcome::Superseded);
        }

        cache.replace(epoch, detail.clone());
        pager.update_item(epoch, id, |item| apply_detail(item, &detail));
        info!(id, field = update.path_segment(), "moderation applied");
        Ok(ModerationOutcome::Applied(detail))
    }

    pub fn delete(
        &self,
        session: &session::Manager,
        pager: &Pager,
        cache: &ContentCache,
        id: &str,
    ) -> FeedResult<()> {
        let caller = Self::staff_caller(session)?;
        let epoch = session.epoch();
        self.service.delete(&caller, id)?;
        if session.epoch() != epoch {
            return Err(FeedError::StaleResponse);
        }
        pager.remove_item(epoch, id);
        cache.remove(id);
        info!(id, "video deleted");
        Ok(())
    }

    pub fn authors(&self, session: &session::Manager) -> FeedResult<Vec<Author>> {
        let caller = Self::staff_caller(session)?;
        self.service.authors(&caller)
    }

    pub fn reset(&self) {
        self.writes.clear();
    }
}

fn apply_detail(item: &mut FeedItem, detail: &ContentDetail) {
    if let Some(level) = detail.cefr_level {
        item.analysis.cefr_level = level;
    }
    if let Some(speed) = detail.speech_speed {
        item.analysis.speech_speed = speed;
    }
    item.author = detail.author.clone();
    item.is_adult_content = detail.is_adult_content;
    item.is_moderated = detail.is_moderated;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_items, MockContentService, MockFeedService, MockInteractionService};
    use crate::model::{
        AuthResponse, AuthTokens, CefrLevel, FeedPage, FilterSet, UserProfile, UserRole,
    };
    use crate::session::MemorySessionStore;

    struct Fixture {
        session: session::Manager,
        pager: Pager,
        cache: ContentCache,
        service: Arc<MockInteractionService>,
        moderator: Moderator,
    }

    fn fixture(role: Option<UserRole>) -> Fixture {
        let session = session::Manager::new(Arc::new(MemorySessionStore::default())).unwrap();
        if let Some(role) = role {
            session
                .sign_in(AuthResponse {
                    tokens: AuthTokens {
                        access_token: "t".into(),
                        refresh_token: String::new(),
                    },
                    profile: UserProfile {
                        id: "staff".into(),
                        email: String::new(),
                        full_name: String::new(),
                        role,
                        avatar_url: None,
                        streak_days: 0,
                        completed_lessons: 0,
                        level: String::new(),
                        xp_points: 0,
                    },
                })
                .unwrap();
        }
        let epoch = session.epoch();
        let feed = Arc::new(MockFeedService::scripted(vec![Ok(FeedPage {
            items: sample_items(3),
            next_cursor: None,
            has_more: false,
        })]));
        let pager = Pager::new(feed, 20, epoch);
        pager.load(&Caller::default(), &FilterSet::default(), true).unwrap();
        let cache = ContentCache::new(Arc::new(MockContentService::default()), epoch);
        let service = Arc::new(MockInteractionService::default());
        let moderator = Moderator::new(service.clone());
        Fixture {
            session,
            pager,
            cache,
            service,
            moderator,
        }
    }

    #[test]
    fn regular_user_is_forbidden() {
        let fx = fixture(Some(UserRole::User));
        let err = fx
            .moderator
            .update(&fx.session, &fx.pager, &fx.cache, "v1", ModerationUpdate::Adult(true))
            .unwrap_err();
        assert_eq!(err, FeedError::Forbidden);
        assert!(fx.service.moderation_calls().is_empty());
    }

    #[test]
    fn guest_is_unauthenticated() {
        let fx = fixture(None);
        assert_eq!(
            fx.moderator.authors(&fx.session).unwrap_err(),
            FeedError::Unauthenticated
        );
    }

    #[test]
    fn update_replaces_detail_and_feed_fields() {
        let fx = fixture(Some(UserRole::Moderator));
        let outcome = fx
            .moderator
            .update(
                &fx.session,
                &fx.pager,
                &fx.cache,
                "v1",
                ModerationUpdate::CefrLevel(CefrLevel::C1),
            )
            .unwrap();
        assert!(matches!(outcome, ModerationOutcome::Applied(_)));
        assert_eq!(fx.cache.detail("v1").unwrap().cefr_level, Some(CefrLevel::C1));
        assert_eq!(fx.pager.item("v1").unwrap().analysis.cefr_level, CefrLevel::C1);
    }

    #[test]
    fn delete_drops_item_and_cache_entry() {
        let fx = fixture(Some(UserRole::Admin));
        fx.cache.ensure_loaded(&Caller::default(), "v2").unwrap();
        fx.moderator
            .delete(&fx.session, &fx.pager, &fx.cache, "v2")
            .unwrap();
        assert_eq!(fx.service.deleted(), vec!["v2".to_string()]);
        assert!(fx.pager.item("v2").is_none());
        assert!(fx.cache.detail("v2").is_none());
    }
}
