use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use tracing::{debug, info};

use crate::api::Caller;
use crate::error::{FeedError, FeedResult};
use crate::model::{AuthResponse, AuthTokens, FilterSet, UserProfile};
use crate::storage::{self, SavedSession};

/// Generation of the viewing context. Identity and filter changes advance it;
/// results produced under an older epoch are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Persistence behind the identity provider.
pub trait SessionStore: Send + Sync {
    fn load_guest_id(&self) -> Result<Option<String>>;
    fn save_guest_id(&self, id: &str) -> Result<()>;
    fn load_session(&self) -> Result<Option<SavedSession>>;
    fn save_session(&self, profile: &UserProfile, tokens: &AuthTokens) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
    fn load_filters(&self) -> Result<Option<FilterSet>>;
    fn save_filters(&self, filters: &FilterSet) -> Result<()>;
}

impl SessionStore for storage::Store {
    fn load_guest_id(&self) -> Result<Option<String>> {
        self.guest_id()
    }

    fn save_guest_id(&self, id: &str) -> Result<()> {
        self.set_guest_id(id)
    }

    fn load_session(&self) -> Result<Option<SavedSession>> {
        storage::Store::load_session(self)
    }

    fn save_session(&self, profile: &UserProfile, tokens: &AuthTokens) -> Result<()> {
        storage::Store::save_session(self, profile, tokens)
    }

    fn clear_session(&self) -> Result<()> {
        storage::Store::clear_session(self)
    }

    fn load_filters(&self) -> Result<Option<FilterSet>> {
        self.filters()
    }

    fn save_filters(&self, filters: &FilterSet) -> Result<()> {
        self.set_filters(filters)
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<&'static str, String>>,
    session: Mutex<Option<SavedSession>>,
    filters: Mutex<Option<FilterSet>>,
}

impl SessionStore for MemorySessionStore {
    fn load_guest_id(&self) -> Result<Option<String>> {
        Ok(self.values.lock().get("guest_id").cloned())
    }

    fn save_guest_id(&self, id: &str) -> Result<()> {
        self.values.lock().insert("guest_id", id.to_string());
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SavedSession>> {
        Ok(self.session.lock().clone())
    }

    fn save_session(&self, profile: &UserProfile, tokens: &AuthTokens) -> Result<()> {
        *self.session.lock() = Some(SavedSession {
            profile: profile.clone(),
            tokens: tokens.clone(),
            updated_at: chrono::Utc::now(),
        });
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        *self.session.lock() = None;
        Ok(())
    }

    fn load_filters(&self) -> Result<Option<FilterSet>> {
        Ok(self.filters.lock().clone())
    }

    fn save_filters(&self, filters: &FilterSet) -> Result<()> {
        *self.filters.lock() = Some(filters.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Identity {
    Guest(String),
    Member {
        profile: UserProfile,
        tokens: AuthTokens,
    },
}

/// Owns the viewer's identity and the session epoch.
pub struct Manager {
    store: Arc<dyn SessionStore>,
    identity: RwLock<Identity>,
    epoch: RwLock<Epoch>,
}

impl Manager {
    pub fn new(store: Arc<dyn SessionStore>) -> Result<Self> {
        let identity = match store.load_session()? {
            Some(saved) => Identity::Member {
                profile: saved.profile,
                tokens: saved.tokens,
            },
            None => Identity::Guest(resolve_guest_id(store.as_ref())?),
        };
        Ok(Self {
            store,
            identity: RwLock::new(identity),
            epoch: RwLock::new(Epoch::default()),
        })
    }

    pub fn epoch(&self) -> Epoch {
        *self.epoch.read()
    }

    /// Starts a new epoch, invalidating everything issued under the old one.
    pub fn advance(&self) -> Epoch {
        let mut epoch = self.epoch.write();
        *epoch = epoch.next();
        debug!(epoch = epoch.value(), "session epoch advanced");
        *epoch
    }

    pub fn profile(&self) -> Option<UserProfile> {
        match &*self.identity.read() {
            Identity::Member { profile, .. } => Some(profile.clone()),
            Identity::Guest(_) => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.identity.read(), Identity::Member { .. })
    }

    pub fn caller(&self) -> Caller {
        match &*self.identity.read() {
            Identity::Guest(id) => Caller::guest(id.clone()),
            Identity::Member { profile, tokens } => Caller {
                user_id: Some(profile.id.clone()),
                role: Some(profile.role),
                access_token: Some(tokens.access_token.clone()).filter(|t| !t.is_empty()),
            },
        }
    }

    /// The caller for actions that need a signed-in viewer.
    pub fn member_caller(&self) -> FeedResult<Caller> {
        if self.is_authenticated() {
            Ok(self.caller())
        } else {
            Err(FeedError::Unauthenticated)
        }
    }

    pub fn saved_filters(&self) -> Result<Option<FilterSet>> {
        self.store.load_filters()
    }

    pub fn save_filters(&self, filters: &FilterSet) -> Result<()> {
        self.store.save_filters(filters)
    }

    pub fn sign_in(&self, auth: AuthResponse) -> Result<Epoch> {
        self.store.save_session(&auth.profile, &auth.tokens)?;
        info!(user = %auth.profile.id, "signed in");
        *self.identity.write() = Identity::Member {
            profile: auth.profile,
            tokens: auth.tokens,
        };
        Ok(self.advance())
    }

    pub fn sign_out(&self) -> Result<Epoch> {
        self.store.clear_session()?;
        let guest = resolve_guest_id(self.store.as_ref())?;
        info!("signed out");
        *self.identity.write() = Identity::Guest(guest);
        Ok(self.advance())
    }
}

fn resolve_guest_id(store: &dyn SessionStore) -> Result<String> {
    if let Some(id) = store.load_guest_id()? {
        if !id.trim().is_empty() {
            return Ok(id);
        }
    }
    let id = new_guest_id();
    store.save_guest_id(&id)?;
    Ok(id)
}

/// Random version-4 UUID in its canonical textual form.
pub fn new_guest_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserRole;

    fn auth(role: UserRole) -> AuthResponse {
        AuthResponse {
            tokens: AuthTokens {
                access_token: "tok".into(),
                refresh_token: "ref".into(),
            },
            profile: UserProfile {
                id: "u7".into(),
                email: "u7@example.test".into(),
                full_name: "U Seven".into(),
                role,
                avatar_url: None,
                streak_days: 0,
                completed_lessons: 0,
                level: String::new(),
                xp_points: 0,
            },
        }
    }

    #[test]
    fn guest_id_is_stable_across_managers() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        let first = Manager::new(store.clone()).unwrap().caller();
        let second = Manager::new(store).unwrap().caller();
        assert!(first.user_id.is_some());
        assert_eq!(first.user_id, second.user_id);
        assert!(first.access_token.is_none());
    }

    #[test]
    fn sign_in_advances_epoch_and_sets_headers() {
        let manager = Manager::new(Arc::new(MemorySessionStore::default())).unwrap();
        let before = manager.epoch();
        assert_eq!(manager.member_caller(), Err(FeedError::Unauthenticated));

        let after = manager.sign_in(auth(UserRole::Admin)).unwrap();
        assert!(after > before);
        let caller = manager.member_caller().unwrap();
        assert_eq!(caller.user_id.as_deref(), Some("u7"));
        assert_eq!(caller.role, Some(UserRole::Admin));
        assert_eq!(caller.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn sign_out_returns_to_same_guest() {
        let manager = Manager::new(Arc::new(MemorySessionStore::default())).unwrap();
        let guest = manager.caller().user_id;
        manager.sign_in(auth(UserRole::User)).unwrap();
        manager.sign_out().unwrap();
        assert!(!manager.is_authenticated());
        assert_eq!(manager.caller().user_id, guest);
        assert_eq!(manager.epoch().value(), 2);
    }

    #[test]
    fn saved_session_restores_member() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        Manager::new(store.clone())
            .unwrap()
            .sign_in(auth(UserRole::User))
            .unwrap();
        let restored = Manager::new(store).unwrap();
        assert!(restored.is_authenticated());
    }

    #[test]
    fn guest_ids_look_like_uuids() {
        let id = new_guest_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'4');
    }
}
