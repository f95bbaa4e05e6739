use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{AuthTokens, FilterSet, UserProfile};

const GUEST_ID_KEY: &str = "guest_id";
const FILTERS_KEY: &str = "filters";

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

/// A signed-in identity as persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSession {
    pub profile: UserProfile,
    pub tokens: AuthTokens,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("storage: query setting")
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO settings (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
            params![key, value, Utc::now().timestamp()],
        )
        .context("storage: write setting")?;
        Ok(())
    }

    pub fn guest_id(&self) -> Result<Option<String>> {
        self.get_setting(GUEST_ID_KEY)
    }

    pub fn set_guest_id(&self, id: &str) -> Result<()> {
        self.put_setting(GUEST_ID_KEY, id)
    }

    pub fn filters(&self) -> Result<Option<FilterSet>> {
        match self.get_setting(FILTERS_KEY)? {
            Some(raw) => {
                let filters =
                    serde_json::from_str(&raw).context("storage: decode saved filters")?;
                Ok(Some(filters))
            }
            None => Ok(None),
        }
    }

    pub fn set_filters(&self, filters: &FilterSet) -> Result<()> {
        let raw = serde_json::to_string(filters).context("storage: encode filters")?;
        self.put_setting(FILTERS_KEY, &raw)
    }

    pub fn save_session(&self, profile: &UserProfile, tokens: &AuthTokens) -> Result<()> {
        let profile_json = serde_json::to_string(profile).context("storage: encode profile")?;
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO sessions (slot, user_id, profile, access_token, refresh_token, updated_at)
VALUES (1, ?1, ?2, ?3, ?4, ?5)
ON CONFLICT(slot) DO UPDATE SET
  user_id = excluded.user_id,
  profile = excluded.profile,
  access_token = excluded.access_token,
  refresh_token = excluded.refresh_token,
  updated_at = excluded.updated_at
"#,
            params![
                profile.id,
                profile_json,
                tokens.access_token,
                tokens.refresh_token,
                Utc::now().timestamp(),
            ],
        )
        .context("storage: write session")?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<SavedSession>> {
        let row: Option<(String, String, String, i64)> = {
            let conn = self.conn.lock();
            conn.query_row(
                r#"
SELECT profile, access_token, refresh_token, updated_at
FROM sessions
WHERE slot = 1
"#,
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .context("storage: query session")?
        };

        let Some((profile, access_token, refresh_token, updated)) = row else {
            return Ok(None);
        };
        let profile: UserProfile =
            serde_json::from_str(&profile).context("storage: decode profile")?;
        Ok(Some(SavedSession {
            profile,
            tokens: AuthTokens {
                access_token,
                refresh_token,
            },
            updated_at: Utc
                .timestamp_opt(updated, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }))
    }

    pub fn clear_session(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions", [])
            .context("storage: clear session")?;
        Ok(())
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations = migrations();
    for (idx, sql) in migrations.iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![
                version,
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0))
                    .as_secs() as i64,
            ],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
  slot INTEGER PRIMARY KEY CHECK (slot = 1),
  user_id TEXT NOT NULL,
  profile TEXT NOT NULL,
  access_token TEXT NOT NULL,
  refresh_token TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lingofeed").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CefrLevel, UserRole};
    use tempfile::tempdir;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            email: "ann@example.test".into(),
            full_name: "Ann".into(),
            role: UserRole::Moderator,
            avatar_url: None,
            streak_days: 3,
            completed_lessons: 1,
            level: "B1".into(),
            xp_points: 40,
        }
    }

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn guest_id_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = Store::open(Options {
            path: Some(path.clone()),
        })
        .unwrap();
        store.set_guest_id("guest-1").unwrap();
        store.close().unwrap();

        let reopened = Store::open(Options { path: Some(path) }).unwrap();
        assert_eq!(reopened.guest_id().unwrap().as_deref(), Some("guest-1"));
    }

    #[test]
    fn session_round_trip_and_clear() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_session().unwrap().is_none());
        let tokens = AuthTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        store.save_session(&profile(), &tokens).unwrap();
        let saved = store.load_session().unwrap().unwrap();
        assert_eq!(saved.profile.role, UserRole::Moderator);
        assert_eq!(saved.tokens, tokens);

        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }

    #[test]
    fn filters_persist_as_json() {
        let store = Store::open_in_memory().unwrap();
        let filters = FilterSet {
            cefr_levels: Some(vec![CefrLevel::B2, CefrLevel::C1]),
            show_adult_content: false,
            ..FilterSet::default()
        };
        store.set_filters(&filters).unwrap();
        assert_eq!(store.filters().unwrap(), Some(filters));
    }
}
