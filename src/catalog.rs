use std::collections::HashMap;
use std::time::Instant;

use latency_proxy::{Interface, LatencyMonitored, Method};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

// ─── Constants ───────────────────────────────────────────────────

const NUM_USERS: usize = 10_000;

// ─── Name pools ──────────────────────────────────────────────────

static FIRST: &[&str] = &[
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Ethan", "Sophia", "Mason", "Isabella", "William",
    "Mia", "James", "Charlotte", "Benjamin", "Amelia", "Lucas", "Harper", "Henry", "Evelyn",
    "Alexander",
];

static LAST: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Lopez", "Wilson", "Anderson", "Taylor", "Moore", "Jackson", "Martin", "Lee",
    "Thompson", "White",
];

static ROLES: &[&str] = &["admin", "editor", "viewer"];

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),
}

// ─── Interfaces ──────────────────────────────────────────────────

pub trait UserDirectory {
    fn get_user(&self, id: &str) -> Result<User, CatalogError>;
    fn create_user(&self, name: &str, email: &str) -> User;
}

pub trait SessionStore {
    fn create_session(&self, user_id: &str) -> Result<Session, CatalogError>;
    fn get_session(&self, id: &str) -> Result<Session, CatalogError>;
}

pub const GET_USER: Method = Method::new("catalog::UserDirectory", "get_user", &["&str"]);
pub const CREATE_USER: Method =
    Method::new("catalog::UserDirectory", "create_user", &["&str", "&str"]);
pub const CREATE_SESSION: Method =
    Method::new("catalog::SessionStore", "create_session", &["&str"]);
pub const GET_SESSION: Method = Method::new("catalog::SessionStore", "get_session", &["&str"]);

pub static USER_DIRECTORY: Interface =
    Interface::new("catalog::UserDirectory", &[GET_USER, CREATE_USER]);
pub static SESSION_STORE: Interface =
    Interface::new("catalog::SessionStore", &[CREATE_SESSION, GET_SESSION]);

/// Both catalog interfaces, in the order they are proxied.
pub fn interfaces() -> [Interface; 2] {
    [USER_DIRECTORY, SESSION_STORE]
}

// ─── In-memory implementation ────────────────────────────────────

#[derive(Default)]
pub struct InMemoryCatalog {
    users: RwLock<HashMap<String, User>>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemoryCatalog {
    /// Builds a catalog with `NUM_USERS` deterministic users.
    pub fn seeded() -> Self {
        let start = Instant::now();
        let catalog = Self::default();
        // Deterministic RNG so re-runs produce the same data.
        let mut rng = StdRng::seed_from_u64(42);

        {
            let mut users = catalog.users.write();
            for i in 0..NUM_USERS {
                let id = user_id(i as u32 + 1);
                let first = FIRST[rng.gen_range(0..FIRST.len())];
                let last = LAST[rng.gen_range(0..LAST.len())];
                let user = User {
                    id: id.clone(),
                    name: format!("{first} {last}"),
                    email: format!(
                        "{}.{}{}@example.com",
                        first.to_lowercase(),
                        last.to_lowercase(),
                        i + 1
                    ),
                    role: ROLES[rng.gen_range(0..ROLES.len())].to_string(),
                    created_at: "2025-01-15T09:23:11Z".to_string(),
                };
                users.insert(id, user);
            }
        }

        info!(
            users = NUM_USERS,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "catalog seeded"
        );
        catalog
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }
}

/// `usr_00000042`
pub fn user_id(n: u32) -> String {
    format!("usr_{n:08}")
}

impl UserDirectory for InMemoryCatalog {
    fn get_user(&self, id: &str) -> Result<User, CatalogError> {
        self.users
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::UserNotFound(id.to_string()))
    }

    fn create_user(&self, name: &str, email: &str) -> User {
        let user = User {
            id: format!("usr_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
            name: name.to_string(),
            email: email.to_string(),
            role: "viewer".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.users.write().insert(user.id.clone(), user.clone());
        user
    }
}

impl SessionStore for InMemoryCatalog {
    fn create_session(&self, user_id: &str) -> Result<Session, CatalogError> {
        if !self.users.read().contains_key(user_id) {
            return Err(CatalogError::UserNotFound(user_id.to_string()));
        }
        let session = Session {
            id: format!("sess_{}", uuid::Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            token: format!("tok_{:016x}", rand::thread_rng().gen::<u64>()),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, id: &str) -> Result<Session, CatalogError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::SessionNotFound(id.to_string()))
    }
}

// ─── Monitored forwarding ────────────────────────────────────────

impl<S: UserDirectory> UserDirectory for LatencyMonitored<S> {
    fn get_user(&self, id: &str) -> Result<User, CatalogError> {
        self.invoke(&GET_USER, |s| s.get_user(id))
    }

    fn create_user(&self, name: &str, email: &str) -> User {
        self.call(&CREATE_USER, |s| s.create_user(name, email))
    }
}

impl<S: SessionStore> SessionStore for LatencyMonitored<S> {
    fn create_session(&self, user_id: &str) -> Result<Session, CatalogError> {
        self.invoke(&CREATE_SESSION, |s| s.create_session(user_id))
    }

    fn get_session(&self, id: &str) -> Result<Session, CatalogError> {
        self.invoke(&GET_SESSION, |s| s.get_session(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latency_proxy::{LatencyReport, MonitorConfig};

    fn monitored() -> LatencyMonitored<InMemoryCatalog> {
        LatencyMonitored::new(InMemoryCatalog::default(), &interfaces(), MonitorConfig::default())
            .unwrap()
    }

    #[test]
    fn both_interfaces_are_prefixed() {
        let catalog = monitored();
        let keys: Vec<_> = catalog.registry().list_keys().into_iter().collect();
        assert_eq!(
            keys,
            vec![
                "SessionStore::create_session(&str)",
                "SessionStore::get_session(&str)",
                "UserDirectory::create_user(&str,&str)",
                "UserDirectory::get_user(&str)",
            ]
        );
    }

    #[test]
    fn session_for_unknown_user_is_not_recorded() {
        let catalog = monitored();
        let err = catalog.create_session("usr_missing").unwrap_err();
        assert_eq!(err, CatalogError::UserNotFound("usr_missing".into()));

        let monitor = catalog
            .registry()
            .get("SessionStore::create_session(&str)")
            .unwrap();
        assert_eq!(monitor.samples_recorded(), 0);
    }

    #[test]
    fn round_trip_through_proxy() {
        let catalog = monitored();
        let user = catalog.create_user("Ada Lovelace", "ada@example.com");
        let session = catalog.create_session(&user.id).unwrap();
        assert_eq!(catalog.get_session(&session.id).unwrap().user_id, user.id);
        assert_eq!(catalog.get_user(&user.id).unwrap().name, "Ada Lovelace");

        let recorded = |key: &str| catalog.registry().get(key).unwrap().samples_recorded();
        assert_eq!(recorded("UserDirectory::create_user(&str,&str)"), 1);
        assert_eq!(recorded("SessionStore::create_session(&str)"), 1);
        assert_eq!(recorded("SessionStore::get_session(&str)"), 1);
        assert_eq!(recorded("UserDirectory::get_user(&str)"), 1);
    }

    #[test]
    fn seeded_catalog_has_users() {
        let catalog = InMemoryCatalog::seeded();
        assert_eq!(catalog.user_count(), NUM_USERS);
        assert!(catalog.get_user(&user_id(1)).is_ok());
    }
}
