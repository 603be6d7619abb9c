//! Per-client sessions and the login gate.
//!
//! Every browser gets its own [`Session`] (keyed by a random [`SessionId`]
//! held in a cookie). A session records whether the operator has logged in
//! and which page the client was last routed to. Sessions live only in
//! memory: a restart logs everyone out. Only logged-in sessions are
//! stored, so anonymous traffic leaves the table untouched.
//!
//! There is a single operator account. [`AuthGate`] holds its credentials
//! and flips a session between the public and the authenticated state.

use crate::config::{ConfigError, Credentials, PASSWORD_VAR, USERNAME_VAR};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

/// Page a session is currently routed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Public,
    Admin,
}

impl View {
    pub fn path(self) -> &'static str {
        match self {
            View::Public => "/",
            View::Admin => "/admin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            View::Public => "Evidências Públicas",
            View::Admin => "Administração",
        }
    }
}

/// Per-client context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub page: View,
}

/// Opaque session key, carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Process-local session table.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for `id`. An absent or unknown id gets a fresh
    /// id and a default session, which is not stored until [`update`]
    /// keeps it. Returns the id actually in use.
    ///
    /// [`update`]: Self::update
    pub fn get_or_create(&self, id: Option<SessionId>) -> (SessionId, Session) {
        if let Some(id) = id {
            if let Some(session) = self.lock().get(&id) {
                return (id, *session);
            }
        }
        (SessionId::generate(), Session::default())
    }

    /// Record a session's new state. Only logged-in sessions are kept; a
    /// logged-out session carries nothing the next request needs and is
    /// dropped.
    pub fn update(&self, id: SessionId, session: Session) {
        let mut sessions = self.lock();
        if session.logged_in {
            sessions.insert(id, session);
        } else {
            sessions.remove(&id);
        }
    }

    /// Discard a session entirely.
    pub fn end(&self, id: SessionId) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated,
    Rejected,
}

/// Validates login attempts against the operator credentials.
#[derive(Debug, Clone)]
pub struct AuthGate {
    credentials: Credentials,
}

impl AuthGate {
    /// Refuses empty user names or passwords, which would otherwise let an
    /// empty form log in.
    pub fn new(credentials: Credentials) -> Result<Self, ConfigError> {
        if credentials.username.is_empty() {
            return Err(ConfigError::EmptySecret(USERNAME_VAR));
        }
        if credentials.password.is_empty() {
            return Err(ConfigError::EmptySecret(PASSWORD_VAR));
        }
        Ok(Self { credentials })
    }

    /// Exact, case-sensitive comparison. A rejected attempt leaves the
    /// session untouched.
    pub fn login(&self, session: &mut Session, username: &str, password: &str) -> AuthResult {
        if username == self.credentials.username && password == self.credentials.password {
            session.logged_in = true;
            session.page = View::Admin;
            tracing::info!("login accepted");
            AuthResult::Authenticated
        } else {
            tracing::warn!("login rejected");
            AuthResult::Rejected
        }
    }

    pub fn logout(&self, session: &mut Session) {
        session.logged_in = false;
        session.page = View::Public;
        tracing::info!("logged out");
    }
}
