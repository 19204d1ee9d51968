//! Authenticated sessions
//!
//! A [`Session`] carries a random token. The engine that issued it keeps the
//! token in its [`SessionRegistry`] until logout, and refuses any session
//! whose token it does not hold.

use crate::domain::{AuthError, Result, Role, UserId};
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

const TOKEN_LEN: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct SessionToken([u8; TOKEN_LEN]);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// Returned by [`Engine::login`](super::Engine::login) and passed explicitly
/// to every operation
///
/// The role is a snapshot from login time. The engine re-reads the account on
/// each call, so a role change or deactivation takes effect on the next
/// operation even for sessions issued earlier. Sessions cannot be built
/// outside this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: SessionToken,
    user_id: UserId,
    username: String,
    role: Role,
}

impl Session {
    pub(crate) fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            token: SessionToken::generate(),
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Role at login time
    pub fn role(&self) -> Role {
        self.role
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Open sessions of one engine, keyed by token
#[derive(Default)]
pub(crate) struct SessionRegistry {
    open: Mutex<HashMap<SessionToken, UserId>>,
}

impl SessionRegistry {
    /// Issue and remember a session for an authenticated account
    pub(crate) fn open(&self, user_id: UserId, username: &str, role: Role) -> Session {
        let session = Session::new(user_id, username, role);
        self.lock().insert(session.token, user_id);
        session
    }

    /// Fails with [`AuthError::SessionClosed`] unless `session` is open and
    /// belongs to the account it names
    pub(crate) fn check(&self, session: &Session) -> Result<()> {
        match self.lock().get(&session.token) {
            Some(owner) if *owner == session.user_id => Ok(()),
            _ => Err(AuthError::SessionClosed.into()),
        }
    }

    /// Forget a session; false if it was not open
    pub(crate) fn close(&self, session: &Session) -> bool {
        let mut open = self.lock();
        match open.get(&session.token) {
            Some(owner) if *owner == session.user_id => open.remove(&session.token).is_some(),
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, UserId>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VigilError;

    #[test]
    fn test_open_session_is_accepted() {
        let registry = SessionRegistry::default();
        let session = registry.open(UserId::new(), "admin", Role::Admin);
        assert!(registry.check(&session).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregistered_session_is_refused() {
        let registry = SessionRegistry::default();
        let real = registry.open(UserId::new(), "admin", Role::Admin);
        let forged = Session::new(real.user_id(), "nobody", Role::Receptionist);

        assert!(matches!(
            registry.check(&forged),
            Err(VigilError::Auth(AuthError::SessionClosed))
        ));
        assert!(!registry.close(&forged));
        assert!(registry.check(&real).is_ok());
    }

    #[test]
    fn test_closed_session_is_refused() {
        let registry = SessionRegistry::default();
        let session = registry.open(UserId::new(), "dr.bob", Role::Doctor);
        let copy = session.clone();

        assert!(registry.close(&session));
        assert!(registry.check(&copy).is_err());
        assert!(!registry.close(&copy));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_debug_omits_token() {
        let session = Session::new(UserId::new(), "rita", Role::Receptionist);
        let debug = format!("{session:?}");
        assert!(debug.contains("rita"));
        assert!(!debug.contains("token"));
    }
}
