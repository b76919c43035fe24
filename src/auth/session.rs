//! In-memory bearer sessions.

use crate::auth::Principal;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Principal>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and return its bearer token.
    pub fn issue(&self, principal: Principal) -> String {
        let token = Uuid::new_v4();
        self.sessions.write().insert(token, principal);
        token.to_string()
    }

    pub fn get(&self, token: &str) -> Option<Principal> {
        let token = Uuid::parse_str(token).ok()?;
        self.sessions.read().get(&token).cloned()
    }

    pub fn revoke(&self, token: &str) -> bool {
        match Uuid::parse_str(token) {
            Ok(token) => self.sessions.write().remove(&token).is_some(),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
