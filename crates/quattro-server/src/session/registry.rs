//! Token → session lookup.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::token::Token;
use super::Session;
use crate::errors::SessionError;

/// Process-wide map from join and watch tokens to live sessions.
///
/// Both tokens of a session point at the same `Arc<Session>`. A session is
/// dropped once neither token maps to it and no connection holds it.
#[derive(Default)]
pub struct SessionRegistry {
    join: DashMap<Token, Arc<Session>>,
    watch: DashMap<Token, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new game and register fresh join and watch tokens for it.
    pub fn create_session(&self) -> (Arc<Session>, Token, Token) {
        let join = self.vacant_token(&self.join);
        let watch = self.vacant_token(&self.watch);
        let session = Arc::new(Session::new(join.clone(), watch.clone()));

        let _ = self.join.insert(join.clone(), session.clone());
        let _ = self.watch.insert(watch.clone(), session.clone());
        info!(session_id = %session.id, "session created");
        (session, join, watch)
    }

    fn vacant_token(&self, map: &DashMap<Token, Arc<Session>>) -> Token {
        loop {
            let token = Token::generate();
            // Collisions at 128 bits are theoretical, but the maps must stay 1:1.
            if let Entry::Vacant(_) = map.entry(token.clone()) {
                return token;
            }
        }
    }

    pub fn find_by_join(&self, token: &str) -> Result<Arc<Session>, SessionError> {
        self.join
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::TokenNotFound)
    }

    pub fn find_by_watch(&self, token: &str) -> Result<Arc<Session>, SessionError> {
        self.watch
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::TokenNotFound)
    }

    /// Remove only the join mapping. The watch mapping stays usable.
    pub fn release_join(&self, token: &Token) {
        if let Some((_, session)) = self.join.remove(token.as_str()) {
            debug!(session_id = %session.id, "join token released");
        }
    }

    pub fn release_watch(&self, token: &Token) {
        if let Some((_, session)) = self.watch.remove(token.as_str()) {
            debug!(session_id = %session.id, "watch token released");
        }
    }

    pub fn contains_join(&self, token: &Token) -> bool {
        self.join.contains_key(token.as_str())
    }

    /// Distinct sessions reachable through either token.
    pub fn session_count(&self) -> usize {
        let mut ids = HashSet::new();
        for entry in self.join.iter().chain(self.watch.iter()) {
            let _ = ids.insert(entry.value().id.clone());
        }
        ids.len()
    }

    pub fn join_count(&self) -> usize {
        self.join.len()
    }

    pub fn watch_count(&self) -> usize {
        self.watch.len()
    }
}
