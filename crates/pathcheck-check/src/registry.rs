//! Session registry.
//!
//! [`SessionRegistry`] routes reports about an object to every session the
//! object is attached to. Used when the same object (an input, a model) is
//! checked under several sessions at once, or when code that reports has no
//! direct handle on a session.

use std::sync::Arc;

use dashmap::DashMap;

use pathcheck_core::Model;

use crate::identify::ObjectRef;
use crate::session::{Session, SessionId};

/// Registry of live sessions.
///
/// Backed by `DashMap` for concurrent access from worker tasks.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: DashMap::new(),
        }
    }

    /// Registers a session, returning its ID.
    pub fn register(&self, session: Arc<Session>) -> SessionId {
        let id = session.id();
        self.sessions.insert(id, session);
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Removes a session. Returns the session if it was registered.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Attaches `object` to a session. Returns `false` if the session is
    /// unknown.
    pub fn associate(&self, object: ObjectRef, session: &SessionId) -> bool {
        match self.sessions.get(session) {
            Some(entry) => {
                entry.attach(object);
                true
            }
            None => false,
        }
    }

    /// Attaches `child` to every session `parent` is attached to.
    pub fn indirectly_associate(&self, parent: &ObjectRef, child: ObjectRef) -> usize {
        let sessions = self.find_sessions(parent);
        for session in &sessions {
            session.attach(child.clone());
        }
        sessions.len()
    }

    /// Sessions `object` is attached to, directly or through its model.
    pub fn find_sessions(&self, object: &ObjectRef) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|entry| entry.is_attached(object))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Detaches `object` from every session.
    pub fn free_object(&self, object: &ObjectRef) {
        for entry in self.sessions.iter() {
            entry.detach(object);
        }
    }

    /// Reports a problem about `object` to every session it is attached to.
    ///
    /// Severity is resolved per session from its policy and profile, and
    /// `fixed` is only kept for sessions with auto-fix enabled. Returns the
    /// number of sessions that recorded the case.
    pub fn report(
        &self,
        model: Option<&dyn Model>,
        object: &ObjectRef,
        rule: &str,
        code: &str,
        fixed: bool,
        message: &str,
    ) -> usize {
        let sessions = self.find_sessions(object);
        if sessions.is_empty() {
            tracing::debug!("{} reported '{}' on unattached object {}", rule, code, object);
            return 0;
        }
        sessions
            .iter()
            .filter(|session| {
                let severity = session
                    .policy()
                    .effective_severity(rule, session.settings().profile.as_deref());
                let id = session.identify(model, object);
                session.report(
                    rule,
                    severity,
                    &id,
                    code,
                    fixed && session.settings().fix,
                    message,
                )
            })
            .count()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
