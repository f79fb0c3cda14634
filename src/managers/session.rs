use crate::db::{
    session::{InternalSession, SessionId},
    user::UserId,
};
use std::collections::HashMap;

#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, InternalSession>,
}

impl SessionManager {
    pub fn find_by_id(&self, session_id: SessionId) -> Option<InternalSession> {
        self.sessions.get(&session_id).cloned()
    }

    pub fn create(&mut self, user_id: UserId) -> InternalSession {
        let session = InternalSession {
            id: SessionId::new(),
            user_id,
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    pub fn remove(&mut self, session_id: SessionId) {
        self.sessions.remove(&session_id);
    }
}
