use crate::db::user::{InternalUser, NewUser, UserId};
use std::collections::HashMap;
use tracing::{debug, span, Level};

#[derive(Default)]
pub struct UserManager {
    users: HashMap<UserId, InternalUser>,
}

impl UserManager {
    pub fn find_by_id(&self, user_id: UserId) -> Option<InternalUser> {
        self.users.get(&user_id).cloned()
    }

    pub fn find_by_username(&self, username: &str) -> Option<InternalUser> {
        let span = span!(Level::TRACE, "find by username", username = username);
        let _enter = span.enter();
        for (_user_id, user) in self.users.iter() {
            if user.username == username {
                debug!("Found user");
                return Some(user.clone());
            }
        }
        None
    }

    /// Returns `None` if the username is taken.
    pub fn insert(&mut self, new_user: NewUser) -> Option<InternalUser> {
        if self.find_by_username(&new_user.username).is_some() {
            return None;
        }
        let user = InternalUser {
            id: UserId::new(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
        };
        self.users.insert(user.id, user.clone());
        Some(user)
    }
}
