use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::repo::UsersRepository;

#[derive(Debug)]
struct State {
    users: Vec<User>,
    /// Next id to hand out; never decreases, so deleted ids are not reused.
    next_id: u64,
}

/// Process-lifetime user store. Every operation runs inside one critical
/// section; the lock is never held across an await point.
#[derive(Debug)]
pub struct InMemoryUsersRepository {
    state: Mutex<State>,
}

impl Default for InMemoryUsersRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                users: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.state.lock().users.clone())
    }

    async fn find_by_id(&self, id: u64) -> anyhow::Result<Option<User>> {
        let state = self.state.lock();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new_user: NewUser, created_at: DateTime<Utc>) -> anyhow::Result<User> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id = id
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("user id space exhausted"))?;

        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            created_at,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: u64, patch: UserPatch) -> anyhow::Result<Option<User>> {
        let mut state = self.state.lock();
        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        patch.apply_to(user);
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: u64) -> anyhow::Result<bool> {
        let mut state = self.state.lock();
        match state.users.iter().position(|u| u.id == id) {
            Some(idx) => {
                state.users.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(self.state.lock().users.len())
    }
}
