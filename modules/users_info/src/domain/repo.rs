use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{NewUser, User, UserPatch};

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// All users in insertion order.
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    /// First user whose id matches.
    async fn find_by_id(&self, id: u64) -> anyhow::Result<Option<User>>;
    /// Allocate the next id and append the user in one step.
    async fn insert(&self, new_user: NewUser, created_at: DateTime<Utc>) -> anyhow::Result<User>;
    /// Apply `patch` to the user with `id`. `None` if there is no such user.
    async fn update(&self, id: u64, patch: UserPatch) -> anyhow::Result<Option<User>>;
    /// Delete by id. Returns true if a user was removed.
    async fn delete(&self, id: u64) -> anyhow::Result<bool>;
    /// Number of stored users.
    async fn count(&self) -> anyhow::Result<usize>;
}
