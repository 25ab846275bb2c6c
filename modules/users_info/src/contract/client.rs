use async_trait::async_trait;

use crate::contract::{
    error::UsersInfoError,
    model::{NewUser, User, UserPatch},
};

/// Public API trait for the users_info module that other modules can use
#[async_trait]
pub trait UsersInfoApi: Send + Sync {
    /// All users in insertion order
    async fn list_users(&self) -> Result<Vec<User>, UsersInfoError>;

    /// Get a user by ID
    async fn get_user(&self, id: u64) -> Result<User, UsersInfoError>;

    /// Create a new user
    async fn create_user(&self, new_user: NewUser) -> Result<User, UsersInfoError>;

    /// Update a user with partial data
    async fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, UsersInfoError>;

    /// Delete a user by ID
    async fn delete_user(&self, id: u64) -> Result<(), UsersInfoError>;
}
