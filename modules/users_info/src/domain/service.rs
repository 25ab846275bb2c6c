use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::repo::UsersRepository;

/// Domain service with business rules for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
}

impl Service {
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }

    #[instrument(name = "users_info.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let users = self
            .repo
            .list()
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "users_info.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: u64) -> Result<User, DomainError> {
        debug!("Getting user by id");

        let user = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?
            .ok_or_else(|| DomainError::user_not_found(id))?;
        debug!("Successfully retrieved user");
        Ok(user)
    }

    #[instrument(
        name = "users_info.service.create_user",
        skip(self),
        fields(username = %new_user.username)
    )]
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        let user = self
            .repo
            .insert(new_user, Utc::now())
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "users_info.service.update_user", skip(self), fields(user_id = %id))]
    pub async fn update_user(&self, id: u64, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");

        let user = self
            .repo
            .update(id, patch)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?
            .ok_or_else(|| DomainError::user_not_found(id))?;

        info!("Successfully updated user");
        Ok(user)
    }

    #[instrument(name = "users_info.service.delete_user", skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: u64) -> Result<(), DomainError> {
        info!("Deleting user");

        let deleted = self
            .repo
            .delete(id)
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?;

        if !deleted {
            return Err(DomainError::user_not_found(id));
        }

        info!("Successfully deleted user");
        Ok(())
    }

    /// Number of stored users.
    pub async fn count_users(&self) -> Result<usize, DomainError> {
        self.repo
            .count()
            .await
            .map_err(|e| DomainError::storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryUsersRepository;

    fn service() -> Service {
        Service::new(Arc::new(InMemoryUsersRepository::new()))
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@x.com"),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_timestamp() {
        let svc = service();
        let before = Utc::now();

        let a = svc.create_user(new_user("a")).await.unwrap();
        let b = svc.create_user(new_user("b")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.created_at >= before);
        assert_eq!(svc.list_users().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn missing_user_yields_not_found() {
        let svc = service();

        let err = svc.get_user(42).await.unwrap_err();
        assert!(matches!(err, DomainError::UserNotFound { id: 42 }));
        assert_eq!(err.to_string(), "User 42 doesn't exist");

        assert!(matches!(
            svc.delete_user(42).await,
            Err(DomainError::UserNotFound { id: 42 })
        ));
        assert!(matches!(
            svc.update_user(42, UserPatch::default()).await,
            Err(DomainError::UserNotFound { id: 42 })
        ));
    }

    #[tokio::test]
    async fn update_changes_only_whitelisted_fields() {
        let svc = service();
        let created = svc.create_user(new_user("a")).await.unwrap();

        let updated = svc
            .update_user(
                created.id,
                UserPatch {
                    username: Some("b".into()),
                    email: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "b");
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(svc.get_user(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_and_ids_are_not_reused() {
        let svc = service();
        let a = svc.create_user(new_user("a")).await.unwrap();
        let b = svc.create_user(new_user("b")).await.unwrap();

        svc.delete_user(b.id).await.unwrap();
        assert_eq!(svc.list_users().await.unwrap(), vec![a.clone()]);
        assert_eq!(svc.count_users().await.unwrap(), 1);

        let c = svc.create_user(new_user("c")).await.unwrap();
        assert_eq!(c.id, 3);
        assert_ne!(c.id, a.id);
    }
}
