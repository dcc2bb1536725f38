//! User Service - validation and normalization in front of the repository

use std::sync::Arc;
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserInput};
use crate::repository::UserRepository;

/// Service layer for User business logic
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// List all users in insertion order
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repository.list().await
    }

    /// Get a user by ID
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: u64) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Create a new user
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: UserInput) -> UserResult<User> {
        let fields = input.normalize()?;
        self.repository.create(fields).await
    }

    /// Update a user.
    ///
    /// An unknown id is reported before the body is validated.
    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: u64, input: UserInput) -> UserResult<User> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        let fields = input.normalize()?;
        self.repository.update(id, fields).await
    }

    /// Delete a user
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: u64) -> UserResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserFields;
    use crate::repository::MockUserRepository;
    use chrono::Utc;

    fn stored(id: u64, name: &str, email: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_passes_normalized_fields() {
        let mut repo = MockUserRepository::new();
        repo.expect_create()
            .withf(|f: &UserFields| f.name == "Ana" && f.email == "ana@x.com")
            .times(1)
            .returning(|f| Ok(stored(1, &f.name, &f.email)));

        let service = UserService::new(repo);
        let user = service
            .create_user(UserInput::new(" Ana ", "ANA@X.com"))
            .await
            .unwrap();

        assert_eq!(user.email, "ana@x.com");
    }

    #[tokio::test]
    async fn test_create_with_invalid_input_never_reaches_repository() {
        let mut repo = MockUserRepository::new();
        repo.expect_create().never();

        let service = UserService::new(repo);
        let result = service.create_user(UserInput::new("Ana", "no-at-sign")).await;

        assert!(matches!(result, Err(UserError::InvalidEmail)));
    }

    #[tokio::test]
    async fn test_update_unknown_id_wins_over_invalid_body() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));
        repo.expect_update().never();

        let service = UserService::new(repo);
        let result = service.update_user(42, UserInput::default()).await;

        assert!(matches!(result, Err(UserError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_update_validates_existing_user_body() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Some(stored(id, "Ana", "ana@x.com"))));
        repo.expect_update().never();

        let service = UserService::new(repo);
        let result = service.update_user(1, UserInput::new("", "ana@x.com")).await;

        assert!(matches!(result, Err(UserError::MissingFields)));
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let service = UserService::new(repo);
        assert!(matches!(
            service.delete_user(3).await,
            Err(UserError::NotFound(3))
        ));
    }

    #[tokio::test]
    async fn test_repository_errors_propagate() {
        let mut repo = MockUserRepository::new();
        repo.expect_list()
            .returning(|| Err(UserError::Internal("storage offline".into())));

        let service = UserService::new(repo);
        assert!(matches!(
            service.list_users().await,
            Err(UserError::Internal(_))
        ));
    }
}
