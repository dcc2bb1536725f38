use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserFields};

/// Repository trait for User persistence
///
/// Implementations own the id counter and must make the uniqueness check and
/// the write that follows it a single atomic step.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users in insertion order
    async fn list(&self) -> UserResult<Vec<User>>;

    /// Get a user by ID
    async fn get_by_id(&self, id: u64) -> UserResult<Option<User>>;

    /// Store a new user, assigning the next id and the creation timestamp
    async fn create(&self, fields: UserFields) -> UserResult<User>;

    /// Overwrite name and email of an existing user
    async fn update(&self, id: u64, fields: UserFields) -> UserResult<User>;

    /// Delete a user by ID, returning whether it existed
    async fn delete(&self, id: u64) -> UserResult<bool>;
}

#[derive(Debug)]
struct UserTable {
    users: Vec<User>,
    next_id: u64,
}

impl Default for UserTable {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            next_id: 1,
        }
    }
}

impl UserTable {
    fn position(&self, id: u64) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        let email = email.to_lowercase();
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email.to_lowercase() == email)
    }
}

/// In-memory implementation of UserRepository.
///
/// The collection and the id counter live behind one `RwLock`; every mutation
/// holds the write lock from its uniqueness check through the write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self) -> UserResult<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.users.clone())
    }

    async fn get_by_id(&self, id: u64) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, fields: UserFields) -> UserResult<User> {
        let mut table = self.table.write().await;

        if table.email_taken(&fields.email, None) {
            return Err(UserError::DuplicateEmail(fields.email));
        }

        let user = User {
            id: table.next_id,
            name: fields.name,
            email: fields.email,
            created_at: Utc::now(),
            updated_at: None,
        };
        table.next_id += 1;
        table.users.push(user.clone());

        tracing::info!(user_id = user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn update(&self, id: u64, fields: UserFields) -> UserResult<User> {
        let mut table = self.table.write().await;

        let index = table.position(id).ok_or(UserError::NotFound(id))?;

        if table.email_taken(&fields.email, Some(id)) {
            return Err(UserError::DuplicateEmail(fields.email));
        }

        let user = &mut table.users[index];
        user.name = fields.name;
        user.email = fields.email;
        user.updated_at = Some(Utc::now());

        tracing::info!(user_id = id, "Updated user");
        Ok(user.clone())
    }

    async fn delete(&self, id: u64) -> UserResult<bool> {
        let mut table = self.table.write().await;

        match table.position(id) {
            Some(index) => {
                table.users.remove(index);
                tracing::info!(user_id = id, "Deleted user");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
