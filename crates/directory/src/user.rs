//! User directory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Contact and address details for one user, as returned by the user
/// directory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetails {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub street1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
}

/// Trait for user contact/address lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetches contact and address details for a user.
    async fn get_user(&self, user_id: UserId) -> Result<UserDetails, DirectoryError>;
}

#[derive(Debug, Default)]
struct InMemoryUserState {
    users: HashMap<UserId, UserDetails>,
    fail_on_get: bool,
}

/// In-memory user directory for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    state: Arc<RwLock<InMemoryUserState>>,
}

impl InMemoryUserDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user's details.
    pub fn insert(&self, details: UserDetails) {
        self.state
            .write()
            .unwrap()
            .users
            .insert(details.user_id, details);
    }

    /// Configures the directory to fail lookups.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, user_id: UserId) -> Result<UserDetails, DirectoryError> {
        let state = self.state.read().unwrap();
        if state.fail_on_get {
            return Err(DirectoryError::Unavailable(
                "user directory offline".to_string(),
            ));
        }
        state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(DirectoryError::UserNotFound(user_id))
    }
}

/// Builds realistic user details for tests across the workspace.
pub fn sample_user(user_id: UserId, name: &str, email: &str) -> UserDetails {
    UserDetails {
        user_id,
        name: name.to_string(),
        email: email.to_string(),
        street1: "215 Clayton St".to_string(),
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        zip: "94117".to_string(),
        country: "US".to_string(),
        phone: "+1 555 341 9393".to_string(),
    }
}
