//! User CRUD operations with creation broadcast

use super::models::{User, UserId, UserInput};
use super::UserError;
use crate::events::EventHub;
use crate::store::UserStore;
use std::sync::Arc;
use tracing::debug;

/// Orchestrates the user store and publishes every created user to the hub.
///
/// Only creation is broadcast. Updates and deletes go to the store and nowhere else.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hub: EventHub<User>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hub: EventHub<User>) -> Self {
        Self { store, hub }
    }

    /// The hub created users are published to
    pub fn hub(&self) -> &EventHub<User> {
        &self.hub
    }

    /// List all users
    pub async fn list_all(&self) -> Result<Vec<User>, UserError> {
        Ok(self.store.find_all().await?)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: UserId) -> Result<User, UserError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    /// Save a new user and broadcast it once the store accepted it.
    pub async fn create(&self, input: UserInput) -> Result<User, UserError> {
        let saved = self.store.save(User::from(input)).await?;

        let subscribers = self.hub.publish(saved.clone());
        debug!(user_id = ?saved.id, subscribers, "User created");

        Ok(saved)
    }

    /// Overwrite name and email of an existing user. Not broadcast.
    pub async fn update(&self, id: UserId, input: UserInput) -> Result<User, UserError> {
        let mut existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        existing.name = input.name;
        existing.email = input.email;

        Ok(self.store.save(existing).await?)
    }

    /// Delete a user by ID. Not broadcast.
    pub async fn delete(&self, id: UserId) -> Result<(), UserError> {
        Ok(self.store.delete_by_id(id).await?)
    }
}
