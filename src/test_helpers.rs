//! Test helper factories and mock state builders
#![allow(dead_code)]

use crate::api::handlers::{ServerState, SharedState};
use crate::events::EventHub;
use crate::store::{MemoryUserStore, UserStore};
use crate::users::{User, UserId, UserInput, UserService};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Build a request body
pub fn input(name: &str, email: &str) -> UserInput {
    UserInput {
        name: name.to_string(),
        email: email.to_string(),
    }
}

/// Store whose every operation fails
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        Err(anyhow!("connection refused"))
    }

    async fn find_by_id(&self, _id: UserId) -> Result<Option<User>> {
        Err(anyhow!("connection refused"))
    }

    async fn save(&self, _user: User) -> Result<User> {
        Err(anyhow!("connection refused"))
    }

    async fn delete_by_id(&self, _id: UserId) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

/// Server state over the given store with a default hub
pub fn mock_server_state_with(store: Arc<dyn UserStore>) -> SharedState {
    Arc::new(ServerState {
        users: UserService::new(store, EventHub::default()),
        keep_alive: Duration::from_secs(15),
    })
}

/// Server state over an empty in-memory store
pub fn mock_server_state() -> SharedState {
    mock_server_state_with(Arc::new(MemoryUserStore::new()))
}
