//! In-memory implementation of UserStore.
//!
//! Used when no database is configured, and as the backend for tests.

use crate::store::traits::UserStore;
use crate::users::models::{User, UserId};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory user table with a monotonically increasing id sequence.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: RwLock<Table>,
}

#[derive(Default)]
struct Table {
    users: BTreeMap<UserId, User>,
    last_id: UserId,
}

impl MemoryUserStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.rows.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        Ok(self.rows.read().await.users.values().cloned().collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.rows.read().await.users.get(&id).cloned())
    }

    async fn save(&self, mut user: User) -> Result<User> {
        let mut table = self.rows.write().await;
        let id = match user.id {
            Some(id) => {
                table.last_id = table.last_id.max(id);
                id
            }
            None => {
                table.last_id += 1;
                table.last_id
            }
        };
        user.id = Some(id);
        table.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_by_id(&self, id: UserId) -> Result<()> {
        self.rows.write().await.users.remove(&id);
        Ok(())
    }
}
