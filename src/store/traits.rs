//! UserStore trait definition

use crate::users::models::{User, UserId};
use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface over the user table.
///
/// All operations may suspend on I/O and fail with a storage error.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// List every user, in whatever order the backend returns them
    async fn find_all(&self) -> Result<Vec<User>>;

    /// Get a user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Insert when `user.id` is `None`, otherwise insert-or-replace the row with that id.
    ///
    /// Returns the stored record, including the assigned id.
    async fn save(&self, user: User) -> Result<User>;

    /// Delete a user by ID. Deleting an absent id is not an error.
    async fn delete_by_id(&self, id: UserId) -> Result<()>;
}
