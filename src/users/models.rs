//! User data models

use serde::{Deserialize, Serialize};

/// Store-assigned user identifier
pub type UserId = i64;

/// A persisted user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Assigned by the store on first save, never changed afterwards
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
}

impl User {
    /// Build an unsaved user from request fields
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Request body for creating or updating a user
///
/// An `id` sent by the client is ignored: it comes from the store on
/// create and from the path on update.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub email: String,
}

impl From<UserInput> for User {
    fn from(input: UserInput) -> Self {
        User::new(input.name, input.email)
    }
}
