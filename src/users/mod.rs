//! User management: data models and the service orchestrating store and hub

pub mod models;
pub mod service;

pub use models::{User, UserId, UserInput};
pub use service::UserService;

/// Errors surfaced by [`UserService`]
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User {0} not found")]
    NotFound(UserId),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
