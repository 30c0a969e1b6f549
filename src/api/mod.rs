//! HTTP API for user CRUD and the live user stream

pub mod handlers;
pub mod routes;
pub mod stream_handlers;

pub use routes::create_router;
