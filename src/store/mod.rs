//! Persistence for user records
//!
//! `UserStore` is the abstract interface; `MemoryUserStore` keeps records in
//! process and `PostgresUserStore` maps them onto a `users` table.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryUserStore;
pub use postgres::PostgresUserStore;
pub use traits::UserStore;
