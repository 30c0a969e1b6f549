//! PostgreSQL implementation of UserStore.
//!
//! Maps users onto a `users (id BIGSERIAL, name TEXT, email TEXT)` table.

use crate::store::traits::UserStore;
use crate::users::models::{User, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
    })
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, email FROM users")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load user {}", id))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn save(&self, user: User) -> Result<User> {
        let row = match user.id {
            None => sqlx::query(
                "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email",
            )
            .bind(&user.name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert user")?,
            Some(id) => sqlx::query(
                r#"
                INSERT INTO users (id, name, email) VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
                RETURNING id, name, email
                "#,
            )
            .bind(id)
            .bind(&user.name)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to save user {}", id))?,
        };
        user_from_row(&row)
    }

    async fn delete_by_id(&self, id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;
        Ok(())
    }
}
