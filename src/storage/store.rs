//! SQLite-backed user and question stores
//!
//! rusqlite is blocking, so every call borrows a pooled connection inside
//! `spawn_blocking` and never holds it across an `.await`.

use async_trait::async_trait;
use rusqlite::Connection;

use super::db::{self, DbPool};
use crate::core::error::{AppError, AppResult};
use crate::dispatch::ports::{Question, QuestionStore, Role, User, UserStore};
use crate::dispatch::update::Sender;

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db::get_connection(&pool)?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn ensure_user(&self, user: &Sender) -> AppResult<()> {
        let user = user.clone();
        self.with_conn(move |conn| Ok(db::create_user_if_absent(conn, &user)?)).await
    }

    async fn get_role(&self, user_id: i64) -> AppResult<Role> {
        self.with_conn(move |conn| {
            db::get_user(conn, user_id)?
                .map(|u| u.role)
                .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
        })
        .await
    }

    async fn set_role_by_name(&self, role: Role, username: &str) -> AppResult<()> {
        let username = username.trim().to_string();
        if username.trim_start_matches('@').is_empty() {
            return Err(AppError::Validation("username is empty".to_string()));
        }

        self.with_conn(move |conn| match db::set_role_by_username(conn, role, &username)? {
            0 => Err(AppError::NotFound(format!("username {}", username))),
            updated => {
                log::info!("Role of {} set to {} ({} rows)", username, role, updated);
                Ok(())
            }
        })
        .await
    }

    async fn list_by_role(&self, role: Role) -> AppResult<Vec<User>> {
        self.with_conn(move |conn| Ok(db::users_by_role(conn, role)?)).await
    }
}

#[async_trait]
impl QuestionStore for SqliteStore {
    async fn insert(&self, user_id: i64, text: &str) -> AppResult<()> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("question is empty".to_string()));
        }
        let text = text.to_string();
        self.with_conn(move |conn| {
            let id = db::insert_question(conn, user_id, &text)?;
            log::debug!("Stored question {} from user {}", id, user_id);
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> AppResult<Vec<Question>> {
        self.with_conn(|conn| Ok(db::all_questions(conn)?)).await
    }
}
