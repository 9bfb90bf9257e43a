//! In-memory capability doubles

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::error::{AppError, AppResult};
use crate::dispatch::ports::{Question, QuestionStore, ReportArtifact, ReportGenerator, Role, User, UserStore};
use crate::dispatch::update::Sender;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// User store backed by a `HashMap`, with switchable failures
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<i64, User>>,
    role_updates: Mutex<Vec<(Role, String)>>,
    fail_lookups: AtomicBool,
    fail_ensure: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, sender: &Sender, role: Role) {
        lock(&self.users).insert(
            sender.id,
            User {
                id: sender.id,
                username: sender.username.clone(),
                first_name: sender.first_name.clone(),
                last_name: sender.last_name.clone(),
                role,
            },
        );
    }

    pub fn contains(&self, user_id: i64) -> bool {
        lock(&self.users).contains_key(&user_id)
    }

    pub fn role_of(&self, user_id: i64) -> Option<Role> {
        lock(&self.users).get(&user_id).map(|u| u.role)
    }

    /// Every `set_role_by_name` call, matched or not
    pub fn role_updates(&self) -> Vec<(Role, String)> {
        lock(&self.role_updates).clone()
    }

    /// Makes `get_role` fail with a server error
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Makes `ensure_user` fail with a server error
    pub fn fail_ensure(&self, fail: bool) {
        self.fail_ensure.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn ensure_user(&self, user: &Sender) -> AppResult<()> {
        if self.fail_ensure.load(Ordering::SeqCst) {
            return Err(AppError::Server("ensure_user failed".to_string()));
        }
        if !self.contains(user.id) {
            self.insert_user(user, Role::User);
        }
        Ok(())
    }

    async fn get_role(&self, user_id: i64) -> AppResult<Role> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(AppError::Server("lookup failed".to_string()));
        }
        self.role_of(user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
    }

    async fn set_role_by_name(&self, role: Role, username: &str) -> AppResult<()> {
        lock(&self.role_updates).push((role, username.to_string()));
        let wanted = username.trim_start_matches('@').to_lowercase();
        let mut users = lock(&self.users);
        let user = users
            .values_mut()
            .find(|u| u.username.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str()))
            .ok_or_else(|| AppError::NotFound(format!("username {}", username)))?;
        user.role = role;
        Ok(())
    }

    async fn list_by_role(&self, role: Role) -> AppResult<Vec<User>> {
        let mut found: Vec<User> = lock(&self.users).values().filter(|u| u.role == role).cloned().collect();
        found.sort_by_key(|u| u.id);
        Ok(found)
    }
}

/// Question store that wakes waiters on every insert
#[derive(Default)]
pub struct MemoryQuestionStore {
    rows: Mutex<Vec<Question>>,
    inserted: Notify,
    fail_inserts: AtomicBool,
}

impl MemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<Question> {
        lock(&self.rows).clone()
    }

    /// Seeds a row as-is, without waking waiters
    pub fn insert_row(&self, row: Question) {
        lock(&self.rows).push(row);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Waits until at least `count` rows exist
    pub async fn wait_for(&self, count: usize) -> Vec<Question> {
        loop {
            let notified = self.inserted.notified();
            let rows = self.rows();
            if rows.len() >= count {
                return rows;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn insert(&self, user_id: i64, text: &str) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Server("insert failed".to_string()));
        }
        {
            let mut rows = lock(&self.rows);
            let id = rows.len() as i64 + 1;
            rows.push(Question {
                id,
                user_id,
                text: text.to_string(),
            });
        }
        self.inserted.notify_waiters();
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<Question>> {
        Ok(self.rows())
    }
}

/// Report generator that renders rows as `id;user;text` lines in memory
#[derive(Default)]
pub struct StaticReportGenerator {
    owners: Mutex<Vec<String>>,
}

impl StaticReportGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn owners(&self) -> Vec<String> {
        lock(&self.owners).clone()
    }
}

#[async_trait]
impl ReportGenerator for StaticReportGenerator {
    async fn generate_report(&self, rows: &[Question], owner_label: &str) -> AppResult<ReportArtifact> {
        lock(&self.owners).push(owner_label.to_string());
        let body: String = rows
            .iter()
            .map(|q| format!("{};{};{}\n", q.id, q.user_id, q.text))
            .collect();
        Ok(ReportArtifact {
            file_name: format!("questions_{}.csv", owner_label),
            bytes: body.into_bytes(),
        })
    }
}
