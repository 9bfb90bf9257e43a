//! Pending-operation store
//!
//! Remembers, per user, a multi-step admin action that waits for the user's
//! next text message. Entries live only in memory and are consumed at most once.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use strum::{Display, EnumString};
use teloxide::types::MessageId;

/// Kind of follow-up the user is expected to type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum PendingKind {
    /// Grant the admin role to the typed username
    #[strum(serialize = "create")]
    AdminCreate,
    /// Revoke the admin role from the typed username
    #[strum(serialize = "delete")]
    AdminDelete,
}

/// An in-flight admin action awaiting a text reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: PendingKind,
    /// Message that asked the user to type a value
    pub prompt: MessageId,
    /// Menu message that triggered the prompt; edited with the result
    pub origin: MessageId,
}

/// Concurrency-safe map from user id to their pending operation.
///
/// One coarse `RwLock` over the whole map: lookups run in parallel, writes
/// are exclusive. Guards never cross an `.await`.
#[derive(Debug, Default)]
pub struct PendingStore {
    inner: RwLock<HashMap<i64, PendingOperation>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the pending operation of `user_id`
    pub fn set(&self, user_id: i64, op: PendingOperation) {
        if let Some(previous) = self.write().insert(user_id, op) {
            log::debug!("Pending {} for user {} replaced by {}", previous.kind, user_id, op.kind);
        }
    }

    /// Non-destructive lookup
    pub fn get(&self, user_id: i64) -> Option<PendingOperation> {
        self.read().get(&user_id).copied()
    }

    /// Removes any pending operation of `user_id`; idempotent
    pub fn delete(&self, user_id: i64) {
        self.write().remove(&user_id);
    }

    /// Looks up and removes in one step, so an entry is consumed at most once
    pub fn take(&self, user_id: i64) -> Option<PendingOperation> {
        self.write().remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are plain values, so a panic in another holder cannot leave the map
    // half-written; recover the guard instead of propagating the poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<i64, PendingOperation>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Pending store lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<i64, PendingOperation>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Pending store lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }
}
