//! Messenger and notifier that record interactions instead of sending them

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId};

use crate::core::error::{AppError, AppResult};
use crate::dispatch::menu::Menu;
use crate::dispatch::ports::{ErrorNotifier, Messenger};
use crate::dispatch::update::Update;

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Send {
        chat_id: ChatId,
        text: String,
        menu: Option<Menu>,
    },
    Edit {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        menu: Option<Menu>,
    },
    File {
        chat_id: ChatId,
        file_name: String,
        bytes: Vec<u8>,
        caption: String,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

/// Messenger that hands out increasing message ids and records every call
pub struct RecordingMessenger {
    calls: Mutex<Vec<GatewayCall>>,
    next_id: AtomicI32,
    fail_deletes: AtomicBool,
}

impl RecordingMessenger {
    /// Ids of sent messages start at `first_id`
    pub fn starting_at(first_id: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(first_id),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn new() -> Self {
        Self::starting_at(1000)
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Texts of all `send_message` calls
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<GatewayCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, GatewayCall::Edit { .. }))
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GatewayCall::Delete { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    /// Makes `delete_message` fail (after recording the attempt)
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: GatewayCall) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, chat_id: ChatId, menu: Option<&Menu>, text: &str) -> AppResult<MessageId> {
        self.record(GatewayCall::Send {
            chat_id,
            text: text.to_string(),
            menu: menu.cloned(),
        });
        Ok(self.next_id())
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        menu: Option<&Menu>,
        text: &str,
    ) -> AppResult<MessageId> {
        self.record(GatewayCall::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            menu: menu.cloned(),
        });
        Ok(message_id)
    }

    async fn send_file(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> AppResult<MessageId> {
        self.record(GatewayCall::File {
            chat_id,
            file_name: file_name.to_string(),
            bytes,
            caption: caption.to_string(),
        });
        Ok(self.next_id())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> AppResult<()> {
        self.record(GatewayCall::Delete { chat_id, message_id });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Server(format!("cannot delete {}", message_id.0)));
        }
        Ok(())
    }
}

/// Error notifier that keeps `(chat, error text)` pairs
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(Option<ChatId>, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(Option<ChatId>, String)> {
        match self.notices.lock() {
            Ok(n) => n.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ErrorNotifier for RecordingNotifier {
    async fn notify(&self, update: &Update, err: &AppError) {
        let entry = (update.chat_id(), err.to_string());
        match self.notices.lock() {
            Ok(mut n) => n.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
