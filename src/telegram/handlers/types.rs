//! Handler dependencies and small helpers shared by views

use std::future::Future;
use std::sync::Arc;

use teloxide::types::{ChatId, MessageId};

use crate::core::error::{AppError, AppResult};
use crate::dispatch::context::UpdateContext;
use crate::dispatch::handler::Handler;
use crate::dispatch::pending::PendingStore;
use crate::dispatch::ports::{Messenger, QuestionStore, ReportGenerator, UserStore};
use crate::dispatch::update::Update;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub users: Arc<dyn UserStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub reports: Arc<dyn ReportGenerator>,
    pub pending: Arc<PendingStore>,
    pub channel_url: Arc<str>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        users: Arc<dyn UserStore>,
        questions: Arc<dyn QuestionStore>,
        messenger: Arc<dyn Messenger>,
        reports: Arc<dyn ReportGenerator>,
        pending: Arc<PendingStore>,
        channel_url: &str,
    ) -> Self {
        Self {
            users,
            questions,
            messenger,
            reports,
            pending,
            channel_url: Arc::from(channel_url),
        }
    }
}

/// Turns `async fn(HandlerDeps, UpdateContext, Update)` into a registrable handler
pub fn bind<F, Fut>(deps: &HandlerDeps, view: F) -> impl Handler
where
    F: Fn(HandlerDeps, UpdateContext, Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    let deps = deps.clone();
    move |cx: UpdateContext, update: Update| view(deps.clone(), cx, update)
}

/// Chat of the update, or a validation error for updates without one
pub fn chat_of(update: &Update) -> AppResult<ChatId> {
    update
        .chat_id()
        .ok_or_else(|| AppError::Validation("update has no chat".to_string()))
}

/// Chat and menu message a button press belongs to
pub fn menu_of(update: &Update) -> AppResult<(ChatId, MessageId)> {
    let press = update
        .callback()
        .ok_or_else(|| AppError::Validation("expected a button press".to_string()))?;
    Ok((press.chat_id, press.message_id))
}

#[cfg(test)]
pub(crate) mod bench {
    use super::*;
    use crate::testing::{MemoryQuestionStore, MemoryUserStore, RecordingMessenger, StaticReportGenerator};

    /// Handler deps wired to in-memory doubles
    pub struct Bench {
        pub users: Arc<MemoryUserStore>,
        pub questions: Arc<MemoryQuestionStore>,
        pub messenger: Arc<RecordingMessenger>,
        pub reports: Arc<StaticReportGenerator>,
        pub pending: Arc<PendingStore>,
        pub deps: HandlerDeps,
    }

    pub fn bench() -> Bench {
        let users = Arc::new(MemoryUserStore::new());
        let questions = Arc::new(MemoryQuestionStore::new());
        let messenger = Arc::new(RecordingMessenger::starting_at(101));
        let reports = StaticReportGenerator::new();
        let pending = Arc::new(PendingStore::new());
        let deps = HandlerDeps::new(
            users.clone(),
            questions.clone(),
            messenger.clone(),
            reports.clone(),
            pending.clone(),
            "https://t.me/MoscowEcon",
        );
        Bench {
            users,
            questions,
            messenger,
            reports,
            pending,
            deps,
        }
    }

    pub fn cx() -> UpdateContext {
        UpdateContext::detached(std::time::Duration::from_secs(5))
    }
}
