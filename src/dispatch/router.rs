//! Update router
//!
//! Classifies every inbound update and sends it down exactly one path:
//! pending-operation resolution, command, question intake, or callback.
//! Each update runs in its own task with a bounded context, so a slow or
//! panicking handler never stalls the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::context::UpdateContext;
use super::handler::{Handler, PendingResolver, Resolution};
use super::intake::{QuestionIntake, QuestionJob};
use super::pending::{PendingKind, PendingOperation, PendingStore};
use super::ports::{ErrorNotifier, Messenger, UserStore};
use super::registry::{CallbackTokenSet, Registry};
use super::update::{CallbackPress, IncomingMessage, Update};
use crate::core::error::{AppError, AppResult};

/// Command that abandons a pending operation
pub const CANCEL_COMMAND: &str = "cancel";

/// Collaborators shared by every update
#[derive(Clone)]
pub struct RouterDeps {
    pub users: Arc<dyn UserStore>,
    pub messenger: Arc<dyn Messenger>,
    pub notifier: Arc<dyn ErrorNotifier>,
    pub pending: Arc<PendingStore>,
    pub intake: QuestionIntake,
    pub update_timeout: Duration,
}

pub struct Router {
    deps: RouterDeps,
    registry: Registry,
    resolvers: HashMap<PendingKind, Arc<dyn PendingResolver>>,
}

impl Router {
    pub fn new(deps: RouterDeps) -> Self {
        Self {
            deps,
            registry: Registry::new(),
            resolvers: HashMap::new(),
        }
    }

    pub fn register_command<H: Handler + 'static>(&mut self, name: &str, handler: H) -> AppResult<()> {
        self.registry.register_command(name, handler)
    }

    pub fn register_callback<H: Handler + 'static>(&mut self, token: &str, handler: H) -> AppResult<()> {
        self.registry.register_callback(token, handler)
    }

    /// Installs the resolver for one pending-operation kind; each kind takes one resolver
    pub fn register_resolver(&mut self, kind: PendingKind, resolver: Arc<dyn PendingResolver>) -> AppResult<()> {
        if self.resolvers.contains_key(&kind) {
            return Err(AppError::DuplicateKey {
                registry: "resolver",
                key: kind.to_string(),
            });
        }
        self.resolvers.insert(kind, resolver);
        Ok(())
    }

    pub fn callback_tokens(&self) -> &CallbackTokenSet {
        self.registry.callback_tokens()
    }

    /// Consumes updates until shutdown or until the source closes.
    ///
    /// Returns `Cancelled` or `SourceClosed`; updates already dispatched keep
    /// running but see their context cancelled.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::Receiver<Update>, shutdown: CancellationToken) -> AppError {
        log::info!("Router started with {} callback tokens", self.registry.callback_tokens().len());

        loop {
            let update = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    log::info!("Router stopping: shutdown requested");
                    return AppError::Cancelled;
                }
                update = updates.recv() => match update {
                    Some(update) => update,
                    None => {
                        log::warn!("Router stopping: update source closed");
                        return AppError::SourceClosed;
                    }
                },
            };

            let router = Arc::clone(&self);
            let cx = UpdateContext::new(self.deps.update_timeout, shutdown.child_token());
            tokio::spawn(async move {
                router.dispatch_in(cx, update).await;
            });
        }
    }

    /// Handles one update to completion with a fresh context
    pub async fn dispatch(&self, update: Update) {
        let cx = UpdateContext::detached(self.deps.update_timeout);
        self.dispatch_in(cx, update).await;
    }

    async fn dispatch_in(&self, cx: UpdateContext, update: Update) {
        let user_id = update.user_id();
        let res = std::panic::AssertUnwindSafe(self.route(cx, update)).catch_unwind().await;

        if let Err(payload) = res {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Handler panicked while processing update from {:?}: {}", user_id, reason);
        }
    }

    async fn route(&self, cx: UpdateContext, update: Update) {
        match &update {
            Update::Message(message) => self.on_message(cx, message.clone(), &update).await,
            Update::Callback(press) => self.on_callback(cx, press, &update).await,
            Update::Unsupported => log::debug!("Ignoring unsupported update"),
        }
    }

    async fn on_message(&self, cx: UpdateContext, message: IncomingMessage, update: &Update) {
        let user_id = message.from.id;

        // A pending entry must not outlive the message that would have consumed it
        if let Err(e) = cx.bounded(self.deps.users.ensure_user(&message.from)).await {
            log::error!("Failed to register user {}: {}", user_id, e);
            if let Some(op) = self.deps.pending.take(user_id) {
                log::warn!("Dropped pending {} of user {}", op.kind, user_id);
            }
            return;
        }

        let Some(text) = message.text.clone() else {
            log::debug!("Ignoring non-text message from {}", user_id);
            return;
        };
        log::info!("[{}] {}", message.from.label(), text);

        if let Some(op) = self.deps.pending.take(user_id) {
            match self.resolvers.get(&op.kind) {
                Some(resolver) => {
                    self.finish_pending(&cx, resolver.as_ref(), op, message, update).await;
                    return;
                }
                None => log::warn!("No resolver for pending {} of user {}", op.kind, user_id),
            }
        }

        // Only registered control commands are handled; any other text is a question
        if let Some(handler) = message.command().and_then(|name| self.registry.resolve_command(name)) {
            let res = cx.bounded(handler.handle(cx.clone(), update.clone())).await;
            self.report(update, res).await;
            return;
        }

        let job = QuestionJob {
            user_id,
            chat_id: message.chat_id,
            text,
        };
        if let Err(e) = self.deps.intake.submit(job) {
            log::error!("Question from {} was not queued: {}", user_id, e);
        }
    }

    async fn finish_pending(
        &self,
        cx: &UpdateContext,
        resolver: &dyn PendingResolver,
        op: PendingOperation,
        message: IncomingMessage,
        update: &Update,
    ) {
        let chat_id = message.chat_id;
        let reply = message.id;

        let resolution = if message.command() == Some(CANCEL_COMMAND) {
            Ok(Resolution::Cancelled)
        } else {
            cx.bounded(resolver.resolve(cx.clone(), message)).await
        };

        match resolution {
            Ok(Resolution::Completed) => {
                self.clear_prompt(cx, chat_id, op, reply).await;
                let (text, menu) = resolver.completion();
                let edited = cx
                    .bounded(self.deps.messenger.edit_message(chat_id, op.origin, Some(&menu), &text))
                    .await;
                if let Err(e) = edited {
                    log::error!("Failed to show result of {} in chat {}: {}", op.kind, chat_id, e);
                }
            }
            Ok(Resolution::Cancelled) => {
                log::info!("Pending {} cancelled in chat {}", op.kind, chat_id);
                self.clear_prompt(cx, chat_id, op, reply).await;
            }
            Err(e) => self.report(update, Err(e)).await,
        }
    }

    // Prompt and reply are cosmetic; a failed delete does not undo the operation
    async fn clear_prompt(&self, cx: &UpdateContext, chat_id: ChatId, op: PendingOperation, reply: MessageId) {
        for id in [op.prompt, reply] {
            if let Err(e) = cx.bounded(self.deps.messenger.delete_message(chat_id, id)).await {
                log::warn!("Failed to delete message {} in chat {}: {}", id.0, chat_id, e);
            }
        }
    }

    async fn on_callback(&self, cx: UpdateContext, press: &CallbackPress, update: &Update) {
        let Some(token) = press.data.as_deref() else {
            log::debug!("Callback without data from {}", press.from.id);
            return;
        };
        log::info!("[{}] {}", press.from.label(), token);

        let Some(handler) = self.registry.resolve_callback(token) else {
            log::warn!("Unknown callback token {:?} from {}", token, press.from.id);
            return;
        };

        let res = cx.bounded(handler.handle(cx.clone(), update.clone())).await;
        self.report(update, res).await;
    }

    async fn report(&self, update: &Update, res: AppResult<()>) {
        let Err(e) = res else {
            return;
        };
        match e {
            AppError::Cancelled => log::debug!("Update from {:?} cancelled by shutdown", update.user_id()),
            e => {
                log::error!("Handler failed for update from {:?}: {}", update.user_id(), e);
                self.deps.notifier.notify(update, &e).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::intake::IntakeConfig;
    use crate::dispatch::menu::{Button, Menu};
    use crate::dispatch::ports::Role;
    use crate::testing::{
        callback_press, text_message, GatewayCall, MemoryQuestionStore, MemoryUserStore, RecordingMessenger,
        RecordingNotifier,
    };
    use pretty_assertions::assert_eq;

    struct Fixture {
        users: Arc<MemoryUserStore>,
        questions: Arc<MemoryQuestionStore>,
        messenger: Arc<RecordingMessenger>,
        notifier: Arc<RecordingNotifier>,
        pending: Arc<PendingStore>,
        router: Router,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let questions = Arc::new(MemoryQuestionStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let pending = Arc::new(PendingStore::new());
        let (intake, _pool) = QuestionIntake::start(
            questions.clone(),
            messenger.clone(),
            IntakeConfig {
                workers: 2,
                capacity: 16,
                job_timeout: Duration::from_secs(5),
            },
            CancellationToken::new(),
        );
        let router = Router::new(RouterDeps {
            users: users.clone(),
            messenger: messenger.clone(),
            notifier: notifier.clone(),
            pending: pending.clone(),
            intake,
            update_timeout: Duration::from_secs(5),
        });
        Fixture {
            users,
            questions,
            messenger,
            notifier,
            pending,
            router,
        }
    }

    async fn exploding(_cx: UpdateContext, _update: Update) -> AppResult<()> {
        panic!("handler exploded");
    }

    async fn failing(_cx: UpdateContext, _update: Update) -> AppResult<()> {
        Err(AppError::Server("db down".to_string()))
    }

    struct FixedResolver(AppResult<Resolution>);

    #[async_trait::async_trait]
    impl PendingResolver for FixedResolver {
        async fn resolve(&self, _cx: UpdateContext, _message: IncomingMessage) -> AppResult<Resolution> {
            match &self.0 {
                Ok(r) => Ok(*r),
                Err(_) => Err(AppError::Server("resolver failed".to_string())),
            }
        }

        fn completion(&self) -> (String, Menu) {
            ("done".to_string(), Menu::new(vec![vec![Button::callback("Back", "main_menu")]]))
        }
    }

    async fn greeting(_cx: UpdateContext, _update: Update) -> AppResult<()> {
        Ok(())
    }

    fn pending_op(kind: PendingKind) -> PendingOperation {
        PendingOperation {
            kind,
            prompt: MessageId(101),
            origin: MessageId(55),
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let mut fx = fixture();
        fx.router
            .register_callback("boom", exploding)
            .unwrap();

        fx.router.dispatch(Update::Callback(callback_press(7, 10, "boom"))).await;
        fx.router.dispatch(Update::Callback(callback_press(7, 10, "boom"))).await;

        assert!(fx.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_callback_is_ignored() {
        let fx = fixture();

        fx.router.dispatch(Update::Callback(callback_press(7, 10, "nope"))).await;

        assert!(fx.messenger.calls().is_empty());
        assert!(fx.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_is_notified() {
        let mut fx = fixture();
        fx.router
            .register_callback("fails", failing)
            .unwrap();

        fx.router.dispatch(Update::Callback(callback_press(7, 10, "fails"))).await;

        assert_eq!(fx.notifier.notices().len(), 1);
        assert_eq!(fx.notifier.notices()[0].0, Some(ChatId(7)));
    }

    #[tokio::test]
    async fn test_completed_resolution_clears_prompt_and_edits_origin() {
        let mut fx = fixture();
        fx.router
            .register_resolver(PendingKind::AdminCreate, Arc::new(FixedResolver(Ok(Resolution::Completed))))
            .unwrap();
        fx.pending.set(7, pending_op(PendingKind::AdminCreate));

        fx.router.dispatch(Update::Message(text_message(7, 60, "bob"))).await;

        let (text, menu) = FixedResolver(Ok(Resolution::Completed)).completion();
        assert_eq!(fx.messenger.deleted(), vec![MessageId(101), MessageId(60)]);
        assert_eq!(
            fx.messenger.edits(),
            vec![GatewayCall::Edit {
                chat_id: ChatId(7),
                message_id: MessageId(55),
                text,
                menu: Some(menu),
            }]
        );
        assert!(fx.pending.get(7).is_none());
        assert!(fx.questions.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_resolution_consumes_pending() {
        let mut fx = fixture();
        fx.router.register_resolver(
            PendingKind::AdminDelete,
            Arc::new(FixedResolver(Err(AppError::Server(String::new())))),
        )
        .unwrap();
        fx.pending.set(7, pending_op(PendingKind::AdminDelete));

        fx.router.dispatch(Update::Message(text_message(7, 60, "ghost"))).await;

        assert!(fx.pending.get(7).is_none());
        assert!(fx.messenger.edits().is_empty());
        assert_eq!(fx.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_command_drops_pending_without_resolving() {
        let mut fx = fixture();
        fx.router.register_resolver(
            PendingKind::AdminCreate,
            Arc::new(FixedResolver(Err(AppError::Server(String::new())))),
        )
        .unwrap();
        fx.pending.set(7, pending_op(PendingKind::AdminCreate));

        fx.router.dispatch(Update::Message(text_message(7, 60, "/cancel"))).await;

        assert!(fx.pending.get(7).is_none());
        assert_eq!(fx.messenger.deleted(), vec![MessageId(101), MessageId(60)]);
        assert!(fx.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_pending_without_resolver_falls_through_to_intake() {
        let fx = fixture();
        fx.pending.set(7, pending_op(PendingKind::AdminCreate));

        fx.router.dispatch(Update::Message(text_message(7, 60, "just a question"))).await;

        let rows = fx.questions.wait_for(1).await;
        assert_eq!(rows[0].text, "just a question");
        assert!(fx.pending.get(7).is_none());
    }

    #[tokio::test]
    async fn test_delete_failures_do_not_block_completion() {
        let mut fx = fixture();
        fx.router
            .register_resolver(PendingKind::AdminCreate, Arc::new(FixedResolver(Ok(Resolution::Completed))))
            .unwrap();
        fx.pending.set(7, pending_op(PendingKind::AdminCreate));
        fx.messenger.fail_deletes(true);

        fx.router.dispatch(Update::Message(text_message(7, 60, "bob"))).await;

        assert_eq!(fx.messenger.deleted(), vec![MessageId(101), MessageId(60)]);
        assert_eq!(fx.messenger.edits().len(), 1);
        assert!(fx.notifier.notices().is_empty());
        assert!(fx.pending.get(7).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_resolver_is_rejected() {
        let mut fx = fixture();
        let resolver = Arc::new(FixedResolver(Ok(Resolution::Completed)));
        fx.router.register_resolver(PendingKind::AdminDelete, resolver.clone()).unwrap();

        let err = fx.router.register_resolver(PendingKind::AdminDelete, resolver).unwrap_err();

        assert!(matches!(err, AppError::DuplicateKey { registry: "resolver", .. }));
    }

    #[tokio::test]
    async fn test_unregistered_command_is_stored_as_question() {
        let fx = fixture();

        fx.router.dispatch(Update::Message(text_message(9, 1, "/unknown"))).await;

        assert_eq!(fx.users.role_of(9), Some(Role::User));
        let rows = fx.questions.wait_for(1).await;
        assert_eq!((rows[0].user_id, rows[0].text.as_str()), (9, "/unknown"));
        assert!(fx.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_registered_command_with_arguments_is_a_question() {
        let mut fx = fixture();
        fx.router.register_command("start", failing).unwrap();

        fx.router.dispatch(Update::Message(text_message(9, 1, "/start please"))).await;

        let rows = fx.questions.wait_for(1).await;
        assert_eq!(rows[0].text, "/start please");
        assert!(fx.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_bare_registered_command_skips_intake() {
        let mut fx = fixture();
        fx.router.register_command("start", greeting).unwrap();

        fx.router.dispatch(Update::Message(text_message(9, 1, "/start@QuestionBot"))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(fx.questions.rows().is_empty());
        assert!(fx.users.contains(9));
    }

    #[tokio::test]
    async fn test_non_text_message_still_registers_sender() {
        let fx = fixture();
        let mut photo = text_message(9, 1, "");
        photo.text = None;

        fx.router.dispatch(Update::Message(photo)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fx.users.role_of(9), Some(Role::User));
        assert!(fx.questions.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_registration_stops_processing() {
        let fx = fixture();
        fx.users.fail_ensure(true);

        fx.router.dispatch(Update::Message(text_message(9, 1, "question"))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(fx.questions.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_registration_drops_pending_entry() {
        let mut fx = fixture();
        fx.router
            .register_resolver(PendingKind::AdminCreate, Arc::new(FixedResolver(Ok(Resolution::Completed))))
            .unwrap();
        fx.pending.set(7, pending_op(PendingKind::AdminCreate));
        fx.users.fail_ensure(true);

        fx.router.dispatch(Update::Message(text_message(7, 60, "bob"))).await;

        assert!(fx.pending.get(7).is_none());
        assert!(fx.messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let fx = fixture();
        let (_tx, rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let err = Arc::new(fx.router).run(rx, shutdown).await;

        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_run_stops_when_source_closes() {
        let fx = fixture();
        let (tx, rx) = mpsc::channel(4);
        tx.send(Update::Unsupported).await.unwrap();
        drop(tx);

        let err = Arc::new(fx.router).run(rx, CancellationToken::new()).await;

        assert!(matches!(err, AppError::SourceClosed));
    }
}
