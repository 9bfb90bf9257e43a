//! The single-method handler contract

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::UpdateContext;
use super::menu::Menu;
use super::update::{IncomingMessage, Update};
use crate::core::error::AppResult;

/// Something that can process an update resolved to it.
///
/// Commands, callbacks and decorated handlers all share this contract.
/// Plain async closures taking `(UpdateContext, Update)` implement it too.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cx: UpdateContext, update: Update) -> AppResult<()>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(UpdateContext, Update) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn handle(&self, cx: UpdateContext, update: Update) -> AppResult<()> {
        (self)(cx, update).await
    }
}

/// Shared, type-erased handler as stored in the registries
pub type SharedHandler = Arc<dyn Handler>;

/// How a pending operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The typed value was applied
    Completed,
    /// The user backed out with /cancel
    Cancelled,
}

/// Interprets the text message that answers a pending operation's prompt
#[async_trait]
pub trait PendingResolver: Send + Sync {
    async fn resolve(&self, cx: UpdateContext, message: IncomingMessage) -> AppResult<Resolution>;

    /// Text and menu the origin message is edited to once the operation completes
    fn completion(&self) -> (String, Menu);
}
