//! Role middleware

use std::sync::Arc;

use async_trait::async_trait;

use super::context::UpdateContext;
use super::handler::Handler;
use super::ports::UserStore;
use super::update::Update;
use crate::core::error::AppResult;

/// Wraps a handler so it only runs for administrators.
///
/// Unknown users and non-admins are a silent no-op; other lookup failures
/// propagate.
pub fn require_admin<H: Handler>(users: Arc<dyn UserStore>, next: H) -> RoleGuard<H> {
    RoleGuard { users, next }
}

pub struct RoleGuard<H> {
    users: Arc<dyn UserStore>,
    next: H,
}

#[async_trait]
impl<H: Handler> Handler for RoleGuard<H> {
    async fn handle(&self, cx: UpdateContext, update: Update) -> AppResult<()> {
        let Some(user_id) = update.user_id() else {
            return Ok(());
        };

        let role = match cx.bounded(self.users.get_role(user_id)).await {
            Ok(role) => role,
            Err(e) if e.is_not_found() => {
                log::debug!("User {} is not registered, skipping admin handler", user_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if role.is_privileged() {
            self.next.handle(cx, update).await
        } else {
            log::debug!("User {} with role {} tried an admin action", user_id, role);
            Ok(())
        }
    }
}
