//! Views registered with the router

pub mod callbacks;
pub mod commands;
pub mod resolvers;
pub mod types;

use std::sync::Arc;

pub use types::HandlerDeps;

use crate::core::error::AppResult;
use crate::dispatch::handler::Handler;
use crate::dispatch::middleware::{require_admin, RoleGuard};
use crate::dispatch::pending::PendingKind;
use crate::dispatch::router::Router;
use crate::telegram::bot::Command;
use crate::telegram::markup::tokens;
use resolvers::AdminRoleResolver;
use types::bind;

/// Registers every command, callback and pending resolver.
///
/// Fails on the first duplicate key.
pub fn register_all(router: &mut Router, deps: &HandlerDeps) -> AppResult<()> {
    router.register_command(Command::Start.name(), bind(deps, commands::start))?;
    router.register_command(Command::Admin.name(), admin_only(deps, bind(deps, commands::admin)))?;
    router.register_command(Command::Cancel.name(), bind(deps, commands::cancel))?;

    router.register_callback(tokens::BOT_SETTING, admin_only(deps, bind(deps, callbacks::export_questions)))?;
    router.register_callback(tokens::MAIN_MENU, admin_only(deps, bind(deps, callbacks::main_menu)))?;
    router.register_callback(tokens::USER_SETTING, admin_only(deps, bind(deps, callbacks::user_setting)))?;
    router.register_callback(tokens::ADMIN_LOOK_UP, admin_only(deps, bind(deps, callbacks::admin_look_up)))?;
    router.register_callback(tokens::ADMIN_SET_ROLE, admin_only(deps, bind(deps, callbacks::admin_set_role)))?;
    router.register_callback(tokens::ADMIN_DELETE_ROLE, admin_only(deps, bind(deps, callbacks::admin_delete_role)))?;

    router.register_resolver(
        PendingKind::AdminCreate,
        Arc::new(AdminRoleResolver::grant(Arc::clone(&deps.users), Arc::clone(&deps.messenger))),
    )?;
    router.register_resolver(
        PendingKind::AdminDelete,
        Arc::new(AdminRoleResolver::revoke(Arc::clone(&deps.users), Arc::clone(&deps.messenger))),
    )?;

    log::info!("Registered {} callback tokens", router.callback_tokens().len());
    Ok(())
}

fn admin_only<H: Handler>(deps: &HandlerDeps, view: H) -> RoleGuard<H> {
    require_admin(Arc::clone(&deps.users), view)
}
