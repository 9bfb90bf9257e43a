//! Transport-independent update dispatch
//!
//! - `update`: decoded inbound updates
//! - `router`: classification and per-update task spawning
//! - `registry`: command and callback tables
//! - `pending`: per-user multi-step operations
//! - `middleware`: admin role guard
//! - `intake`: bounded question pool

pub mod context;
pub mod handler;
pub mod intake;
pub mod menu;
pub mod middleware;
pub mod pending;
pub mod ports;
pub mod registry;
pub mod router;
pub mod update;

pub use context::UpdateContext;
pub use handler::{Handler, PendingResolver, Resolution, SharedHandler};
pub use pending::{PendingKind, PendingOperation, PendingStore};
pub use router::{Router, RouterDeps};
pub use update::{CallbackPress, IncomingMessage, Sender, Update};
