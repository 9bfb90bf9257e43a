//! Command and callback registries
//!
//! Filled once at startup, then moved into the router and never mutated again,
//! so lookups need no locking.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::handler::{Handler, SharedHandler};
use crate::core::error::{AppError, AppResult};

/// Callback tokens that have a registered handler
#[derive(Debug, Clone, Default)]
pub struct CallbackTokenSet {
    tokens: BTreeSet<String>,
}

impl CallbackTokenSet {
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn insert(&mut self, token: &str) {
        self.tokens.insert(token.to_string());
    }
}

/// Dispatch tables keyed by command name and by callback token
#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, SharedHandler>,
    callbacks: HashMap<String, SharedHandler>,
    tokens: CallbackTokenSet,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a text command (name without the leading slash).
    ///
    /// A second registration of the same name is a startup error.
    pub fn register_command<H>(&mut self, name: &str, handler: H) -> AppResult<()>
    where
        H: Handler + 'static,
    {
        insert_unique(&mut self.commands, "command", name, Arc::new(handler))
    }

    /// Registers a callback token and records it in the token set.
    pub fn register_callback<H>(&mut self, token: &str, handler: H) -> AppResult<()>
    where
        H: Handler + 'static,
    {
        insert_unique(&mut self.callbacks, "callback", token, Arc::new(handler))?;
        self.tokens.insert(token);
        Ok(())
    }

    pub fn resolve_command(&self, name: &str) -> Option<SharedHandler> {
        self.commands.get(name).cloned()
    }

    pub fn resolve_callback(&self, token: &str) -> Option<SharedHandler> {
        self.callbacks.get(token).cloned()
    }

    pub fn callback_tokens(&self) -> &CallbackTokenSet {
        &self.tokens
    }
}

fn insert_unique(
    table: &mut HashMap<String, SharedHandler>,
    registry: &'static str,
    key: &str,
    handler: SharedHandler,
) -> AppResult<()> {
    if key.is_empty() {
        return Err(AppError::Validation(format!("empty {} key", registry)));
    }
    if table.contains_key(key) {
        return Err(AppError::DuplicateKey {
            registry,
            key: key.to_string(),
        });
    }
    table.insert(key.to_string(), handler);
    Ok(())
}
