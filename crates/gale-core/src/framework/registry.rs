//! Subject → handler registry.
//!
//! The registry has two phases. While a server is being configured, a
//! [`Registry`] collects handlers (one per subject, last registration wins).
//! At startup it is compiled together with the middleware chain into a
//! [`HandlerTable`], which is immutable and shared by every dispatch without
//! locking.

use std::collections::HashMap;

use super::handler::HandlerFunc;
use super::middleware::{Middleware, compose};

/// Mutable, pre-start collection of handlers.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<String, HandlerFunc>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `subject`, replacing any previous handler.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn insert(&mut self, subject: impl Into<String>, handler: HandlerFunc) -> bool {
        self.handlers.insert(subject.into(), handler).is_some()
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.handlers.contains_key(subject)
    }

    /// Registered subjects, in unspecified order.
    pub fn subjects(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Wraps every handler in `middleware` and freezes the result.
    ///
    /// The registry itself is left untouched.
    pub fn compile(&self, middleware: &[Middleware]) -> HandlerTable {
        let handlers = self
            .handlers
            .iter()
            .map(|(subject, handler)| (subject.clone(), compose(middleware, handler.clone())))
            .collect();
        HandlerTable { handlers }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("subjects", &self.subjects())
            .finish()
    }
}

/// Immutable lookup structure used during dispatch.
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<String, HandlerFunc>,
}

impl HandlerTable {
    /// Looks up the composed handler for `subject`.
    pub fn get(&self, subject: &str) -> Option<&HandlerFunc> {
        self.handlers.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("len", &self.handlers.len())
            .finish()
    }
}
