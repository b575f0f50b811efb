use std::collections::HashMap;

use directive::DirectiveCall;
use serde_json::{Map, Value};

use crate::error::DispatchError;

/// Executes a recovered call against application state.
pub trait Dispatcher {
    fn dispatch(&mut self, call: &DirectiveCall) -> Result<Value, DispatchError>;
}

impl<F> Dispatcher for F
where
    F: FnMut(&DirectiveCall) -> Result<Value, DispatchError>,
{
    fn dispatch(&mut self, call: &DirectiveCall) -> Result<Value, DispatchError> {
        self(call)
    }
}

pub type Handler = Box<dyn FnMut(&Map<String, Value>) -> Result<Value, DispatchError> + Send>;

/// Handlers indexed by directive name.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Handler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: FnMut(&Map<String, Value>) -> Result<Value, DispatchError> + Send + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted handler names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Exact match first, then ASCII case-insensitive.
    fn get_entry(&mut self, name: &str) -> Option<&mut Handler> {
        if self.handlers.contains_key(name) {
            return self.handlers.get_mut(name);
        }
        self.handlers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

impl Dispatcher for Registry {
    fn dispatch(&mut self, call: &DirectiveCall) -> Result<Value, DispatchError> {
        let handler = self
            .get_entry(&call.name)
            .ok_or_else(|| DispatchError::UnknownDirective(call.name.clone()))?;
        handler(&call.arguments)
    }
}
