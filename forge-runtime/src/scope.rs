//! Lexical scopes

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{lock, Value};

/// Shared handle to one scope in a chain
#[derive(Clone, Default)]
pub struct Env(Arc<Mutex<Scope>>);

#[derive(Default)]
struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Env {
    /// A scope with no parent
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(parent: &Env) -> Self {
        Env(Arc::new(Mutex::new(Scope { vars: HashMap::new(), parent: Some(parent.clone()) })))
    }

    /// Bind `name` in this scope, shadowing any outer binding
    pub fn define(&self, name: &str, value: Value) {
        lock(&self.0).vars.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        let mut current = self.clone();
        loop {
            let parent = {
                let scope = lock(&current.0);
                if let Some(value) = scope.vars.get(name) {
                    return Ok(value.clone());
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(RuntimeError::NameError(name.to_string())),
            }
        }
    }

    /// Rebind the nearest existing `name`
    pub fn assign(&self, name: &str, value: Value) -> RuntimeResult<()> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut scope = lock(&current.0);
                if let Some(slot) = scope.vars.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(RuntimeError::NameError(name.to_string())),
            }
        }
    }
}
