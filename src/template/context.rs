//! Render context: variable scopes, the top-level render target and the
//! dependent path used for dependency tracing.
//!
//! ```text
//! get("page.title")
//!   1. local scopes, innermost first   (for-loop vars, include params)
//!   2. globals                         (site, config keys)
//!   3. environment.get("page")         (document / proxy read interface)
//! ```

use super::{RenderError, Value};
use crate::render::RenderEnv;
use std::collections::BTreeMap;

/// Nested contexts allowed before rendering is abandoned.
pub const MAX_DEPTH: usize = 64;

pub type Scope = BTreeMap<String, Value>;

pub struct RenderContext<'env> {
    pub env: &'env RenderEnv,
    environment: Value,
    scopes: Vec<Scope>,
    dependent: Option<String>,
    depth: usize,
}

impl<'env> RenderContext<'env> {
    pub fn new(env: &'env RenderEnv, environment: Value, dependent: Option<String>) -> Self {
        Self {
            env,
            environment,
            scopes: Vec::new(),
            dependent,
            depth: 0,
        }
    }

    /// Same scopes and dependent, new top-level target.
    pub fn child(&self, environment: Value) -> Result<Self, RenderError> {
        self.nested(environment, self.dependent.clone())
    }

    /// Same target and scopes, new dependent path.
    pub fn with_dependent(&self, dependent: &str) -> Result<Self, RenderError> {
        self.nested(self.environment.clone(), Some(dependent.to_owned()))
    }

    fn nested(&self, environment: Value, dependent: Option<String>) -> Result<Self, RenderError> {
        let depth = self.depth + 1;
        if depth > MAX_DEPTH {
            return Err(RenderError::RecursionLimit(MAX_DEPTH));
        }
        Ok(Self {
            env: self.env,
            environment,
            scopes: self.scopes.clone(),
            dependent,
            depth,
        })
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Set a variable in the innermost scope.
    pub fn set(&mut self, name: &str, value: Value) {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), value);
        }
    }

    pub const fn environment(&self) -> &Value {
        &self.environment
    }

    pub fn dependent(&self) -> Option<&str> {
        self.dependent.as_deref()
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Resolve a dotted variable path.
    pub fn get(&mut self, path: &str) -> Result<Value, RenderError> {
        let (head, rest) = path.split_once('.').unwrap_or((path, ""));

        let local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(head))
            .or_else(|| self.env.globals.get(head))
            .cloned();

        let value = match local {
            Some(value) => value,
            None => {
                let environment = self.environment.clone();
                environment.get_key(head, self)?
            }
        };

        if rest.is_empty() || value.is_nil() {
            Ok(value)
        } else {
            value.get_path(rest, self)
        }
    }

    /// Record that the current dependent read `path`.
    pub fn trace(&self, path: &str) -> Result<(), RenderError> {
        self.env.dependencies.trace(path, self.dependent())?;
        Ok(())
    }
}
