//! Registry of form configuration factories.
//!
//! The registry is an explicit object: pages receive it by reference rather
//! than reaching for global state. Factories take a context `C` carrying the
//! dependencies their validators need (an email lookup, for example) and
//! produce a fresh [`FormConfiguration`] on every call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{FormError, Result};
use crate::schema::FormConfiguration;

/// A function producing a form configuration from its context.
pub type ConfigFactory<C> = Arc<dyn Fn(&C) -> Result<FormConfiguration> + Send + Sync>;

/// Maps form identifiers to configuration factories.
pub struct FormRegistry<C = ()> {
    factories: HashMap<String, ConfigFactory<C>>,
}

impl<C> Default for FormRegistry<C> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for FormRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl<C> FormRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any previous one for the same id.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&C) -> Result<FormConfiguration> + Send + Sync + 'static,
    {
        let id = id.into();
        debug!(form = %id, "Registering form configuration");
        self.factories.insert(id, Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&C) -> Result<FormConfiguration> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    /// Invokes the factory registered for `id`.
    ///
    /// Fails with [`FormError::ConfigNotFound`] when nothing is registered.
    pub fn resolve(&self, id: &str, context: &C) -> Result<FormConfiguration> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| FormError::ConfigNotFound(id.to_string()))?;
        factory(context)
    }

    /// Returns the registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
