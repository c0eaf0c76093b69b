//! Lazily-built descriptor cache keyed by model identity.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;

use super::descriptor::{Model, ModelDescriptor};

/// Read-mostly cache holding one [`ModelDescriptor`] per model type.
///
/// A descriptor is built on first request and shared afterwards; concurrent
/// first requests for the same model build it once.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    descriptors: RwLock<HashMap<TypeId, Arc<ModelDescriptor>>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor of `M`, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates descriptor construction errors; nothing is cached then.
    pub fn descriptor<M: Model>(&self) -> Result<Arc<ModelDescriptor>> {
        let key = TypeId::of::<M>();
        if let Some(md) = self
            .descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(md));
        }

        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(md) = descriptors.get(&key) {
            return Ok(Arc::clone(md));
        }
        let md = Arc::new(ModelDescriptor::from_def(&M::model())?);
        descriptors.insert(key, Arc::clone(&md));
        Ok(md)
    }

    /// Returns the number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no descriptor has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
