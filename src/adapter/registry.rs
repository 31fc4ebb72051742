//! Adapter registry: element kind → behavior.
//!
//! Dispatch is by the closed set of [`ElementTag`] variants, populated at
//! construction. A missing entry is a configuration error surfaced the first
//! time an element of that kind is adapted.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AdapterError, OntolatResult};
use crate::model::{Element, ElementTag};

use super::{AttributeBehavior, ElementBehavior, EntityBehavior, OntologyAdapter, PortBehavior};

#[derive(Default)]
pub struct AdapterRegistry {
    behaviors: HashMap<ElementTag, Arc<dyn ElementBehavior>>,
}

impl AdapterRegistry {
    /// An empty registry. Every element kind must be registered before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard registry covering every built-in element kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let entity: Arc<dyn ElementBehavior> = Arc::new(EntityBehavior);
        registry.register(ElementTag::CompositeEntity, Arc::clone(&entity));
        registry.register(ElementTag::AtomicEntity, entity);
        registry.register(ElementTag::Port, Arc::new(PortBehavior));
        registry.register(ElementTag::Attribute, Arc::new(AttributeBehavior));
        registry
    }

    /// Register (or replace) the behavior for an element kind.
    pub fn register(&mut self, tag: ElementTag, behavior: Arc<dyn ElementBehavior>) {
        self.behaviors.insert(tag, behavior);
    }

    /// Build the adapter for one element.
    pub fn adapter_for(&self, element: &Element) -> OntolatResult<OntologyAdapter> {
        let tag = element.kind.tag();
        let behavior = self.behaviors.get(&tag).ok_or_else(|| {
            AdapterError::NoAdapterForKind {
                kind: tag.to_string(),
            }
        })?;
        Ok(OntologyAdapter::new(element.id, Arc::clone(behavior)))
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("kinds", &self.behaviors.len())
            .finish()
    }
}
