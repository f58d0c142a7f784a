//! Lazily created, reference-counted shared resource.
//!
//! A process typically holds one expensive handle (a loaded engine, a device)
//! and hands out lightweight per-call contexts. Contexts keep the handle
//! alive: releasing the owner's reference only tears the resource down once
//! the last outstanding context is gone.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use prism_core::logging::LogCategory;
use prism_core::prism_debug;

type Factory<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Shared owner of a lazily created `T`.
pub struct SharedResource<T, E> {
    name: String,
    factory: Factory<T, E>,
    slot: RwLock<Option<Arc<T>>>,
    generation: AtomicU64,
}

impl<T, E> SharedResource<T, E> {
    /// Nothing is created until the first [`acquire`](Self::acquire).
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            slot: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Get a context, creating the resource if needed.
    ///
    /// Creation is double-checked: the common path only takes the read lock,
    /// and the factory runs at most once per generation even under contention.
    pub fn acquire(&self) -> Result<ResourceContext<T>, E> {
        if let Some(existing) = self.slot.read().as_ref() {
            return Ok(ResourceContext {
                inner: existing.clone(),
            });
        }

        let mut slot = self.slot.write();
        if let Some(existing) = slot.as_ref() {
            return Ok(ResourceContext {
                inner: existing.clone(),
            });
        }

        let created = Arc::new((self.factory)()?);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        prism_debug!(
            LogCategory::Services,
            "{}: created shared resource (generation {})",
            self.name,
            generation
        );
        *slot = Some(created.clone());
        Ok(ResourceContext { inner: created })
    }

    /// Drop the owner's reference. Outstanding contexts keep the resource
    /// alive; the next `acquire` creates a new one.
    pub fn release(&self) {
        if let Some(resource) = self.slot.write().take() {
            prism_debug!(
                LogCategory::Services,
                "{}: released shared resource, {} contexts still holding it",
                self.name,
                Arc::strong_count(&resource) - 1
            );
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Contexts currently sharing the owned resource
    pub fn active_contexts(&self) -> usize {
        self.slot
            .read()
            .as_ref()
            .map(|r| Arc::strong_count(r) - 1)
            .unwrap_or(0)
    }

    /// Number of times the resource has been created
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T, E> fmt::Debug for SharedResource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedResource")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .field("generation", &self.generation())
            .finish()
    }
}

/// A per-call handle that keeps the shared resource alive.
pub struct ResourceContext<T> {
    inner: Arc<T>,
}

impl<T> ResourceContext<T> {
    /// Whether two contexts refer to the same resource instance
    pub fn same_resource(&self, other: &ResourceContext<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for ResourceContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Deref for ResourceContext<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for ResourceContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceContext").field(&*self.inner).finish()
    }
}
