//! Reinitialize-and-retry wrapper for services that fail transiently.
//!
//! Some backends (out-of-process servers in particular) occasionally drop
//! their state and fail every call until recreated. [`ResilientService`] owns
//! the instance and a factory for it; when a call fails with an error the
//! [`RetryPolicy`] whitelists, the instance is rebuilt and the call repeated.
//! Errors outside the whitelist propagate untouched.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use prism_core::config::ResilienceConfig;
use prism_core::logging::LogCategory;
use prism_core::{prism_debug, prism_warn};

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Which failures justify a reinit, and how many times.
pub struct RetryPolicy<E> {
    whitelist: Vec<(String, Predicate<E>)>,
    max_retries: u32,
}

impl<E> RetryPolicy<E> {
    /// Empty whitelist, one retry.
    pub fn new() -> Self {
        Self {
            whitelist: Vec::new(),
            max_retries: 1,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new().max_retries(config.max_retries)
    }

    /// Add a named whitelist entry.
    pub fn retry_on<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.whitelist.push((name.into(), Box::new(predicate)));
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Name of the first whitelist entry matching `error`.
    pub fn matches(&self, error: &E) -> Option<&str> {
        self.whitelist
            .iter()
            .find(|(_, predicate)| predicate(error))
            .map(|(name, _)| name.as_str())
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field(
                "whitelist",
                &self.whitelist.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

type Factory<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// A service instance that is rebuilt on whitelisted failures.
///
/// Calls are serialized through an internal lock.
pub struct ResilientService<T, E> {
    name: String,
    factory: Factory<T, E>,
    policy: RetryPolicy<E>,
    instance: Mutex<T>,
    reinits: AtomicU64,
}

impl<T, E: fmt::Display> ResilientService<T, E> {
    /// Build the first instance immediately; its failure is returned as-is.
    pub fn new<F>(name: impl Into<String>, factory: F, policy: RetryPolicy<E>) -> Result<Self, E>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let instance = factory()?;
        Ok(Self {
            name: name.into(),
            factory: Box::new(factory),
            policy,
            instance: Mutex::new(instance),
            reinits: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Times the instance has been rebuilt
    pub fn reinit_count(&self) -> u64 {
        self.reinits.load(Ordering::Relaxed)
    }

    /// Run `op` against the instance, rebuilding and retrying on whitelisted errors.
    pub fn call<R, F>(&self, mut op: F) -> Result<R, E>
    where
        F: FnMut(&mut T) -> Result<R, E>,
    {
        let mut instance = self.instance.lock();
        let mut attempt = 0;
        loop {
            let error = match op(&mut *instance) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let Some(entry) = self.policy.matches(&error) else {
                prism_debug!(
                    LogCategory::Services,
                    "{}: non-retryable failure: {}",
                    self.name,
                    error
                );
                return Err(error);
            };
            if attempt >= self.policy.max_retries {
                prism_warn!(
                    LogCategory::Services,
                    "{}: giving up after {} retries: {}",
                    self.name,
                    attempt,
                    error
                );
                return Err(error);
            }

            attempt += 1;
            prism_warn!(
                LogCategory::Services,
                "{}: '{}' failure ({}), reinitializing (attempt {}/{})",
                self.name,
                entry,
                error,
                attempt,
                self.policy.max_retries
            );
            *instance = (self.factory)()?;
            self.reinits.fetch_add(1, Ordering::Relaxed);
        }
    }
}
