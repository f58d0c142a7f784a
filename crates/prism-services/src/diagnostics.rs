//! Buffered diagnostic events.
//!
//! Producers publish events whether or not anyone is listening. Until the
//! first listener attaches, records are kept in a bounded queue (oldest
//! dropped first); the first subscriber receives that backlog in order before
//! any live event.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use prism_core::config::DiagnosticsConfig;
use prism_core::logging::LogCategory;
use prism_core::{prism_debug_rate_limited, prism_warn};

/// Severity attached to a binding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceLevel {
    Critical,
    Error,
    Warning,
    Information,
}

/// A diagnostic event raised by the framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    /// A data binding could not be resolved or transferred
    BindingFailed {
        code: u32,
        level: TraceLevel,
        message: String,
        params: Vec<String>,
    },
    ResourceDictionaryLoaded {
        source: String,
    },
    ResourceDictionaryUnloaded {
        source: String,
    },
    /// A static resource lookup was satisfied from `source`
    StaticResourceResolved {
        key: String,
        source: String,
    },
}

/// An event stamped with its publication time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub event: DiagnosticEvent,
    pub recorded_at: DateTime<Utc>,
}

struct Listener {
    id: u64,
    callback: Box<dyn Fn(&DiagnosticRecord) + Send + Sync>,
    // Live events arriving while the backlog is still being flushed.
    inbox: Mutex<Inbox>,
}

struct Inbox {
    flushing: bool,
    queued: VecDeque<DiagnosticRecord>,
}

impl Listener {
    /// Deliver now, or queue behind the backlog if it is still flushing.
    /// No lock is held while the callback runs.
    fn deliver(&self, record: &DiagnosticRecord) {
        {
            let mut inbox = self.inbox.lock();
            if inbox.flushing {
                inbox.queued.push_back(record.clone());
                return;
            }
        }
        (self.callback)(record);
    }

    /// Drain records queued during the flush, then switch to live delivery.
    fn finish_flush(&self) {
        loop {
            let next = {
                let mut inbox = self.inbox.lock();
                match inbox.queued.pop_front() {
                    Some(record) => record,
                    None => {
                        inbox.flushing = false;
                        return;
                    }
                }
            };
            (self.callback)(&next);
        }
    }
}

struct HubState {
    pending: VecDeque<DiagnosticRecord>,
    listeners: Vec<Arc<Listener>>,
}

/// Event hub that buffers until a listener attaches.
pub struct DiagnosticsHub {
    config: DiagnosticsConfig,
    state: Mutex<HubState>,
    dropped: AtomicUsize,
    next_listener_id: AtomicU64,
}

impl DiagnosticsHub {
    pub fn new(config: DiagnosticsConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(HubState {
                pending: VecDeque::new(),
                listeners: Vec::new(),
            }),
            dropped: AtomicUsize::new(0),
            next_listener_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Record an event.
    ///
    /// Listeners run on the publishing thread with no hub or listener lock
    /// held, so a callback may publish again from any thread.
    pub fn publish(&self, event: DiagnosticEvent) {
        if !self.config.enabled {
            return;
        }

        let record = DiagnosticRecord {
            event,
            recorded_at: Utc::now(),
        };

        let listeners: Vec<Arc<Listener>> = {
            let mut state = self.state.lock();
            if state.listeners.is_empty() {
                self.buffer(&mut state.pending, record);
                return;
            }
            state.listeners.clone()
        };

        for listener in listeners {
            listener.deliver(&record);
        }
    }

    fn buffer(&self, pending: &mut VecDeque<DiagnosticRecord>, record: DiagnosticRecord) {
        let cap = self.config.max_pending_events;
        if cap == 0 {
            self.note_dropped();
            return;
        }
        while pending.len() >= cap {
            pending.pop_front();
            self.note_dropped();
        }
        pending.push_back(record);
    }

    fn note_dropped(&self) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        prism_debug_rate_limited!(
            LogCategory::Diagnostics,
            "diagnostic backlog full, {} events dropped so far",
            dropped
        );
    }

    /// Attach a listener. It first receives the buffered backlog, then live events.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&DiagnosticRecord) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener {
            id,
            callback: Box::new(listener),
            inbox: Mutex::new(Inbox {
                flushing: true,
                queued: VecDeque::new(),
            }),
        });

        // Registered in flushing mode: live events published from here on
        // wait in the inbox until the backlog has been handed over.
        let backlog: Vec<DiagnosticRecord> = {
            let mut state = self.state.lock();
            state.listeners.push(listener.clone());
            state.pending.drain(..).collect()
        };

        if !backlog.is_empty() {
            prism_debug_rate_limited!(
                LogCategory::Diagnostics,
                "flushing {} buffered diagnostic events",
                backlog.len()
            );
        }
        for record in &backlog {
            (listener.callback)(record);
        }
        listener.finish_flush();

        Subscription {
            hub: Arc::downgrade(self),
            id,
        }
    }

    /// Records waiting for a listener
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Records discarded because the backlog was full
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.state.lock().listeners.retain(|l| l.id != id);
    }
}

/// Keeps a listener attached; dropping it detaches.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    hub: Weak<DiagnosticsHub>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

static HUB: OnceLock<Arc<DiagnosticsHub>> = OnceLock::new();

/// Process-wide hub; configured from the global config manager when present.
pub fn hub() -> &'static Arc<DiagnosticsHub> {
    HUB.get_or_init(|| {
        let config = prism_core::config::get_config_manager()
            .map(|m| m.get_config().diagnostics)
            .unwrap_or_default();
        DiagnosticsHub::new(config)
    })
}

/// Create the process-wide hub with `config`.
///
/// The hub is created once. If it already exists with a different
/// configuration, `config` is discarded and a warning is logged.
pub fn init_hub(config: DiagnosticsConfig) -> &'static Arc<DiagnosticsHub> {
    let mut created = false;
    let hub = HUB.get_or_init(|| {
        created = true;
        DiagnosticsHub::new(config.clone())
    });
    if !created && hub.config() != &config {
        prism_warn!(
            LogCategory::Diagnostics,
            "diagnostics hub already initialized (enabled: {}, backlog: {}); ignoring new configuration",
            hub.config().enabled,
            hub.config().max_pending_events
        );
    }
    hub
}
