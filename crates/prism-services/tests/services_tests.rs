//! Integration tests for the runtime services

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use prism_core::config::DiagnosticsConfig;
use prism_services::{
    DiagnosticEvent, DiagnosticsHub, ResilientService, RetryPolicy, SharedResource, TraceLevel,
};

fn binding_failed(code: u32) -> DiagnosticEvent {
    DiagnosticEvent::BindingFailed {
        code,
        level: TraceLevel::Error,
        message: format!("path error {}", code),
        params: vec!["Name".to_string()],
    }
}

fn codes(events: &[DiagnosticEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            DiagnosticEvent::BindingFailed { code, .. } => Some(*code),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// diagnostics
// ---------------------------------------------------------------------------

#[test]
fn backlog_is_flushed_once_in_order_then_live_events_follow() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig {
        enabled: true,
        max_pending_events: 16,
    });
    for code in 1..=3 {
        hub.publish(binding_failed(code));
    }
    assert_eq!(hub.pending_len(), 3);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = hub.subscribe(move |record| sink.lock().unwrap().push(record.event.clone()));

    assert_eq!(hub.pending_len(), 0);
    hub.publish(binding_failed(4));
    assert_eq!(codes(&seen.lock().unwrap()), vec![1, 2, 3, 4]);

    // A second listener sees only live traffic.
    let late = Arc::new(Mutex::new(Vec::new()));
    let late_sink = late.clone();
    let _late_sub =
        hub.subscribe(move |record| late_sink.lock().unwrap().push(record.event.clone()));
    hub.publish(binding_failed(5));

    assert_eq!(codes(&seen.lock().unwrap()), vec![1, 2, 3, 4, 5]);
    assert_eq!(codes(&late.lock().unwrap()), vec![5]);
}

#[test]
fn backlog_is_bounded_and_drops_oldest() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig {
        enabled: true,
        max_pending_events: 3,
    });
    for code in 1..=5 {
        hub.publish(binding_failed(code));
    }
    assert_eq!(hub.pending_len(), 3);
    assert_eq!(hub.dropped_count(), 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = hub.subscribe(move |record| sink.lock().unwrap().push(record.event.clone()));
    assert_eq!(codes(&seen.lock().unwrap()), vec![3, 4, 5]);
}

#[test]
fn listener_may_publish_from_its_callback() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig::default());
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let inner_hub = hub.clone();
    let _sub = hub.subscribe(move |record| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let DiagnosticEvent::ResourceDictionaryLoaded { source } = &record.event {
            inner_hub.publish(DiagnosticEvent::StaticResourceResolved {
                key: "Accent".to_string(),
                source: source.clone(),
            });
        }
    });

    hub.publish(DiagnosticEvent::ResourceDictionaryLoaded {
        source: "theme.xaml".to_string(),
    });
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

/// Listener that answers a `ResourceDictionaryLoaded` for `source` with a
/// `StaticResourceResolved`, after meeting the other listener at `barrier`.
fn republish_on(
    hub: &Arc<DiagnosticsHub>,
    source: &'static str,
    barrier: Arc<Barrier>,
    resolved: Arc<AtomicUsize>,
) -> prism_services::Subscription {
    let inner_hub = Arc::downgrade(hub);
    hub.subscribe(move |record| match &record.event {
        DiagnosticEvent::ResourceDictionaryLoaded { source: s } if s == source => {
            barrier.wait();
            if let Some(hub) = inner_hub.upgrade() {
                hub.publish(DiagnosticEvent::StaticResourceResolved {
                    key: source.to_string(),
                    source: s.clone(),
                });
            }
        }
        DiagnosticEvent::StaticResourceResolved { .. } => {
            resolved.fetch_add(1, Ordering::SeqCst);
        }
        _ => {}
    })
}

#[test]
fn listeners_republishing_on_two_threads_do_not_block_each_other() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig::default());
    let barrier = Arc::new(Barrier::new(2));
    let resolved = Arc::new(AtomicUsize::new(0));
    let _first = republish_on(&hub, "a.xaml", barrier.clone(), resolved.clone());
    let _second = republish_on(&hub, "b.xaml", barrier, resolved.clone());

    // Each thread ends up inside a different listener's callback, then both
    // publish again while the other is still there.
    let (done_tx, done_rx) = mpsc::channel();
    for source in ["b.xaml", "a.xaml"] {
        let hub = hub.clone();
        let done = done_tx.clone();
        thread::spawn(move || {
            hub.publish(DiagnosticEvent::ResourceDictionaryLoaded {
                source: source.to_string(),
            });
            let _ = done.send(source);
        });
    }

    for _ in 0..2 {
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "publishers blocked on each other"
        );
    }
    // Both re-published events reach both listeners.
    assert_eq!(resolved.load(Ordering::SeqCst), 4);
}

#[test]
fn events_published_during_backlog_flush_follow_the_backlog() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig::default());
    for code in 1..=2 {
        hub.publish(binding_failed(code));
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let inner_hub = Arc::downgrade(&hub);
    let _sub = hub.subscribe(move |record| {
        sink.lock().unwrap().push(record.event.clone());
        if let DiagnosticEvent::BindingFailed { code: 1, .. } = record.event {
            if let Some(hub) = inner_hub.upgrade() {
                hub.publish(binding_failed(10));
            }
        }
    });

    assert_eq!(codes(&seen.lock().unwrap()), vec![1, 2, 10]);
}

#[test]
fn concurrent_publishers_lose_nothing_with_a_listener() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig::default());
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let _sub = hub.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let hub = hub.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    hub.publish(binding_failed(t * 1000 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1000);
    assert_eq!(hub.dropped_count(), 0);
}

#[test]
fn records_serialize_to_json() {
    let hub = DiagnosticsHub::new(DiagnosticsConfig::default());
    hub.publish(DiagnosticEvent::ResourceDictionaryUnloaded {
        source: "old.xaml".to_string(),
    });
    let captured = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let _sub = hub.subscribe(move |record| *sink.lock().unwrap() = Some(record.clone()));

    let record = captured.lock().unwrap().clone().unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["event"]["ResourceDictionaryUnloaded"]["source"], "old.xaml");
    assert!(json["recorded_at"].is_string());
}

// ---------------------------------------------------------------------------
// retry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ComFault {
    ServerDied,
    RpcUnavailable,
    InvalidArgument,
}

impl fmt::Display for ComFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Fake backend: fails with the scripted faults, one per call, then succeeds.
struct Backend {
    id: usize,
}

fn transient_policy() -> RetryPolicy<ComFault> {
    RetryPolicy::new()
        .retry_on("server-died", |e| *e == ComFault::ServerDied)
        .retry_on("rpc-unavailable", |e| *e == ComFault::RpcUnavailable)
}

fn counting_factory(created: Arc<AtomicUsize>) -> impl Fn() -> Result<Backend, ComFault> {
    move || {
        let id = created.fetch_add(1, Ordering::SeqCst);
        Ok(Backend { id })
    }
}

#[test]
fn whitelisted_failure_reinitializes_and_retries_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let service =
        ResilientService::new("spell", counting_factory(created.clone()), transient_policy())
            .unwrap();

    let mut script = vec![ComFault::ServerDied].into_iter();
    let result = service.call(|backend| match script.next() {
        Some(fault) => Err(fault),
        None => Ok(backend.id),
    });

    assert_eq!(result, Ok(1));
    assert_eq!(service.reinit_count(), 1);
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn second_whitelisted_failure_propagates() {
    let created = Arc::new(AtomicUsize::new(0));
    let service =
        ResilientService::new("spell", counting_factory(created.clone()), transient_policy())
            .unwrap();

    let mut script = vec![ComFault::ServerDied, ComFault::RpcUnavailable].into_iter();
    let result = service.call(|backend| match script.next() {
        Some(fault) => Err(fault),
        None => Ok(backend.id),
    });

    assert_eq!(result, Err(ComFault::RpcUnavailable));
    assert_eq!(service.reinit_count(), 1);
}

#[test]
fn non_whitelisted_failure_is_not_retried() {
    let created = Arc::new(AtomicUsize::new(0));
    let service =
        ResilientService::new("spell", counting_factory(created.clone()), transient_policy())
            .unwrap();

    let calls = AtomicUsize::new(0);
    let result: Result<(), ComFault> = service.call(|_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(ComFault::InvalidArgument)
    });

    assert_eq!(result, Err(ComFault::InvalidArgument));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.reinit_count(), 0);
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn configured_retry_budget_is_respected() {
    let created = Arc::new(AtomicUsize::new(0));
    let service = ResilientService::new(
        "spell",
        counting_factory(created.clone()),
        transient_policy().max_retries(3),
    )
    .unwrap();

    let mut script = vec![ComFault::ServerDied; 3].into_iter();
    let result = service.call(|backend| match script.next() {
        Some(fault) => Err(fault),
        None => Ok(backend.id),
    });
    assert_eq!(result, Ok(3));
    assert_eq!(service.reinit_count(), 3);
}

#[test]
fn reinit_failure_propagates() {
    let created = Arc::new(AtomicUsize::new(0));
    let factory_count = created.clone();
    let service = ResilientService::new(
        "spell",
        move || {
            if factory_count.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Backend { id: 0 })
            } else {
                Err(ComFault::RpcUnavailable)
            }
        },
        transient_policy(),
    )
    .unwrap();

    let result: Result<usize, ComFault> = service.call(|_| Err(ComFault::ServerDied));
    assert_eq!(result, Err(ComFault::RpcUnavailable));
    assert_eq!(service.reinit_count(), 0);
}

// ---------------------------------------------------------------------------
// shared resource
// ---------------------------------------------------------------------------

struct Engine {
    dropped: Arc<AtomicUsize>,
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

fn engine_resource(
    created: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
) -> SharedResource<Engine, String> {
    SharedResource::new("engine", move || {
        created.fetch_add(1, Ordering::SeqCst);
        Ok(Engine {
            dropped: dropped.clone(),
        })
    })
}

#[test]
fn contexts_keep_resource_alive_after_release() {
    let created = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let shared = engine_resource(created.clone(), dropped.clone());

    let first = shared.acquire().unwrap();
    let second = shared.acquire().unwrap();
    assert!(first.same_resource(&second));
    assert_eq!(shared.active_contexts(), 2);
    assert_eq!(created.load(Ordering::SeqCst), 1);

    shared.release();
    assert!(!shared.is_initialized());
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    drop(first);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);
    drop(second);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[test]
fn acquire_after_release_creates_new_generation() {
    let created = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let shared = engine_resource(created.clone(), dropped.clone());

    let old = shared.acquire().unwrap();
    shared.release();
    let new = shared.acquire().unwrap();

    assert!(!old.same_resource(&new));
    assert_eq!(shared.generation(), 2);
    assert_eq!(shared.active_contexts(), 1);
}

#[test]
fn concurrent_first_acquire_creates_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let shared = Arc::new(engine_resource(created.clone(), dropped));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || {
                let ctx = shared.acquire().unwrap();
                drop(ctx);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(shared.generation(), 1);
    assert_eq!(shared.active_contexts(), 0);
}
