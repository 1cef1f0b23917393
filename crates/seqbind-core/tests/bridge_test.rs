//! Cancellation bridge ordering, observer resolution and host yielding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use seqbind_core::bridge::{CancellationBridge, Interrupted};
use seqbind_core::traits::{
    Cancellable, CancellationToken, HostLock, ObserverChoice, ObserverError, ProgressDefaults,
    ProgressObserver,
};

#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<(String, u64, u64)>>,
}

impl ProgressObserver for Recording {
    fn on_progress(&self, tag: &str, primary: u64, secondary: u64) -> Result<(), ObserverError> {
        self.calls
            .lock()
            .unwrap()
            .push((tag.to_string(), primary, secondary));
        Ok(())
    }
}

#[derive(Default)]
struct CountingHost {
    released: AtomicUsize,
    reacquired: AtomicUsize,
}

impl HostLock for CountingHost {
    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
    fn reacquire(&self) {
        self.reacquired.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_detached_bridge_never_cancels() {
    let bridge = CancellationBridge::detached();
    for i in 0..10 {
        assert!(bridge.report("consume", i, i * 10).is_ok());
    }
    assert!(!bridge.has_observer());
}

#[test]
fn test_pending_interrupt_is_consumed() {
    let token = CancellationToken::new();
    let bridge = CancellationBridge::new(token.clone());

    token.cancel();
    assert_eq!(bridge.report("consume", 1, 1), Err(Interrupted::HostInterrupt));
    // The request was consumed by the first report.
    assert!(!token.is_cancelled());

    // A new operation over the same token starts clean.
    let next = CancellationBridge::new(token.clone());
    assert!(next.report("consume", 2, 2).is_ok());
}

#[test]
fn test_stop_is_latched_across_clones() {
    let token = CancellationToken::new();
    let bridge = CancellationBridge::new(token.clone());
    let shards: Vec<CancellationBridge> = (0..4).map(|_| bridge.clone()).collect();

    token.cancel();
    assert_eq!(shards[0].report("partition", 1, 0), Err(Interrupted::HostInterrupt));
    assert!(!token.is_cancelled());

    // Every other clone stops at its next report even though the flag was consumed.
    for shard in &shards[1..] {
        assert_eq!(shard.report("partition", 2, 0), Err(Interrupted::HostInterrupt));
    }
    assert_eq!(bridge.stopped(), Some(&Interrupted::HostInterrupt));
    assert_eq!(shards[0].report("partition", 3, 0), Err(Interrupted::HostInterrupt));
}

#[test]
fn test_observer_failure_is_latched() {
    let defaults = ProgressDefaults::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let failing: Arc<dyn ProgressObserver> =
        Arc::new(move |_: &str, _: u64, _: u64| -> Result<(), ObserverError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Err(ObserverError::new("stop"))
        });
    let bridge = CancellationBridge::detached()
        .with_observer(&ObserverChoice::Explicit(failing), &defaults);
    let other = bridge.clone();

    assert!(bridge.report("partition", 1, 0).is_err());
    assert_eq!(
        other.report("partition", 2, 0),
        Err(Interrupted::ObserverFailed("stop".to_string()))
    );
    // The observer is not called again once the bridge has stopped.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interrupt_checked_before_observer() {
    let defaults = ProgressDefaults::new();
    let observer = Arc::new(Recording::default());
    let token = CancellationToken::new();
    let bridge = CancellationBridge::new(token.clone())
        .with_observer(&ObserverChoice::Explicit(observer.clone()), &defaults);

    token.cancel();
    assert!(bridge.report("consume", 5, 50).is_err());
    assert!(observer.calls.lock().unwrap().is_empty());

    let next = CancellationBridge::new(token.clone())
        .with_observer(&ObserverChoice::Explicit(observer.clone()), &defaults);
    next.report("consume", 6, 60).unwrap();
    assert_eq!(
        observer.calls.lock().unwrap().as_slice(),
        &[("consume".to_string(), 6, 60)]
    );
}

#[test]
fn test_observer_failure_aborts_like_interrupt() {
    let defaults = ProgressDefaults::new();
    let failing: Arc<dyn ProgressObserver> =
        Arc::new(|_: &str, primary: u64, _: u64| -> Result<(), ObserverError> {
            if primary >= 3 {
                Err(ObserverError::new("stop"))
            } else {
                Ok(())
            }
        });
    let bridge = CancellationBridge::detached()
        .with_observer(&ObserverChoice::Explicit(failing), &defaults);

    assert!(bridge.report("partition", 1, 0).is_ok());
    let err = bridge.report("partition", 3, 0).unwrap_err();
    assert_eq!(err, Interrupted::ObserverFailed("stop".to_string()));

    let engine_err = err.into_cancelled("do_subset_partition", 3, 0);
    assert!(engine_err.is_cancelled());
    assert!(engine_err.to_string().contains("stop"));
}

#[test]
fn test_observer_resolution_rules() {
    let defaults = ProgressDefaults::new();
    let process_default = Arc::new(Recording::default());
    let explicit = Arc::new(Recording::default());

    // Unset default: nothing to call.
    let bridge = CancellationBridge::detached().with_observer(&ObserverChoice::Default, &defaults);
    assert!(!bridge.has_observer());

    defaults.set(process_default.clone());

    let bridge = CancellationBridge::detached().with_observer(&ObserverChoice::Default, &defaults);
    bridge.report("a", 1, 1).unwrap();

    let bridge = CancellationBridge::detached()
        .with_observer(&ObserverChoice::Explicit(explicit.clone()), &defaults);
    bridge.report("b", 2, 2).unwrap();

    let bridge =
        CancellationBridge::detached().with_observer(&ObserverChoice::Suppressed, &defaults);
    assert!(!bridge.has_observer());
    bridge.report("c", 3, 3).unwrap();

    assert_eq!(process_default.calls.lock().unwrap().len(), 1);
    assert_eq!(explicit.calls.lock().unwrap().len(), 1);

    assert!(defaults.clear());
    assert!(!defaults.clear());
    assert!(!defaults.is_set());
}

#[test]
fn test_report_yields_host_lock() {
    let host = Arc::new(CountingHost::default());
    let bridge = CancellationBridge::detached().with_host(host.clone());

    bridge.report("consume", 1, 1).unwrap();
    bridge.report("consume", 2, 2).unwrap();

    assert_eq!(host.released.load(Ordering::SeqCst), 2);
    assert_eq!(host.reacquired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cancelled_report_does_not_yield() {
    let host = Arc::new(CountingHost::default());
    let token = CancellationToken::new();
    let bridge = CancellationBridge::new(token.clone()).with_host(host.clone());

    token.cancel();
    assert!(bridge.report("consume", 1, 1).is_err());
    assert_eq!(host.released.load(Ordering::SeqCst), 0);
}
