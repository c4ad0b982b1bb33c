//! Helpers for tests and benchmarks: the mock VM, heap fixtures, and ways to run tests
//! that share the process-global mock state.

use std::panic;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "mock_test"))]
pub mod fixtures;
#[cfg(any(test, feature = "mock_test"))]
pub mod mock_method;
#[cfg(any(test, feature = "mock_test"))]
pub mod mock_vm;

/// Run `f` on a new thread and panic if it has not returned within `millis`. Tests with
/// several mutator threads use this so that a lost wakeup fails instead of hanging.
pub fn panic_after<T, F>(millis: u64, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let val = f();
        let _ = done_tx.send(());
        val
    });

    match done_rx.recv_timeout(Duration::from_millis(millis)) {
        Ok(()) => match handle.join() {
            Ok(val) => val,
            Err(e) => panic::resume_unwind(e),
        },
        Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
            // The thread panicked before signalling.
            Err(e) => panic::resume_unwind(e),
            Ok(val) => val,
        },
        Err(e) => panic!("Test thread did not finish within {} ms: {}", millis, e),
    }
}

/// Sleep until `condition` holds. Panics if it does not within `millis`.
pub fn wait_until<F>(millis: u64, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(millis);
    while !condition() {
        assert!(Instant::now() < deadline, "Condition not met within {} ms", millis);
        thread::sleep(Duration::from_millis(1));
    }
}

lazy_static! {
    // The mock VM is process-global, so tests that install one run one at a time.
    static ref SERIAL_TEST_LOCK: Mutex<()> = Mutex::default();
}

pub fn serial_test<F>(f: F)
where
    F: FnOnce(),
{
    // A failed test poisons the lock. The other tests still run.
    let _guard = SERIAL_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f();
}

/// Run `cleanup` after `test`, also when `test` panics.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let res = panic::catch_unwind(test);
    cleanup();
    if let Err(e) = res {
        panic::resume_unwind(e);
    }
}
