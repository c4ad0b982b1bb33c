//! Safepoints: suspending every mutator so that one thread owns the heap.
//!
//! All state lives in one [`SafepointState`] behind a mutex, and is only changed through
//! the [`Rendezvous`] API. Mutators report in at poll points and park on a condition
//! variable; they never spin. The thread that begins a safepoint holds a
//! [`SafepointGuard`], which ends the safepoint when dropped, so the heap is released on
//! every exit path including a panic inside a collection phase.
//!
//! There is no timeout. A mutator that never polls stalls every safepoint request.

use crate::util::MutatorId;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MutatorState {
    /// Executing mutator code. Blocks safepoints until it polls.
    Running,
    /// Parked at a poll point, or waiting inside a safepoint request.
    Parked,
    /// Outside managed code. Does not touch the heap, so it does not block safepoints.
    Native,
}

#[derive(Default)]
struct SafepointState {
    mutators: HashMap<MutatorId, MutatorState>,
    /// Is the heap currently owned by a safepoint holder?
    active: bool,
    /// The mutator holding the safepoint, if the holder is a mutator.
    owner: Option<MutatorId>,
    /// Threads waiting inside `safepoint_begin`.
    pending: usize,
    /// Number of safepoints begun so far.
    count: u64,
}

impl SafepointState {
    fn has_running_mutator_except(&self, caller: Option<MutatorId>) -> bool {
        self.mutators
            .iter()
            .any(|(id, state)| *state == MutatorState::Running && Some(*id) != caller)
    }

    /// Parked mutators stay parked while a safepoint is held or requested.
    fn must_stay_parked(&self) -> bool {
        self.active || self.pending > 0
    }

    fn set_state(&mut self, id: MutatorId, state: MutatorState) {
        match self.mutators.get_mut(&id) {
            Some(entry) => *entry = state,
            None => panic!("{} is not registered with the rendezvous", id),
        }
    }
}

pub struct Rendezvous {
    state: Mutex<SafepointState>,
    cvar: Condvar,
    /// Fast-path flag polled by mutators. Only written with the state lock held.
    suspend_requested: AtomicBool,
}

impl Rendezvous {
    pub fn new() -> Self {
        Rendezvous {
            state: Mutex::new(SafepointState::default()),
            cvar: Condvar::new(),
            suspend_requested: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SafepointState> {
        // A panic in a collection phase poisons nothing we rely on: the guard still
        // releases the safepoint while unwinding.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, SafepointState>) -> MutexGuard<'a, SafepointState> {
        self.cvar
            .wait(guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update_suspend_flag(&self, state: &SafepointState) {
        self.suspend_requested
            .store(state.must_stay_parked(), Ordering::Release);
    }

    /// Register a mutator. A thread cannot start running managed code in the middle of a
    /// safepoint, so this waits for any safepoint in progress to end.
    pub fn register_mutator(&self, id: MutatorId) {
        let mut state = self.lock();
        while state.must_stay_parked() {
            state = self.wait(state);
        }
        let old = state.mutators.insert(id, MutatorState::Running);
        assert!(old.is_none(), "{} is registered twice", id);
        debug!("Register {} to rendezvous", id);
    }

    pub fn unregister_mutator(&self, id: MutatorId) {
        let mut state = self.lock();
        state.mutators.remove(&id);
        debug!("Unregister {} from rendezvous", id);
        self.cvar.notify_all();
    }

    pub fn number_of_mutators(&self) -> usize {
        self.lock().mutators.len()
    }

    pub fn mutator_state(&self, id: MutatorId) -> Option<MutatorState> {
        self.lock().mutators.get(&id).copied()
    }

    pub fn is_suspend_requested(&self) -> bool {
        self.suspend_requested.load(Ordering::Acquire)
    }

    pub fn is_in_safepoint(&self) -> bool {
        self.lock().active
    }

    /// The number of threads blocked in `safepoint_begin`.
    pub fn pending_requests(&self) -> usize {
        self.lock().pending
    }

    /// The number of safepoints begun so far.
    pub fn safepoint_count(&self) -> u64 {
        self.lock().count
    }

    /// Called by a mutator at a safepoint-checkable point. Returns immediately unless a
    /// safepoint is held or requested, in which case the mutator parks until it is over.
    pub fn safepoint_poll(&self, id: MutatorId) {
        if !self.is_suspend_requested() {
            return;
        }
        let mut state = self.lock();
        if !state.must_stay_parked() {
            return;
        }
        trace!("{} parks at safepoint poll", id);
        state.set_state(id, MutatorState::Parked);
        self.cvar.notify_all();
        while state.must_stay_parked() {
            state = self.wait(state);
        }
        state.set_state(id, MutatorState::Running);
        trace!("{} resumes", id);
    }

    /// Leave managed code. Until the returned scope is dropped the mutator does not block
    /// safepoints, and must not touch the heap.
    pub fn enter_native(&self, id: MutatorId) -> NativeScope<'_> {
        let mut state = self.lock();
        state.set_state(id, MutatorState::Native);
        self.cvar.notify_all();
        NativeScope {
            rendezvous: self,
            id,
        }
    }

    fn leave_native(&self, id: MutatorId) {
        let mut state = self.lock();
        while state.must_stay_parked() {
            state = self.wait(state);
        }
        state.set_state(id, MutatorState::Running);
    }

    /// Suspend every mutator and take exclusive ownership of the heap. `caller` is the
    /// requesting mutator, if the requester is one; it counts as parked while it waits.
    pub fn safepoint_begin(&self, caller: Option<MutatorId>) -> SafepointGuard<'_> {
        self.acquire(caller);
        SafepointGuard {
            rendezvous: self,
            caller,
        }
    }

    fn acquire(&self, caller: Option<MutatorId>) {
        let mut state = self.lock();
        state.pending += 1;
        self.update_suspend_flag(&state);
        if let Some(id) = caller {
            state.set_state(id, MutatorState::Parked);
            self.cvar.notify_all();
        }
        while state.active || state.has_running_mutator_except(caller) {
            state = self.wait(state);
        }
        state.pending -= 1;
        state.active = true;
        state.owner = caller;
        state.count += 1;
        self.update_suspend_flag(&state);
        debug!("Safepoint #{} begins, owner {:?}", state.count, caller);
    }

    /// End the safepoint. If `resume_caller` is set and the holder is a mutator, it goes
    /// back to running once no other safepoint is held or requested, like any parked mutator.
    fn release(&self, caller: Option<MutatorId>, resume_caller: bool) {
        let mut state = self.lock();
        assert!(state.active, "Ending a safepoint that is not held");
        assert_eq!(state.owner, caller, "Safepoint ended by a thread that does not own it");
        state.active = false;
        state.owner = None;
        self.update_suspend_flag(&state);
        debug!("Safepoint #{} ends", state.count);
        self.cvar.notify_all();

        if let (Some(id), true) = (caller, resume_caller) {
            while state.must_stay_parked() {
                state = self.wait(state);
            }
            // The mutator may have been unbound by the collection callbacks.
            if state.mutators.contains_key(&id) {
                state.set_state(id, MutatorState::Running);
            }
        }
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive ownership of the heap. Dropping the guard ends the safepoint.
pub struct SafepointGuard<'a> {
    rendezvous: &'a Rendezvous,
    caller: Option<MutatorId>,
}

impl<'a> SafepointGuard<'a> {
    pub fn caller(&self) -> Option<MutatorId> {
        self.caller
    }

    /// A scope in which mutators may run again. If `start` is false the safepoint is kept
    /// until [`ConcurrentScope::start`] is called.
    pub fn concurrent_scope(&mut self, start: bool) -> ConcurrentScope<'_, 'a> {
        let mut scope = ConcurrentScope {
            guard: self,
            started: false,
        };
        if start {
            scope.start();
        }
        scope
    }
}

impl Drop for SafepointGuard<'_> {
    fn drop(&mut self) {
        self.rendezvous.release(self.caller, true);
    }
}

/// Temporarily ends a safepoint so that mutators run concurrently with the collector.
/// Dropping the scope begins the safepoint again.
pub struct ConcurrentScope<'g, 'a> {
    guard: &'g mut SafepointGuard<'a>,
    started: bool,
}

impl ConcurrentScope<'_, '_> {
    pub fn start(&mut self) {
        if !self.started {
            self.guard.rendezvous.release(self.guard.caller, false);
            self.started = true;
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for ConcurrentScope<'_, '_> {
    fn drop(&mut self) {
        if self.started {
            self.guard.rendezvous.acquire(self.guard.caller);
        }
    }
}

/// A mutator outside managed code. Dropping the scope waits for any safepoint to end and
/// marks the mutator running again.
pub struct NativeScope<'a> {
    rendezvous: &'a Rendezvous,
    id: MutatorId,
}

impl Drop for NativeScope<'_> {
    fn drop(&mut self) {
        self.rendezvous.leave_native(self.id);
    }
}
