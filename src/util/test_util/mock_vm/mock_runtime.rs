//! The runtime state behind the default [`MockVM`](super::MockVM) methods: stack roots,
//! class roots, interned strings and inflated monitors.
//!
//! Visits take a snapshot under the lock and call the visitor without it, so a visitor may
//! change the runtime, e.g. record a new root. Sweeps and updates hold the lock while they
//! call back into the collector.

use crate::util::marker::ObjectStatus;
use crate::util::ObjectReference;
use crate::vm::{GCRoot, ObjectUpdater, RootAccess, RootType, RootVisitor, VisitGCRootFlags};

use std::sync::{Mutex, MutexGuard};

lazy_static! {
    static ref MOCK_RUNTIME: Mutex<MockRuntime> = Mutex::new(MockRuntime::default());
}

/// Roots that are recorded while they are added, so that the collector can visit only the
/// roots added since recording started.
#[derive(Default)]
struct RecordedRoots {
    roots: Vec<ObjectReference>,
    new_roots: Vec<ObjectReference>,
    recording: bool,
}

impl RecordedRoots {
    fn add(&mut self, object: ObjectReference) {
        self.roots.push(object);
        if self.recording {
            self.new_roots.push(object);
        }
    }

    /// The roots `flags` selects. Recording starts or stops after the selection.
    fn select(&mut self, flags: VisitGCRootFlags) -> Vec<ObjectReference> {
        let selected = match flags.access() {
            RootAccess::All => self.roots.clone(),
            RootAccess::OnlyNew => self.new_roots.clone(),
            RootAccess::None => vec![],
        };
        match flags.recording() {
            Some(true) => {
                self.recording = true;
                self.new_roots.clear();
            }
            Some(false) => {
                self.recording = false;
                self.new_roots.clear();
            }
            None => {}
        }
        selected
    }

    fn update(&mut self, updater: &mut dyn ObjectUpdater) {
        for object in self.roots.iter_mut().chain(self.new_roots.iter_mut()) {
            if let Some(to) = updater.update(*object) {
                *object = to;
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternedString {
    pub object: ObjectReference,
    /// Strong entries are roots. Weak entries only survive if the object is otherwise
    /// reachable.
    pub strong: bool,
}

#[derive(Copy, Clone, Debug)]
pub struct Monitor {
    pub object: ObjectReference,
    /// An idle monitor has no owner and no waiters.
    pub idle: bool,
}

#[derive(Default)]
pub struct MockRuntime {
    stack_roots: Vec<ObjectReference>,
    class_roots: RecordedRoots,
    strings: Vec<InternedString>,
    /// Strong strings interned while recording.
    new_strong_strings: Vec<ObjectReference>,
    recording_strings: bool,
    monitors: Vec<Monitor>,
}

fn lock() -> MutexGuard<'static, MockRuntime> {
    MOCK_RUNTIME
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Forget all state. Called for every test that installs a mock VM.
pub fn reset() {
    *lock() = MockRuntime::default();
}

fn visit(visitor: &mut dyn RootVisitor, root_type: RootType, objects: Vec<ObjectReference>) {
    for object in objects {
        visitor.visit_root(GCRoot::new(root_type, object));
    }
}

pub fn add_stack_root(object: ObjectReference) {
    lock().stack_roots.push(object);
}

/// Remove one occurrence of `object` from the stack roots. Returns false if there was none.
pub fn remove_stack_root(object: ObjectReference) -> bool {
    let mut runtime = lock();
    match runtime.stack_roots.iter().position(|r| *r == object) {
        Some(index) => {
            runtime.stack_roots.remove(index);
            true
        }
        None => false,
    }
}

pub fn stack_roots() -> Vec<ObjectReference> {
    lock().stack_roots.clone()
}

pub fn clear_stack_roots() {
    lock().stack_roots.clear();
}

pub fn visit_stack_roots(visitor: &mut dyn RootVisitor) {
    let roots = lock().stack_roots.clone();
    visit(visitor, RootType::Frame, roots);
}

pub fn update_stack_and_class_roots(updater: &mut dyn ObjectUpdater) {
    let mut runtime = lock();
    for object in runtime.stack_roots.iter_mut() {
        if let Some(to) = updater.update(*object) {
            *object = to;
        }
    }
    runtime.class_roots.update(updater);
}

pub fn add_class_root(object: ObjectReference) {
    lock().class_roots.add(object);
}

pub fn class_roots() -> Vec<ObjectReference> {
    lock().class_roots.roots.clone()
}

pub fn visit_class_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags) {
    let roots = lock().class_roots.select(flags);
    visit(visitor, RootType::ClassLinker, roots);
}

pub fn intern_string(object: ObjectReference, strong: bool) {
    let mut runtime = lock();
    runtime.strings.push(InternedString { object, strong });
    if strong && runtime.recording_strings {
        runtime.new_strong_strings.push(object);
    }
}

pub fn interned_strings() -> Vec<InternedString> {
    lock().strings.clone()
}

/// Strong entries are roots. Weak entries are left to the sweep.
pub fn visit_string_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags) {
    let roots = {
        let mut runtime = lock();
        let selected = match flags.access() {
            RootAccess::All => runtime
                .strings
                .iter()
                .filter(|s| s.strong)
                .map(|s| s.object)
                .collect(),
            RootAccess::OnlyNew => runtime.new_strong_strings.clone(),
            RootAccess::None => vec![],
        };
        if let Some(recording) = flags.recording() {
            runtime.recording_strings = recording;
            runtime.new_strong_strings.clear();
        }
        selected
    };
    visit(visitor, RootType::StringTable, roots);
}

pub fn sweep_strings(checker: &mut dyn FnMut(ObjectReference) -> ObjectStatus) -> usize {
    let mut runtime = lock();
    let before = runtime.strings.len();
    runtime
        .strings
        .retain(|s| checker(s.object) == ObjectStatus::Alive);
    before - runtime.strings.len()
}

pub fn update_strings(updater: &mut dyn ObjectUpdater) {
    let mut runtime = lock();
    for s in runtime.strings.iter_mut() {
        if let Some(to) = updater.update(s.object) {
            s.object = to;
        }
    }
}

pub fn inflate_monitor(object: ObjectReference, idle: bool) {
    lock().monitors.push(Monitor { object, idle });
}

pub fn monitors() -> Vec<Monitor> {
    lock().monitors.clone()
}

pub fn deflate_idle_monitors() -> usize {
    let mut runtime = lock();
    let before = runtime.monitors.len();
    runtime.monitors.retain(|m| !m.idle);
    before - runtime.monitors.len()
}

pub fn deflate_monitors_with(should_deflate: &mut dyn FnMut(ObjectReference) -> bool) -> usize {
    let mut runtime = lock();
    let before = runtime.monitors.len();
    runtime.monitors.retain(|m| !should_deflate(m.object));
    before - runtime.monitors.len()
}

pub fn update_monitors(updater: &mut dyn ObjectUpdater) {
    let mut runtime = lock();
    for m in runtime.monitors.iter_mut() {
        if let Some(to) = updater.update(m.object) {
            m.object = to;
        }
    }
}
