//! Observers of collections. Listeners are purely observational; they must not allocate
//! or request collections from their callbacks.

use crate::plan::gc_task::GCTask;

use std::sync::{Arc, RwLock};

/// Informed when the phase sequence of a collection starts and ends.
pub trait GCListener: Send + Sync {
    fn gc_started(&self, _task: &GCTask, _heap_size: usize) {}
    fn gc_finished(&self, _task: &GCTask, _heap_size_before_gc: usize, _heap_size: usize) {}
}

/// Tooling events fired around every collection request, including requests that turn out
/// to be satisfied by a collection another thread ran.
pub trait GarbageCollectorListener: Send + Sync {
    fn start_event(&self, _task: &GCTask) {}
    fn finish_event(&self, _task: &GCTask) {}
}

#[derive(Default)]
pub struct NotificationManager {
    gc_listeners: RwLock<Vec<Arc<dyn GCListener>>>,
    collector_listeners: RwLock<Vec<Arc<dyn GarbageCollectorListener>>>,
}

impl NotificationManager {
    pub fn add_gc_listener(&self, listener: Arc<dyn GCListener>) {
        self.gc_listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub fn add_collector_listener(&self, listener: Arc<dyn GarbageCollectorListener>) {
        self.collector_listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    fn gc_listeners(&self) -> Vec<Arc<dyn GCListener>> {
        self.gc_listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn collector_listeners(&self) -> Vec<Arc<dyn GarbageCollectorListener>> {
        self.collector_listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn fire_gc_started(&self, task: &GCTask, heap_size: usize) {
        for listener in self.gc_listeners() {
            listener.gc_started(task, heap_size);
        }
    }

    pub fn fire_gc_finished(&self, task: &GCTask, heap_size_before_gc: usize, heap_size: usize) {
        for listener in self.gc_listeners() {
            listener.gc_finished(task, heap_size_before_gc, heap_size);
        }
    }

    pub fn fire_start_event(&self, task: &GCTask) {
        for listener in self.collector_listeners() {
            listener.start_event(task);
        }
    }

    pub fn fire_finish_event(&self, task: &GCTask) {
        for listener in self.collector_listeners() {
            listener.finish_event(task);
        }
    }
}
