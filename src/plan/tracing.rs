//! This module contains code useful for tracing,
//! i.e. visiting the reachable objects by traversing all or part of an object graph.

use crate::heap_manager::HeapManager;
use crate::util::marker::GCMarker;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// This trait represents an object queue to enqueue objects during tracing.
pub trait ObjectQueue {
    /// Enqueue an object into the queue.
    fn enqueue(&mut self, object: ObjectReference);
}

pub type VectorObjectQueue = VectorQueue<ObjectReference>;

/// An implementation of `ObjectQueue` using a `Vec`.
///
/// The collectors use it as their mark stack.
pub struct VectorQueue<T> {
    /// Enqueued nodes.
    buffer: Vec<T>,
}

impl<T> VectorQueue<T> {
    /// Reserve a capacity of this on first enqueue to avoid frequent resizing.
    const CAPACITY: usize = 4096;

    /// Create an empty `VectorObjectQueue`.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Return `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Return the contents of the underlying vector.  It will empty the queue.
    pub fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.buffer)
    }

    #[inline(always)]
    pub fn push(&mut self, v: T) {
        if self.buffer.is_empty() {
            self.buffer.reserve(Self::CAPACITY);
        }
        self.buffer.push(v);
    }

    /// Pop the most recently pushed node.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        self.buffer.pop()
    }
}

impl<T> Default for VectorQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectQueue for VectorQueue<ObjectReference> {
    #[inline(always)]
    fn enqueue(&mut self, v: ObjectReference) {
        self.push(v);
    }
}

/// The mark stack of a collector: objects that are marked but whose fields have not been
/// scanned yet.
pub(crate) struct MarkStack<'a, VM: VMBinding> {
    heap: &'a HeapManager<VM>,
    marker: &'a GCMarker,
    queue: VectorObjectQueue,
    scanned: usize,
}

impl<'a, VM: VMBinding> MarkStack<'a, VM> {
    pub fn new(heap: &'a HeapManager<VM>, marker: &'a GCMarker) -> Self {
        MarkStack {
            heap,
            marker,
            queue: VectorObjectQueue::new(),
            scanned: 0,
        }
    }

    /// Mark `object` and queue it if this call marked it.
    pub fn mark_and_push(&mut self, object: ObjectReference) {
        let header = self.heap.object(object);
        if self.marker.mark_if_not_marked(&header) {
            trace!("Mark {}", object);
            self.queue.enqueue(object);
        }
    }

    /// Mark `object` and queue it even if it is already marked, so that its fields are
    /// scanned again.
    pub fn mark_and_force_push(&mut self, object: ObjectReference) {
        let header = self.heap.object(object);
        self.marker.mark(&header);
        self.queue.enqueue(object);
    }

    /// Scan queued objects until the stack is empty. Referents for which `filter` holds are
    /// marked and queued.
    pub fn drain<F>(&mut self, filter: F)
    where
        F: Fn(ObjectReference) -> bool,
    {
        while let Some(object) = self.queue.pop() {
            let header = self.heap.object(object);
            self.scanned += 1;
            for child in header.references() {
                if filter(child) {
                    self.mark_and_push(child);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The number of objects scanned so far.
    pub fn scanned(&self) -> usize {
        self.scanned
    }
}
