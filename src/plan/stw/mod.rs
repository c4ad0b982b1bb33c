//! The stop-the-world collector: one mark-sweep over the whole heap inside a single
//! safepoint. There is no young space, so no object ever moves.

mod global;

pub use global::StwGC;
