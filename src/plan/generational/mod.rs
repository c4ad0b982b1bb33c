//! The generational collector.
//!
//! Every collection starts with a young collection: live young objects are copied into the
//! tenured space and the young space is reset. Requests that ask for a full collection then
//! mark and sweep the tenured space, mostly concurrently with mutators.

pub(super) mod global;
mod tenured;
mod young;

pub use global::GenGC;
