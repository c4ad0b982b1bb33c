//! Utilities used by other modules, including allocators, heap layout and the safepoint
//! rendezvous.

/// Address and object reference types.
pub mod address;
/// Allocators that place objects in the young and tenured spaces.
pub mod alloc;
/// The card table that remembers tenured objects written by mutators.
pub mod card_table;
/// Constants used in GenGC.
pub mod constants;
/// Calculation, conversion and rounding for memory related numbers.
pub mod conversions;
/// Heap pools and the GC trigger.
pub mod heap;
/// The object representation and its GC header.
pub mod heap_object;
/// Logger initialization.
pub mod logger;
/// Mark bits and the mark checkers handed to weak tables.
pub mod marker;
/// Identifiers of mutator threads.
pub mod mutator_id;
/// Listeners told about collections.
pub mod notification;
/// Forwarding pointers of moved objects.
pub mod object_forwarding;
/// GenGC command line options.
pub mod options;
/// Safepoints: the rendezvous between mutators and the collector.
pub mod rendezvous;
/// Heap verification.
pub mod sanity;
/// Per cycle and cumulative GC statistics.
pub mod statistics;
/// Test utilities. We need this module for `MockVM` in criterion benches, which does not include code with `cfg(test)`.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::mutator_id::MutatorId;
