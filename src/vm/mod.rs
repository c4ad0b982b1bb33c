//! The binding between the collector and a VM.
//!
//! A VM implements [`VMBinding`] and the traits it names. The collector calls into the VM
//! only through these traits: to enumerate and update roots, to sweep and update the
//! interned string table, to deflate monitors, and to hand over reference processing and
//! out-of-memory conditions.

mod collection;
mod monitor;
mod scanning;
mod string_table;

pub use self::collection::Collection;
pub use self::monitor::MonitorPool;
pub use self::scanning::{
    GCRoot, ObjectUpdater, RootAccess, RootType, RootVisitor, Scanning, VisitGCRootFlags,
};
pub use self::string_table::StringTable;

/// The `VMBinding` trait associates the VM-specific traits with one type.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;
    type VMStringTable: StringTable<Self>;
    type VMMonitorPool: MonitorPool<Self>;
}

#[cfg(test)]
mod tests;
