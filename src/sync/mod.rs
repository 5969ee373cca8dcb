//! Client-side synchronization of the remote listings collection.
//!
//! [`SyncStore`] keeps a cached copy of everything the backend returns and
//! publishes it as immutable [`Snapshot`]s. Loads are retried a bounded
//! number of times, guarded by a watchdog so `is_loading` always clears,
//! and coalesced so only one load sequence runs at a time. Failures never
//! reach consumers: an unrecoverable load resolves to an empty collection.

mod cancel;
mod policy;
mod store;

pub use policy::SyncPolicy;
pub use store::{ListingSource, Snapshot, SyncStore};
