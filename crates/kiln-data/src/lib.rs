//! Kiln Data
//!
//! The data plane of the master: path-addressable read endpoints plus the
//! two mutating actions the control plane exposes - forcing a new unit of
//! work through a registered trigger, and synchronizing a build's in-memory
//! property set to durable storage.
//!
//! The HTTP routing and serialization layer sits above this crate; endpoints
//! here take already-parsed identifiers and raw JSON maps and return wire
//! values or [`DataError`]s that render as stable JSON-RPC error objects.

mod error;
mod forceschedulers;
mod properties;
pub mod rpc;

pub use error::DataError;
pub use forceschedulers::ForceSchedulers;
pub use properties::Properties;
