//! Heapdb: heap files of fixed-size slotted pages behind a locking buffer pool.
//!
//! The workspace is split into an error crate, a catalog crate (types, schemas, the fixed-width
//! tuple codec and table metadata) and the storage crate proper. This crate re-exports all three.

pub use heapdb_catalog as catalog;
pub use heapdb_error as error;
pub use heapdb_storage as storage;
