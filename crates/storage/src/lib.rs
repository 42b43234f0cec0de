//! Page-oriented heap storage: tables are files of fixed-size slotted pages, read and written
//! through a buffer pool that hands pages out to transactions under page locks.

pub mod buffer_pool;
pub mod cache;
pub mod config;
pub mod heap;
pub mod lock;
pub mod page;
pub mod record_id;
pub(crate) mod replacer;
pub mod storage;
pub mod transaction;
pub mod tuple;
pub mod typedef;

pub(crate) type Result<T> = std::result::Result<T, heapdb_error::Error>;
