//! Exposes a system catalog that hands out table identities, along with the tuple descriptors
//! (schemas) those tables are stored under.
//!
//! Also provides an API (via [`crate::serde`]) for converting between serialized and deserialized
//! representations of table rows / tuples.
pub mod catalog;
pub mod column;
pub mod field;
pub mod schema;
pub mod serde;
pub mod types;
