use std::sync::{Arc, RwLock};

pub mod heap_page;

use heap_page::HeapPage;

/// A page as handed out by a page cache. The cache owns the page; everyone else shares it and
/// goes through the `RwLock` to read or mutate it.
pub type PageRef = Arc<RwLock<HeapPage>>;
