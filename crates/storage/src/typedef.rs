pub use heapdb_catalog::catalog::TableId;

/// Index of a page within its heap file.
pub type PageNumber = u32;
/// Index of a tuple slot within its page.
pub type SlotId = usize;
pub(crate) type FrameId = usize;
