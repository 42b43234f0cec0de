use std::fmt;

use crate::typedef::{PageNumber, SlotId, TableId};

/// Identifies one page of one heap file. This is the key pages are cached and locked under.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeapPageId {
    /// The id of the table (i.e. heap file) the page belongs to.
    table_id: TableId,
    /// The position of the page within its file.
    page_number: PageNumber,
}

impl HeapPageId {
    pub fn new(table_id: TableId, page_number: PageNumber) -> Self {
        Self {
            table_id,
            page_number,
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn page_number(&self) -> PageNumber {
        self.page_number
    }
}

impl fmt::Display for HeapPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_number)
    }
}

/// Locates a single tuple. Record ids order by page first, then by slot, which is exactly the
/// order a sequential scan emits tuples in.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordId {
    /// The ID of the page the record lives inside.
    page_id: HeapPageId,
    /// The index of the record's slot in the page. Not to be confused with the byte offset of the
    /// tuple in the page data!
    slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot_id: SlotId) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn page_id(&self) -> HeapPageId {
        self.page_id
    }

    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}
