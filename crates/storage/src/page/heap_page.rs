//! The slotted page format heap files are made of.
//!
//! Page layout:
//! ```text
//! +--------------------------+
//! | Header bitmap            |  ceil(num_slots / 8) bytes, bit i set <=> slot i occupied
//! +--------------------------+
//! | Slot 0                   |  schema.size() bytes each
//! | Slot 1                   |
//! | ...                      |
//! | Slot num_slots - 1       |
//! +--------------------------+
//! | Unused tail              |
//! +--------------------------+
//! ```
//!
//! Bit i lives in byte `i / 8` at position `i % 8`, least significant bit first. Every slot costs
//! its tuple bytes plus one header bit, so a page holds
//! `num_slots = floor(page_size * 8 / (tuple_size * 8 + 1))` tuples.
//!
//! The page keeps its full byte image around, so bytes that carry no meaning (stale bytes of a
//! cleared slot, header bits past `num_slots`, the unused tail) still survive a round trip through
//! [`HeapPage::serialize`] and [`HeapPage::new`] unchanged.

use bytes::{Bytes, BytesMut};
use heapdb_catalog::schema::{Schema, SchemaRef};
use heapdb_catalog::serde::Serde;
use heapdb_error::{errcorrupt, errinput, errschema, Error};

use crate::config::page_size;
use crate::record_id::{HeapPageId, RecordId};
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::typedef::SlotId;
use crate::Result;

pub struct HeapPage {
    pid: HeapPageId,
    schema: SchemaRef,
    num_slots: usize,
    /// The whole page image: header bitmap, slot array and tail.
    data: BytesMut,
    /// The transaction that last dirtied this page, if it hasn't been flushed since.
    dirtied_by: Option<TransactionId>,
    /// The page image as of the last read from (or write to) disk.
    before_image: Bytes,
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage")
            .field("pid", &self.pid)
            .field("num_slots", &self.num_slots)
            .field("empty_slots", &self.empty_slot_count())
            .field("dirtied_by", &self.dirtied_by)
            .finish()
    }
}

impl HeapPage {
    /// Returns how many tuples of `schema` fit on one page.
    pub fn num_slots_for(schema: &Schema) -> usize {
        (page_size() * 8) / (schema.size() * 8 + 1)
    }

    /// Returns the byte length of the header bitmap for a page with `num_slots` slots.
    pub fn header_size_for(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Returns the image of a page with every slot free.
    pub fn empty_page_data() -> Bytes {
        Bytes::from(vec![0; page_size()])
    }

    /// Deserializes a page from its on-disk image. `data` must be exactly one page long, and the
    /// schema must leave room for at least one tuple per page.
    pub fn new(pid: HeapPageId, schema: SchemaRef, data: &[u8]) -> Result<Self> {
        if data.len() != page_size() {
            return errcorrupt!(
                "page {} is {} bytes long, expected {}",
                pid,
                data.len(),
                page_size()
            );
        }
        let num_slots = Self::num_slots_for(&schema);
        if num_slots == 0 {
            return errschema!(
                "a {} byte tuple doesn't fit in a {} byte page",
                schema.size(),
                page_size()
            );
        }
        let data = BytesMut::from(data);
        Ok(Self {
            pid,
            schema,
            num_slots,
            before_image: data.clone().freeze(),
            data,
            dirtied_by: None,
        })
    }

    /// Creates a page with every slot free.
    pub fn empty(pid: HeapPageId, schema: SchemaRef) -> Result<Self> {
        Self::new(pid, schema, &Self::empty_page_data())
    }

    pub fn id(&self) -> HeapPageId {
        self.pid
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn header_size(&self) -> usize {
        Self::header_size_for(self.num_slots)
    }

    /// Returns whether slot `slot` holds a tuple. Slots past the end of the page are never used.
    pub fn is_slot_used(&self, slot: SlotId) -> bool {
        slot < self.num_slots && self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    pub fn empty_slot_count(&self) -> usize {
        (0..self.num_slots)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Returns the lowest-numbered free slot, if any.
    pub fn first_free_slot(&self) -> Option<SlotId> {
        (0..self.num_slots).find(|&slot| !self.is_slot_used(slot))
    }

    /// Returns the lowest-numbered used slot at or after `from`, if any.
    pub fn next_used_slot(&self, from: SlotId) -> Option<SlotId> {
        (from..self.num_slots).find(|&slot| self.is_slot_used(slot))
    }

    /// Deserializes the tuple stored in `slot`. The returned tuple carries its record id.
    pub fn tuple_at(&self, slot: SlotId) -> Result<Tuple> {
        if !self.is_slot_used(slot) {
            return errinput!("slot {} of page {} is empty", slot, self.pid);
        }
        let range = self.slot_range(slot);
        let fields = Serde::deserialize(&self.data[range], &self.schema).map_err(|e| {
            Error::CorruptPage(format!("slot {} of page {}: {}", slot, self.pid, e))
        })?;
        let mut tuple = Tuple::new(fields);
        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        Ok(tuple)
    }

    /// Returns an iterator over the tuples in used slots, in slot order.
    pub fn iter(&self) -> HeapPageIter<'_> {
        HeapPageIter {
            page: self,
            next_slot: 0,
        }
    }

    /// Writes `tuple` into the free slot `slot` and marks the slot used.
    pub fn insert_at(&mut self, slot: SlotId, tuple: &Tuple) -> Result<()> {
        if slot >= self.num_slots {
            return errinput!("page {} has no slot {}", self.pid, slot);
        }
        if self.is_slot_used(slot) {
            return errinput!("slot {} of page {} is already used", slot, self.pid);
        }
        tuple.check(&self.schema)?;

        let range = self.slot_range(slot);
        let mut slot_bytes = &mut self.data[range];
        Serde::serialize_into(tuple.fields(), &mut slot_bytes);
        self.set_slot(slot, true);
        Ok(())
    }

    /// Marks the used slot `slot` free. The slot's bytes are left as they are.
    pub fn clear_slot(&mut self, slot: SlotId) -> Result<()> {
        if !self.is_slot_used(slot) {
            return errinput!("slot {} of page {} is already empty", slot, self.pid);
        }
        self.set_slot(slot, false);
        Ok(())
    }

    /// Places `tuple` in the lowest free slot and stamps it with its new record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        let Some(slot) = self.first_free_slot() else {
            return errinput!("page {} is full", self.pid);
        };
        self.insert_at(slot, tuple)?;
        let rid = RecordId::new(self.pid, slot);
        tuple.set_record_id(Some(rid));
        Ok(rid)
    }

    /// Frees the slot `tuple`'s record id points at, which must be on this page.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let Some(rid) = tuple.record_id() else {
            return errinput!("tuple has no record id");
        };
        if rid.page_id() != self.pid {
            return errinput!("tuple {} is not on page {}", rid, self.pid);
        }
        self.clear_slot(rid.slot_id())
    }

    /// Returns the on-disk image of this page.
    pub fn serialize(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = dirty.then_some(tid);
    }

    /// Returns the transaction that dirtied this page, or `None` if the page is clean.
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Returns the page as it was when last read from or written to disk.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::new(self.pid, self.schema.clone(), &self.before_image)
    }

    /// Takes the current contents as the new before image, e.g. once they've been written out.
    pub fn set_before_image(&mut self) {
        self.before_image = self.serialize();
    }

    fn slot_range(&self, slot: SlotId) -> std::ops::Range<usize> {
        let start = self.header_size() + slot * self.schema.size();
        start..start + self.schema.size()
    }

    fn set_slot(&mut self, slot: SlotId, used: bool) {
        let mask = 1 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }
}

/// Iterates over the tuples of a page in slot order, skipping free slots.
pub struct HeapPageIter<'a> {
    page: &'a HeapPage,
    next_slot: SlotId,
}

impl Iterator for HeapPageIter<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.page.next_used_slot(self.next_slot)?;
        self.next_slot = slot + 1;
        Some(self.page.tuple_at(slot))
    }
}
