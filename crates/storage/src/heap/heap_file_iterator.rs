use std::sync::Arc;

use heapdb_error::Error;

use crate::cache::PageCache;
use crate::heap::heap_file::HeapFile;
use crate::page::PageRef;
use crate::record_id::HeapPageId;
use crate::transaction::{Permission, TransactionId};
use crate::tuple::Tuple;
use crate::typedef::{PageNumber, SlotId};
use crate::Result;

/// A restartable cursor over the tuples of a file.
pub trait DbFileIterator {
    /// Positions the cursor before the first tuple.
    fn open(&mut self) -> Result<()>;

    /// Returns whether `next` would yield a tuple. Calling it repeatedly doesn't advance the
    /// cursor.
    fn has_next(&mut self) -> Result<bool>;

    /// Yields the next tuple, or `Error::NoSuchElement` if the cursor is exhausted or not open.
    fn next(&mut self) -> Result<Tuple>;

    /// Starts over from the first tuple.
    fn rewind(&mut self) -> Result<()>;

    /// Closes the cursor. It can be opened again.
    fn close(&mut self);
}

enum ScanState {
    Unopened,
    Active {
        page_number: PageNumber,
        page: PageRef,
        next_slot: SlotId,
    },
    Exhausted,
}

/// Scans a heap file page by page, and each page slot by slot, fetching pages through the cache
/// under `ReadOnly` on behalf of one transaction.
///
/// Only the page currently being read is referenced; earlier pages are released to the cache as
/// the scan moves on. Page locks are held by the transaction, not the cursor, so closing the
/// cursor doesn't release them.
pub struct HeapFileIterator<C: PageCache> {
    file: Arc<HeapFile>,
    cache: Arc<C>,
    tid: TransactionId,
    state: ScanState,
    lookahead: Option<Tuple>,
}

impl<C: PageCache> HeapFileIterator<C> {
    pub fn new(file: Arc<HeapFile>, cache: Arc<C>, tid: TransactionId) -> Self {
        Self {
            file,
            cache,
            tid,
            state: ScanState::Unopened,
            lookahead: None,
        }
    }

    fn fetch(&self, page_number: PageNumber) -> Result<PageRef> {
        let pid = HeapPageId::new(self.file.id(), page_number);
        self.cache.get_page(self.tid, pid, Permission::ReadOnly)
    }

    /// Pulls the next tuple out of the file, moving on to later pages as earlier ones run dry.
    fn read_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            let ScanState::Active {
                page_number,
                page,
                next_slot,
            } = &mut self.state
            else {
                return Ok(None);
            };

            let found = {
                let page = page.read()?;
                match page.next_used_slot(*next_slot) {
                    Some(slot) => Some((slot, page.tuple_at(slot)?)),
                    None => None,
                }
            };
            if let Some((slot, tuple)) = found {
                *next_slot = slot + 1;
                return Ok(Some(tuple));
            }

            let next_page = *page_number + 1;
            if next_page >= self.file.num_pages()? {
                self.state = ScanState::Exhausted;
                return Ok(None);
            }
            self.state = ScanState::Active {
                page_number: next_page,
                page: self.fetch(next_page)?,
                next_slot: 0,
            };
        }
    }
}

impl<C: PageCache> DbFileIterator for HeapFileIterator<C> {
    fn open(&mut self) -> Result<()> {
        self.lookahead = None;
        self.state = if self.file.num_pages()? == 0 {
            ScanState::Exhausted
        } else {
            ScanState::Active {
                page_number: 0,
                page: self.fetch(0)?,
                next_slot: 0,
            }
        };
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.read_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(Error::NoSuchElement);
        }
        self.lookahead.take().ok_or(Error::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.state = ScanState::Unopened;
        self.lookahead = None;
    }
}
