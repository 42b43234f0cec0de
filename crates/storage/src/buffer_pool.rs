use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use heapdb_error::{errinput, Error};
use tracing::debug;

use crate::cache::PageCache;
use crate::config::BufferPoolConfig;
use crate::heap::heap_file::HeapFile;
use crate::lock::lock_manager::LockManager;
use crate::page::PageRef;
use crate::record_id::{HeapPageId, RecordId};
use crate::replacer::lru_replacer::LruReplacer;
use crate::replacer::replacer::Replacer;
use crate::transaction::{Permission, TransactionId};
use crate::tuple::Tuple;
use crate::typedef::{FrameId, TableId};
use crate::Result;

#[derive(Debug)]
struct PoolInner {
    frames: Vec<Option<PageRef>>, // Storage for all frames in the buffer pool
    page_table: HashMap<HeapPageId, FrameId>, // Maps page IDs to frame IDs
    replacer: Box<dyn Replacer>, // Handles page replacement policy (LRU)
    free_list: VecDeque<FrameId>, // List of free frames
}

/// Caches pages of registered heap files and hands them out to transactions under page locks.
///
/// Every page fetch first takes a page lock for the transaction (shared for `ReadOnly`,
/// exclusive for `ReadWrite`), held until the transaction completes. Dirty pages stay in the pool
/// until their transaction commits, at which point they are written out; an abort instead rolls
/// them back to their before images. A page is only evicted when it is clean and nobody outside
/// the pool still holds a reference to it.
///
/// Lock order: lock manager, pool state, page, file.
#[derive(Debug)]
pub struct BufferPool {
    config: BufferPoolConfig,
    inner: Mutex<PoolInner>,
    files: RwLock<HashMap<TableId, Arc<HeapFile>>>,
    lock_manager: LockManager<HeapPageId>,
}

impl BufferPool {
    /// Initializes the buffer pool with `config.pool_size` frames.
    pub fn new(config: BufferPoolConfig) -> Self {
        let pool_size = config.pool_size;
        Self {
            config,
            inner: Mutex::new(PoolInner {
                frames: vec![None; pool_size],
                page_table: HashMap::new(),
                replacer: Box::new(LruReplacer::new()),
                free_list: (0..pool_size).collect(),
            }),
            files: RwLock::new(HashMap::new()),
            lock_manager: LockManager::new(),
        }
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.config
    }

    /// Makes the pages of `file` available through the pool.
    pub fn register_file(&self, file: Arc<HeapFile>) -> Result<()> {
        self.files.write()?.insert(file.id(), file);
        Ok(())
    }

    /// Returns the heap file registered for `table_id`.
    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        match self.files.read()?.get(&table_id) {
            Some(file) => Ok(file.clone()),
            None => errinput!("no heap file registered for table {}", table_id),
        }
    }

    /// Returns a free frame, evicting a page if necessary.
    fn free_frame(inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        // The replacer only knows about recency, so pin every frame whose page can't go right
        // now: it's dirty, or someone outside the pool still holds it.
        for (frame_id, frame) in inner.frames.iter().enumerate() {
            let Some(page) = frame else {
                continue;
            };
            if Arc::strong_count(page) > 1 || page.read()?.is_dirty().is_some() {
                inner.replacer.pin(frame_id);
            } else {
                inner.replacer.unpin(frame_id);
            }
        }
        let Some(frame_id) = inner.replacer.evict() else {
            return Err(Error::BufferPoolError(
                "No evictable frame in buffer pool".to_string(),
            ));
        };
        if let Some(page) = inner.frames[frame_id].take() {
            let pid = page.read()?.id();
            inner.page_table.remove(&pid);
            debug!(%pid, frame_id, "evicted page");
        }
        Ok(frame_id)
    }

    fn cached_pages(&self) -> Result<Vec<PageRef>> {
        let inner = self.inner.lock()?;
        Ok(inner.frames.iter().flatten().cloned().collect())
    }

    fn dirtied_by(&self, tid: TransactionId) -> Result<Vec<PageRef>> {
        let mut pages = Vec::new();
        for page in self.cached_pages()? {
            if page.read()?.is_dirty() == Some(tid) {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    /// Writes `page` to its heap file if it's dirty, and takes its contents as the new before
    /// image.
    fn write_back(&self, page: &PageRef) -> Result<()> {
        let mut page = page.write()?;
        let Some(tid) = page.is_dirty() else {
            return Ok(());
        };
        self.file(page.id().table_id())?.write_page(&page)?;
        page.mark_dirty(false, tid);
        page.set_before_image();
        debug!(pid = %page.id(), %tid, "flushed page");
        Ok(())
    }

    /// Writes page `pid` out if it's cached and dirty.
    pub fn flush_page(&self, pid: HeapPageId) -> Result<()> {
        let page = {
            let inner = self.inner.lock()?;
            inner
                .page_table
                .get(&pid)
                .and_then(|&frame_id| inner.frames[frame_id].clone())
        };
        match page {
            Some(page) => self.write_back(&page),
            None => Ok(()),
        }
    }

    /// Writes out every page dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        for page in self.dirtied_by(tid)? {
            self.write_back(&page)?;
        }
        Ok(())
    }

    /// Writes out every dirty page, whichever transaction dirtied it.
    pub fn flush_all_pages(&self) -> Result<()> {
        for page in self.cached_pages()? {
            self.write_back(&page)?;
        }
        Ok(())
    }

    /// Drops page `pid` from the pool without writing it out.
    pub fn discard_page(&self, pid: HeapPageId) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if let Some(frame_id) = inner.page_table.remove(&pid) {
            inner.frames[frame_id] = None;
            inner.replacer.remove(frame_id);
            inner.free_list.push_back(frame_id);
        }
        Ok(())
    }

    /// Releases `tid`'s lock on `pid` before the transaction completes.
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: HeapPageId) -> Result<()> {
        self.lock_manager.release(tid, pid)
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: HeapPageId) -> Result<bool> {
        self.lock_manager.holds_lock(tid, pid)
    }

    /// Returns every page `tid` holds a lock on.
    pub fn pages_locked_by(&self, tid: TransactionId) -> Result<Vec<HeapPageId>> {
        self.lock_manager.keys_locked_by(tid)
    }

    /// Stores `tuple` in table `table_id` on behalf of `tid` and returns where it went.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<RecordId> {
        let file = self.file(table_id)?;
        for page in file.insert_tuple(self, tid, tuple)? {
            page.write()?.mark_dirty(true, tid);
        }
        tuple
            .record_id()
            .ok_or_else(|| Error::InvalidData("inserted tuple has no record id".to_string()))
    }

    /// Deletes `tuple` from the table its record id points into, on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let Some(rid) = tuple.record_id() else {
            return errinput!("tuple has no record id");
        };
        let file = self.file(rid.page_id().table_id())?;
        for page in file.delete_tuple(self, tid, tuple)? {
            page.write()?.mark_dirty(true, tid);
        }
        Ok(())
    }

    /// Ends `tid`. A commit writes its dirty pages to disk; an abort reverts them to their before
    /// images. Either way, all of its locks are released.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            for page in self.dirtied_by(tid)? {
                let mut page = page.write()?;
                *page = page.before_image()?;
            }
        }
        self.lock_manager.release_all(tid)?;
        debug!(%tid, commit, "transaction complete");
        Ok(())
    }
}

impl PageCache for BufferPool {
    /// Returns page `pid`, reading it from its heap file on a miss. Blocks until `tid` is granted
    /// the lock `perm` asks for, and aborts the transaction if that takes longer than the lock
    /// timeout.
    fn get_page(&self, tid: TransactionId, pid: HeapPageId, perm: Permission) -> Result<PageRef> {
        self.lock_manager
            .acquire(tid, pid, perm, self.config.lock_timeout())?;

        let mut guard = self.inner.lock()?;
        let inner = &mut *guard;
        if let Some(&frame_id) = inner.page_table.get(&pid) {
            if let Some(page) = &inner.frames[frame_id] {
                inner.replacer.record_access(frame_id);
                return Ok(page.clone());
            }
        }

        let page = Arc::new(RwLock::new(self.file(pid.table_id())?.read_page(pid)?));
        let frame_id = Self::free_frame(inner)?;
        inner.frames[frame_id] = Some(page.clone());
        inner.page_table.insert(pid, frame_id);
        inner.replacer.record_access(frame_id);
        Ok(page)
    }
}
