use std::fs::{File, OpenOptions};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use fs2::FileExt;
use heapdb_catalog::schema::SchemaRef;
use heapdb_error::{errcorrupt, errinput, errschema, Error};
use tracing::{debug, trace, warn};

use crate::cache::PageCache;
use crate::config::page_size;
use crate::heap::heap_file_iterator::HeapFileIterator;
use crate::page::heap_page::HeapPage;
use crate::page::PageRef;
use crate::record_id::HeapPageId;
use crate::transaction::{Permission, TransactionId};
use crate::tuple::Tuple;
use crate::typedef::{PageNumber, TableId};
use crate::Result;

/// A table stored as an unordered collection of tuples in a single file.
///
/// The file is nothing but a run of [`HeapPage`]s: page `p` occupies bytes
/// `[p * page_size, (p + 1) * page_size)`, there is no file header and no page is ever missing.
/// The heap file itself caches nothing. Pages are fetched through a [`PageCache`], which owns them
/// while they're in memory and writes them back through [`HeapFile::write_page`].
#[derive(Debug)]
pub struct HeapFile {
    file: Mutex<File>,
    path: PathBuf,
    schema: SchemaRef,
    table_id: TableId,
}

impl HeapFile {
    /// Opens the heap file at `path`, creating it if it doesn't exist. Existing contents are kept.
    pub fn new(path: impl AsRef<Path>, schema: SchemaRef, table_id: TableId) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if HeapPage::num_slots_for(&schema) == 0 {
            return errschema!(
                "a {} byte tuple doesn't fit in a {} byte page",
                schema.size(),
                page_size()
            );
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;

        let heap_file = Self {
            file: Mutex::new(file),
            path,
            schema,
            table_id,
        };
        let num_pages = heap_file.num_pages()?;
        debug!(table_id, num_pages, path = %heap_file.path.display(), "opened heap file");
        Ok(heap_file)
    }

    /// Opens the heap file at `path` outside of any catalog. Its table id is derived from the
    /// canonical path, so reopening the same file always yields the same id.
    pub fn open(path: impl AsRef<Path>, schema: SchemaRef) -> Result<Self> {
        let heap_file = Self::new(path, schema, 0)?;
        let canonical = std::fs::canonicalize(&heap_file.path)?;
        let mut hasher = DefaultHasher::new();
        canonical.hash(&mut hasher);
        Ok(Self {
            table_id: hasher.finish() as TableId,
            ..heap_file
        })
    }

    pub fn id(&self) -> TableId {
        self.table_id
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> Result<PageNumber> {
        let file = FileGuard::acquire(&self.file)?;
        page_count(&file)
    }

    /// Reads page `pid` straight from disk.
    pub fn read_page(&self, pid: HeapPageId) -> Result<HeapPage> {
        self.check_owns(pid)?;
        let mut file = FileGuard::acquire(&self.file)?;
        let num_pages = page_count(&file)?;
        if pid.page_number() >= num_pages {
            return Err(Error::PageOutOfRange {
                page_number: pid.page_number(),
                num_pages,
            });
        }

        let mut data = vec![0; page_size()];
        file.seek(SeekFrom::Start(offset_of(pid)))?;
        file.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::CorruptPage(format!("page {} is truncated", pid)),
            _ => e.into(),
        })?;
        drop(file);

        trace!(%pid, "read page");
        HeapPage::new(pid, self.schema.clone(), &data)
    }

    /// Writes `page` to its place in the file. Writing the page right past the last one appends
    /// it; anything further out would leave a hole and is rejected.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.id();
        self.check_owns(pid)?;
        let mut file = FileGuard::acquire(&self.file)?;
        let num_pages = page_count(&file)?;
        if pid.page_number() > num_pages {
            return Err(Error::PageOutOfRange {
                page_number: pid.page_number(),
                num_pages,
            });
        }

        write_at(&mut file, pid, &page.serialize())?;

        if pid.page_number() == num_pages {
            debug!(%pid, "allocated page");
        } else {
            trace!(%pid, "wrote page");
        }
        Ok(())
    }

    /// Appends an empty page to the file and returns its id. Counting the pages and writing the
    /// new one happen under a single file lock, so concurrent callers always get distinct pages
    /// and never overwrite one that's already there.
    pub fn allocate_page(&self) -> Result<HeapPageId> {
        let mut file = FileGuard::acquire(&self.file)?;
        let pid = HeapPageId::new(self.table_id, page_count(&file)?);
        let page = HeapPage::empty(pid, self.schema.clone())?;
        write_at(&mut file, pid, &page.serialize())?;
        debug!(%pid, "allocated page");
        Ok(pid)
    }

    /// Stores `tuple` in the lowest free slot of the lowest page that has one, appending a fresh
    /// page when every page is full. On success the tuple carries its new record id, and the
    /// returned pages (always exactly one) have been marked dirty by `tid`.
    pub fn insert_tuple<C: PageCache + ?Sized>(
        &self,
        cache: &C,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        tuple.check(&self.schema)?;
        if let Some(rid) = tuple.record_id() {
            return errinput!("tuple is already stored at {}", rid);
        }

        for page_number in 0..self.num_pages()? {
            let pid = HeapPageId::new(self.table_id, page_number);
            let page = cache.get_page(tid, pid, Permission::ReadWrite)?;
            let inserted = {
                let mut page = page.write()?;
                if page.first_free_slot().is_some() {
                    page.insert_tuple(tuple)?;
                    page.mark_dirty(true, tid);
                    true
                } else {
                    false
                }
            };
            if inserted {
                return Ok(vec![page]);
            }
        }

        let pid = self.allocate_page()?;
        let page = cache.get_page(tid, pid, Permission::ReadWrite)?;
        {
            let mut page = page.write()?;
            page.insert_tuple(tuple)?;
            page.mark_dirty(true, tid);
        }
        Ok(vec![page])
    }

    /// Frees the slot `tuple` is stored in. The slot's bytes stay on the page until it's reused.
    pub fn delete_tuple<C: PageCache + ?Sized>(
        &self,
        cache: &C,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let Some(rid) = tuple.record_id() else {
            return errinput!("tuple has no record id");
        };
        let pid = rid.page_id();
        if pid.table_id() != self.table_id {
            return errinput!("tuple {} is not stored in table {}", rid, self.table_id);
        }
        let num_pages = self.num_pages()?;
        if pid.page_number() >= num_pages {
            return errinput!("tuple {} is on page past the end of a {} page file", rid, num_pages);
        }

        let page = cache.get_page(tid, pid, Permission::ReadWrite)?;
        {
            let mut page = page.write()?;
            page.delete_tuple(tuple)?;
            page.mark_dirty(true, tid);
        }
        Ok(vec![page])
    }

    /// Returns a cursor over every tuple in the file, reading pages through `cache` on behalf of
    /// `tid`.
    pub fn iter<C: PageCache>(
        self: Arc<Self>,
        cache: Arc<C>,
        tid: TransactionId,
    ) -> HeapFileIterator<C> {
        HeapFileIterator::new(self, cache, tid)
    }

    fn check_owns(&self, pid: HeapPageId) -> Result<()> {
        if pid.table_id() != self.table_id {
            return errinput!("page {} does not belong to table {}", pid, self.table_id);
        }
        Ok(())
    }
}

fn offset_of(pid: HeapPageId) -> u64 {
    pid.page_number() as u64 * page_size() as u64
}

fn write_at(file: &mut File, pid: HeapPageId, data: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset_of(pid)))?;
    file.write_all(data)?;
    file.sync_data()?;
    Ok(())
}

fn page_count(file: &File) -> Result<PageNumber> {
    let len = file.metadata()?.len();
    let page_size = page_size() as u64;
    if len % page_size != 0 {
        return errcorrupt!(
            "file length {} is not a multiple of the page size {}",
            len,
            page_size
        );
    }
    Ok(PageNumber::try_from(len / page_size)?)
}

/// Exclusive access to the file for the duration of one call: the in-process mutex plus an
/// advisory lock against other processes. Both are released when the guard is dropped.
struct FileGuard<'a> {
    file: MutexGuard<'a, File>,
}

impl<'a> FileGuard<'a> {
    fn acquire(file: &'a Mutex<File>) -> Result<Self> {
        let file = file.lock()?;
        FileExt::lock_exclusive(&*file)
            .map_err(|e| Error::IO(format!("Failed to acquire exclusive file lock: {}", e)))?;
        Ok(Self { file })
    }
}

impl Deref for FileGuard<'_> {
    type Target = File;

    fn deref(&self) -> &File {
        &self.file
    }
}

impl DerefMut for FileGuard<'_> {
    fn deref_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&*self.file) {
            warn!("Failed to release file lock: {}", e);
        }
    }
}
