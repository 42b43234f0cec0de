use crate::page::PageRef;
use crate::record_id::HeapPageId;
use crate::transaction::{Permission, TransactionId};
use crate::Result;

/// Where heap files and scans get their pages from.
///
/// An implementation may block until `tid` is granted the page lock `perm` asks for, and may give
/// up on the transaction instead (`Error::TransactionAborted`). The returned page is shared with
/// the cache: callers mutate it in place and mark it dirty, and never evict it themselves.
pub trait PageCache: Send + Sync {
    fn get_page(&self, tid: TransactionId, pid: HeapPageId, perm: Permission) -> Result<PageRef>;
}

/// A page cache for unit tests: it keeps every page it has handed out, never takes locks, and can
/// be told to abort the transaction on a given page.
#[cfg(test)]
pub(crate) mod test_cache {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, RwLock};

    use heapdb_error::Error;

    use super::PageCache;
    use crate::heap::heap_file::HeapFile;
    use crate::page::PageRef;
    use crate::record_id::HeapPageId;
    use crate::transaction::{Permission, TransactionId};
    use crate::typedef::PageNumber;
    use crate::Result;

    pub(crate) struct MemoryCache {
        file: Arc<HeapFile>,
        pages: Mutex<HashMap<HeapPageId, PageRef>>,
        fetches: AtomicUsize,
        abort_on: Mutex<Option<PageNumber>>,
    }

    impl MemoryCache {
        pub(crate) fn new(file: Arc<HeapFile>) -> Self {
            Self {
                file,
                pages: Mutex::new(HashMap::new()),
                fetches: AtomicUsize::new(0),
                abort_on: Mutex::new(None),
            }
        }

        /// Number of `get_page` calls so far.
        pub(crate) fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        /// Makes every later fetch of `page_number` fail with `TransactionAborted`.
        pub(crate) fn abort_on(&self, page_number: Option<PageNumber>) {
            *self.abort_on.lock().unwrap() = page_number;
        }

        /// Writes every cached page back to the file.
        pub(crate) fn flush(&self) {
            for page in self.pages.lock().unwrap().values() {
                self.file.write_page(&page.read().unwrap()).unwrap();
            }
        }
    }

    impl PageCache for MemoryCache {
        fn get_page(
            &self,
            tid: TransactionId,
            pid: HeapPageId,
            _perm: Permission,
        ) -> Result<PageRef> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if *self.abort_on.lock()? == Some(pid.page_number()) {
                return Err(Error::TransactionAborted(tid.id()));
            }
            let mut pages = self.pages.lock()?;
            if let Some(page) = pages.get(&pid) {
                return Ok(page.clone());
            }
            let page = Arc::new(RwLock::new(self.file.read_page(pid)?));
            pages.insert(pid, page.clone());
            Ok(page)
        }
    }
}
