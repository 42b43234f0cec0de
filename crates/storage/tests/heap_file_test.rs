use std::sync::Arc;
use std::thread;
use std::time::Duration;

use heapdb_catalog::field::Field;
use heapdb_catalog::schema::{Schema, SchemaRef};
use heapdb_catalog::types::Type;
use heapdb_error::Error;
use heapdb_storage::buffer_pool::BufferPool;
use heapdb_storage::cache::PageCache;
use heapdb_storage::config::{page_size, reset_page_size, set_page_size, BufferPoolConfig};
use heapdb_storage::heap::heap_file::HeapFile;
use heapdb_storage::heap::heap_file_iterator::DbFileIterator;
use heapdb_storage::record_id::{HeapPageId, RecordId};
use heapdb_storage::transaction::{Permission, TransactionId};
use heapdb_storage::tuple::Tuple;
use serial_test::serial;
use tempfile::{tempdir, TempDir};

const TABLE: u32 = 5;

/// Shrinks pages to 42 bytes, which fits exactly ten single-integer tuples per page, until
/// dropped.
struct SmallPages;

impl SmallPages {
    fn new() -> Self {
        set_page_size(42);
        SmallPages
    }
}

impl Drop for SmallPages {
    fn drop(&mut self) {
        reset_page_size();
    }
}

fn int_schema() -> SchemaRef {
    Arc::new(Schema::from_pairs([(Type::Integer, "v")]))
}

fn int_tuple(v: i32) -> Tuple {
    Tuple::new(vec![Field::Integer(v)])
}

fn open(dir: &TempDir) -> (Arc<HeapFile>, Arc<BufferPool>) {
    let file = Arc::new(HeapFile::new(dir.path().join("heap.dat"), int_schema(), TABLE).unwrap());
    let config = BufferPoolConfig::new(50).with_lock_timeout(Duration::from_millis(100));
    let pool = Arc::new(BufferPool::new(config));
    pool.register_file(file.clone()).unwrap();
    (file, pool)
}

fn scan(file: &Arc<HeapFile>, pool: &Arc<BufferPool>, tid: TransactionId) -> Vec<Tuple> {
    let mut iter = file.clone().iter(pool.clone(), tid);
    iter.open().unwrap();
    let mut tuples = Vec::new();
    while iter.has_next().unwrap() {
        tuples.push(iter.next().unwrap());
    }
    iter.close();
    tuples
}

fn rid(page_number: u32, slot: usize) -> RecordId {
    RecordId::new(HeapPageId::new(TABLE, page_number), slot)
}

#[test]
#[serial]
fn test_small_page_scenario() {
    let _pages = SmallPages::new();
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();

    let mut rids = Vec::new();
    for v in 0..25 {
        rids.push(pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap());
    }
    assert_eq!(file.num_pages().unwrap(), 3);
    assert_eq!(rids[24], rid(2, 4));
    let last = pool.get_page(tid, HeapPageId::new(TABLE, 2), Permission::ReadOnly).unwrap();
    let last_page = last.read().unwrap();
    assert_eq!(last_page.num_slots(), 10);
    assert_eq!(last_page.num_slots() - last_page.empty_slot_count(), 5);
    drop(last_page);

    let mut victim = int_tuple(3);
    victim.set_record_id(Some(rid(0, 3)));
    pool.delete_tuple(tid, &victim).unwrap();

    let remaining = scan(&file, &pool, tid);
    assert_eq!(remaining.len(), 24);
    assert!(remaining.iter().all(|t| t.record_id() != Some(rid(0, 3))));

    let reused = pool.insert_tuple(tid, TABLE, &mut int_tuple(100)).unwrap();
    assert_eq!(reused, rid(0, 3));
    assert_eq!(file.num_pages().unwrap(), 3);
}

#[test]
#[serial]
fn test_scan_is_ordered_and_complete() {
    let _pages = SmallPages::new();
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();
    for v in 0..37 {
        pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
    }

    let tuples = scan(&file, &pool, tid);
    let rids = tuples.iter().map(|t| t.record_id().unwrap()).collect::<Vec<_>>();
    let mut sorted = rids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(rids, sorted);
    assert_eq!(rids.len(), 37);

    let values = tuples.iter().map(|t| t.field(0).unwrap().clone()).collect::<Vec<_>>();
    assert_eq!(values, (0..37).map(Field::Integer).collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_full_file_grows_by_one_page() {
    let _pages = SmallPages::new();
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();
    for v in 0..20 {
        pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();
    assert_eq!(file.num_pages().unwrap(), 2);

    let tid = TransactionId::new();
    let placed = pool.insert_tuple(tid, TABLE, &mut int_tuple(20)).unwrap();
    assert_eq!(placed, rid(2, 0));
    assert_eq!(file.num_pages().unwrap(), 3);

    let len = std::fs::metadata(file.path()).unwrap().len();
    assert_eq!(len, 3 * page_size() as u64);
}

#[test]
#[serial]
fn test_mismatched_insert_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();
    for v in 0..3 {
        pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();
    let before = std::fs::read(file.path()).unwrap();

    let tid = TransactionId::new();
    let mut wide = Tuple::new(vec![Field::Integer(1), Field::Integer(2)]);
    assert!(matches!(
        pool.insert_tuple(tid, TABLE, &mut wide),
        Err(Error::SchemaMismatch(_))
    ));
    let mut wrong_type = Tuple::new(vec![Field::Varchar("one".to_string())]);
    assert!(matches!(
        pool.insert_tuple(tid, TABLE, &mut wrong_type),
        Err(Error::SchemaMismatch(_))
    ));
    pool.flush_all_pages().unwrap();

    assert_eq!(std::fs::read(file.path()).unwrap(), before);
}

#[test]
#[serial]
fn test_rewind_reproduces_scan() {
    let _pages = SmallPages::new();
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();
    for v in 0..15 {
        pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
    }

    let mut iter = file.clone().iter(pool.clone(), tid);
    iter.open().unwrap();
    let mut first = Vec::new();
    while iter.has_next().unwrap() {
        first.push(iter.next().unwrap());
    }
    assert!(matches!(iter.next(), Err(Error::NoSuchElement)));

    iter.rewind().unwrap();
    let mut second = Vec::new();
    while iter.has_next().unwrap() {
        second.push(iter.next().unwrap());
    }
    assert_eq!(first, second);
}

#[test]
#[serial]
fn test_write_lock_blocks_reader_until_timeout() {
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let writer = TransactionId::new();
    pool.insert_tuple(writer, TABLE, &mut int_tuple(1)).unwrap();

    let reader = TransactionId::new();
    let mut iter = file.clone().iter(pool.clone(), reader);
    assert_eq!(
        iter.open().unwrap_err(),
        Error::TransactionAborted(reader.id())
    );
    pool.transaction_complete(reader, false).unwrap();

    pool.transaction_complete(writer, true).unwrap();
    let reader = TransactionId::new();
    assert_eq!(scan(&file, &pool, reader).len(), 1);
}

#[test]
#[serial]
fn test_concurrent_readers() {
    let _pages = SmallPages::new();
    let dir = tempdir().unwrap();
    let (file, pool) = open(&dir);
    let tid = TransactionId::new();
    for v in 0..50 {
        pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();

    let readers = (0..4)
        .map(|_| {
            let file = file.clone();
            let pool = pool.clone();
            thread::spawn(move || {
                let tid = TransactionId::new();
                let count = scan(&file, &pool, tid).len();
                pool.transaction_complete(tid, true).unwrap();
                count
            })
        })
        .collect::<Vec<_>>();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 50);
    }
}

#[test]
#[serial]
fn test_commit_is_durable_and_abort_is_not() {
    let dir = tempdir().unwrap();
    {
        let (file, pool) = open(&dir);
        let tid = TransactionId::new();
        for v in 0..3 {
            pool.insert_tuple(tid, TABLE, &mut int_tuple(v)).unwrap();
        }
        pool.transaction_complete(tid, true).unwrap();

        let tid = TransactionId::new();
        pool.insert_tuple(tid, TABLE, &mut int_tuple(99)).unwrap();
        let mut first = int_tuple(0);
        first.set_record_id(Some(rid(0, 0)));
        pool.delete_tuple(tid, &first).unwrap();
        pool.transaction_complete(tid, false).unwrap();

        // The abort rolled the cached page back, too.
        assert_eq!(scan(&file, &pool, TransactionId::new()).len(), 3);
    }

    let (file, pool) = open(&dir);
    let values = scan(&file, &pool, TransactionId::new())
        .into_iter()
        .map(|t| t.into_fields())
        .collect::<Vec<_>>();
    assert_eq!(
        values,
        vec![
            vec![Field::Integer(0)],
            vec![Field::Integer(1)],
            vec![Field::Integer(2)]
        ]
    );
}
