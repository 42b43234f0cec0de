use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use heapdb_catalog::catalog::{Catalog, TableId};
use heapdb_catalog::field::Field;
use heapdb_catalog::schema::{Schema, SchemaRef};
use heapdb_error::{errinput, errschema, Error};
use tracing::{debug, warn};

use crate::buffer_pool::BufferPool;
use crate::config::{page_size, BufferPoolConfig};
use crate::heap::heap_file::HeapFile;
use crate::heap::heap_file_iterator::HeapFileIterator;
use crate::page::heap_page::HeapPage;
use crate::record_id::RecordId;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::Result;

/// Ties the catalog to the buffer pool: every table the catalog knows about is a heap file in
/// the data directory, registered with the pool under its catalog-assigned id.
pub struct StorageEngine {
    data_dir: PathBuf,
    catalog: RwLock<Catalog>,
    pool: Arc<BufferPool>,
}

impl StorageEngine {
    /// Creates an engine that keeps its heap files in `data_dir`, creating the directory if needed.
    pub fn new(data_dir: impl AsRef<Path>, config: BufferPoolConfig) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            Error::IO(format!("Unable to create data directory {}: {}", data_dir.display(), e))
        })?;
        Ok(Self {
            data_dir,
            catalog: RwLock::new(Catalog::new()),
            pool: Arc::new(BufferPool::new(config)),
        })
    }

    /// Creates table `name`, stored in `<data_dir>/<name>.dat`. If the file can't be opened or
    /// registered, the table is dropped from the catalog again.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<TableId> {
        if HeapPage::num_slots_for(&schema) == 0 {
            return errschema!(
                "a {} byte tuple doesn't fit in a {} byte page",
                schema.size(),
                page_size()
            );
        }

        let mut catalog = self.catalog.write()?;
        let table_id = catalog.create_table(name, schema)?;
        let schema = match catalog.table_with_id(table_id) {
            Some(info) => info.schema().clone(),
            None => return errinput!("table {} vanished from the catalog", name),
        };
        if let Err(e) = self.bind_file(name, schema, table_id) {
            catalog.remove_table(table_id);
            warn!(table_id, name, error = %e, "failed to create table");
            return Err(e);
        }
        debug!(table_id, name, "created table");
        Ok(table_id)
    }

    fn bind_file(&self, name: &str, schema: SchemaRef, table_id: TableId) -> Result<()> {
        let file = HeapFile::new(self.data_dir.join(format!("{}.dat", name)), schema, table_id)?;
        self.pool.register_file(Arc::new(file))
    }

    pub fn table_id(&self, name: &str) -> Result<Option<TableId>> {
        Ok(self.catalog.read()?.table_with_name(name).map(|info| info.id()))
    }

    pub fn schema(&self, table_id: TableId) -> Result<SchemaRef> {
        match self.catalog.read()?.table_with_id(table_id) {
            Some(info) => Ok(info.schema().clone()),
            None => errinput!("no table with id {}", table_id),
        }
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Starts a transaction.
    pub fn begin(&self) -> TransactionId {
        TransactionId::new()
    }

    pub fn insert(
        &self,
        tid: TransactionId,
        table_id: TableId,
        fields: Vec<Field>,
    ) -> Result<RecordId> {
        self.pool.insert_tuple(tid, table_id, &mut Tuple::new(fields))
    }

    pub fn delete(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        self.pool.delete_tuple(tid, tuple)
    }

    /// Returns an unopened cursor over table `table_id`.
    pub fn scan(&self, tid: TransactionId, table_id: TableId) -> Result<HeapFileIterator<BufferPool>> {
        Ok(self.pool.file(table_id)?.iter(self.pool.clone(), tid))
    }

    pub fn commit(&self, tid: TransactionId) -> Result<()> {
        self.pool.transaction_complete(tid, true)
    }

    pub fn abort(&self, tid: TransactionId) -> Result<()> {
        self.pool.transaction_complete(tid, false)
    }
}

#[cfg(test)]
mod tests {
    use heapdb_catalog::types::Type;
    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;
    use crate::heap::heap_file_iterator::DbFileIterator;

    fn schema() -> Schema {
        Schema::from_pairs([(Type::Integer, "id"), (Type::Float, "score")])
    }

    #[test]
    #[serial]
    fn test_create_tables() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(dir.path().join("data"), BufferPoolConfig::default()).unwrap();

        let a = engine.create_table("a", schema()).unwrap();
        let b = engine.create_table("b", schema()).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.table_id("a").unwrap(), Some(a));
        assert_eq!(engine.table_id("c").unwrap(), None);
        assert_eq!(engine.schema(b).unwrap().num_columns(), 2);
        assert!(dir.path().join("data").join("a.dat").exists());

        assert!(matches!(
            engine.create_table("a", schema()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(engine.schema(99), Err(Error::InvalidInput(_))));
    }

    #[test]
    #[serial]
    fn test_create_table_over_corrupt_file() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(dir.path(), BufferPoolConfig::default()).unwrap();
        let path = dir.path().join("t.dat");
        std::fs::write(&path, [0u8; 10]).unwrap();

        assert!(matches!(
            engine.create_table("t", schema()),
            Err(Error::CorruptPage(_))
        ));
        assert_eq!(engine.table_id("t").unwrap(), None);
        assert!(matches!(engine.schema(0), Err(Error::InvalidInput(_))));

        // Once the file is repaired the name can be used.
        std::fs::write(&path, [0u8; 0]).unwrap();
        let table = engine.create_table("t", schema()).unwrap();
        assert_eq!(engine.table_id("t").unwrap(), Some(table));
        assert_eq!(engine.pool().file(table).unwrap().num_pages().unwrap(), 0);

        let tid = engine.begin();
        engine
            .insert(tid, table, vec![Field::Integer(1), Field::Float(0.5)])
            .unwrap();
        engine.commit(tid).unwrap();
    }

    #[test]
    #[serial]
    fn test_insert_scan_delete() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(dir.path(), BufferPoolConfig::default()).unwrap();
        let table = engine.create_table("scores", schema()).unwrap();

        let tid = engine.begin();
        for i in 0..10 {
            engine
                .insert(tid, table, vec![Field::Integer(i), Field::Float(i as f64 / 2.0)])
                .unwrap();
        }

        let mut scan = engine.scan(tid, table).unwrap();
        scan.open().unwrap();
        let mut victim = None;
        let mut count = 0;
        while scan.has_next().unwrap() {
            let tuple = scan.next().unwrap();
            if tuple.field(0).unwrap() == &Field::Integer(4) {
                victim = Some(tuple);
            }
            count += 1;
        }
        assert_eq!(count, 10);

        engine.delete(tid, &victim.unwrap()).unwrap();
        engine.commit(tid).unwrap();

        let tid = engine.begin();
        let mut scan = engine.scan(tid, table).unwrap();
        scan.open().unwrap();
        let mut ids = Vec::new();
        while scan.has_next().unwrap() {
            ids.push(scan.next().unwrap().field(0).unwrap().clone());
        }
        assert_eq!(ids.len(), 9);
        assert!(!ids.contains(&Field::Integer(4)));
    }

    #[test]
    #[serial]
    fn test_abort_discards_inserts() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(dir.path(), BufferPoolConfig::default()).unwrap();
        let table = engine.create_table("t", schema()).unwrap();

        let tid = engine.begin();
        engine
            .insert(tid, table, vec![Field::Integer(1), Field::Float(1.0)])
            .unwrap();
        engine.abort(tid).unwrap();

        let tid = engine.begin();
        let mut scan = engine.scan(tid, table).unwrap();
        scan.open().unwrap();
        assert!(!scan.has_next().unwrap());
    }

    #[test]
    #[serial]
    fn test_unknown_table() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(dir.path(), BufferPoolConfig::default()).unwrap();
        let tid = engine.begin();
        assert!(matches!(
            engine.insert(tid, 3, vec![Field::Integer(1)]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(engine.scan(tid, 3), Err(Error::InvalidInput(_))));
    }
}
