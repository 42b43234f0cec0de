use crate::schema::{Schema, SchemaRef};
use heapdb_error::{errinput, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub type TableId = u32;

/// Stores metadata about a given table.
#[derive(Debug, Clone)]
pub struct TableInfo {
    id: TableId,
    name: String,
    schema: SchemaRef,
}

impl TableInfo {
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// A catalog of the tables known to the storage layer. It's the sole source of table identity:
/// ids are handed out monotonically, so two tables registered with the same catalog can never
/// collide the way ids derived from hashed file paths can.
///
/// The catalog is only consulted when a table's heap file is bound; the file keeps its own copy
/// of the id and schema afterward.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Maps table id -> table metadata.
    tables: HashMap<TableId, TableInfo>,
    /// Maps table name -> table id.
    table_names: HashMap<String, TableId>,
    /// The next `TableId` to be used.
    next_table_id: AtomicU32,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new table with the given name and schema, returning its freshly assigned id.
    ///
    /// NOTE: We do not allow more than one table to share the same table name!
    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<TableId> {
        if self.table_names.contains_key(name) {
            return errinput!("table {} already exists", name);
        }
        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        self.table_names.insert(name.to_string(), id);
        self.tables.insert(
            id,
            TableInfo {
                id,
                name: name.to_string(),
                schema: Arc::new(schema),
            },
        );
        Ok(id)
    }

    /// Unregisters the table with the given id, returning its metadata. The id is not handed out
    /// again.
    pub fn remove_table(&mut self, id: TableId) -> Option<TableInfo> {
        let info = self.tables.remove(&id)?;
        self.table_names.remove(info.name());
        Some(info)
    }

    /// Fetches the metadata for the table with given id, if one exists.
    pub fn table_with_id(&self, id: TableId) -> Option<&TableInfo> {
        self.tables.get(&id)
    }

    /// Fetches the metadata for the table with given name, if one exists.
    pub fn table_with_name(&self, name: &str) -> Option<&TableInfo> {
        let id = self.table_names.get(name)?;
        self.tables.get(id)
    }

    /// Returns the ids of every registered table, in creation order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids = self.tables.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}
