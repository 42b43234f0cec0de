use std::fmt;

use heapdb_catalog::field::Field;
use heapdb_catalog::schema::Schema;
use heapdb_error::Error;

use crate::{record_id::RecordId, Result};

/// A row of field values. Once a tuple has been stored in a heap file it also carries the record id
/// of the slot it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            record_id: None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(Error::OutOfBounds)
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Checks that this tuple has the shape `schema` describes.
    pub fn check(&self, schema: &Schema) -> Result<()> {
        schema.check(&self.fields)
    }
}

impl From<Vec<Field>> for Tuple {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|field| field.to_string())
            .collect::<Vec<_>>()
            .join("\t");
        write!(f, "{}", fields)
    }
}
