use crate::column::Column;
use crate::field::Field;
use crate::types::{Type, STRING_LEN};
use heapdb_error::{errschema, Error, Result};
use std::sync::Arc;

pub type SchemaRef = Arc<Schema>;

/// The schema of a tuple, a.k.a. its tuple descriptor. Contains metadata about the columns
/// corresponding to the tuple's values.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Schema {
    /// The column definitions of the tuple's values, in order.
    columns: Vec<Column>,
    /// The fixed byte width of a serialized tuple, i.e. the sum of the sizes of its columns.
    size: usize,
}

impl Schema {
    pub fn new(columns: &[Column]) -> Self {
        let columns = columns.to_vec();
        let size = columns.iter().map(|c| c.size()).sum();
        Schema { columns, size }
    }

    /// Builds a schema from `(type, name)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (Type, &'a str)>) -> Self {
        let columns = pairs
            .into_iter()
            .map(|(ty, name)| Column::new(name.to_string(), ty))
            .collect::<Vec<_>>();
        Self::new(&columns)
    }

    /// Moves all the columns of `other` into `self`, consuming `other`.
    ///
    /// Because `Schema` stores its columns in a `Vec`, this method will panic if the new column
    /// vector capacity exceeds `isize::MAX` _bytes_ (see [`Vec::append`]).
    pub fn append(&mut self, mut other: Self) {
        self.size += other.size;
        self.columns.append(&mut other.columns);
    }

    /// Returns an immutable view of the columns.
    pub fn columns(&self) -> &Vec<Column> {
        &self.columns
    }

    /// Given an index `i`, retrieves a reference to the schema's `i`-th column (if it exists).
    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or(Error::OutOfBounds)
    }

    /// Looks and up and returns the index of the column in the schema with the given name, if
    /// one exists. If more than one column has the given name, returns the index of the first
    /// such column.
    pub fn column_index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_i, col)| col.name() == name)
            .map(|(i, _)| i)
    }

    /// Returns the number of columns in the schema.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the fixed byte width of a serialized tuple.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Checks that `fields` has exactly one value per column, each of the column's type. Strings
    /// longer than [`STRING_LEN`] bytes are rejected, since they wouldn't survive being stored.
    pub fn check(&self, fields: &[Field]) -> Result<()> {
        if fields.len() != self.columns.len() {
            return errschema!(
                "expected {} fields, got {}",
                self.columns.len(),
                fields.len()
            );
        }
        for (i, (field, column)) in fields.iter().zip(&self.columns).enumerate() {
            if field.get_type() != column.field_type() {
                return errschema!(
                    "field {} ({}) should be {}, got {}",
                    i,
                    column.name(),
                    column.field_type(),
                    field.get_type()
                );
            }
            if let Field::Varchar(string) = field {
                if string.len() > STRING_LEN {
                    return errschema!(
                        "field {} ({}) is {} bytes long, at most {} fit",
                        i,
                        column.name(),
                        string.len(),
                        STRING_LEN
                    );
                }
            }
        }
        Ok(())
    }
}

/// Formats as `name(Type), ...`, e.g. `id(Integer), name(Varchar)`.
impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", columns.join(", "))
    }
}
