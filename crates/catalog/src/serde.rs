use crate::field::Field;
use crate::schema::Schema;
use bytes::BufMut;
use heapdb_error::{errdata, Result};

/// A utility struct that provides a mapping between serialized tuple data (e.g. &[u8]) and its
/// deserialized, semantically meaningful counterpart: `Vec<Field>`. Deserialization requires a
/// schema, which itself is an instruction set for how to interpret the bytes of a given payload.
///
/// Every type has a fixed width, so a row is serialized as the plain concatenation of its fields
/// in schema order, and the result is always exactly `schema.size()` bytes:
///     -----------------------------------------
///     | FIELD 0 | FIELD 1 | ... | FIELD n - 1 |
///     -----------------------------------------
///
/// For example, a tuple [1, "hi", 3] with schema (INTEGER, VARCHAR, INTEGER) would be
/// serialized as follows:
///
/// ```text
///     1_i32 -> [1, 0, 0, 0] (in little endian)
///     "hi"  -> [2, 0, 0, 0, 104, 105, 0, 0, ... 0] (length prefix, then 128 padded bytes)
///     3_i32 -> [3, 0, 0, 0] (in little endian)
/// ```
///
/// ==> [1, 0, 0, 0, 2, 0, 0, 0, 104, 105, 0, ... 0, 3, 0, 0, 0]   (140 bytes)
pub struct Serde {}
impl Serde {
    pub fn serialize(row: &[Field]) -> Vec<u8> {
        let size = row.iter().map(|field| field.get_type().size()).sum::<usize>();
        let mut bytes = Vec::with_capacity(size);
        Self::serialize_into(row, &mut bytes);
        bytes
    }

    /// Serializes `row` directly into `buf`, e.g. into a tuple slot of a page.
    pub fn serialize_into(row: &[Field], buf: &mut impl BufMut) {
        for field in row {
            field.write_to(buf);
        }
    }

    pub fn deserialize(bytes: &[u8], schema: &Schema) -> Result<Vec<Field>> {
        if bytes.len() != schema.size() {
            return errdata!(
                "tuple needs {} bytes, got {}",
                schema.size(),
                bytes.len()
            );
        }
        let mut fields = Vec::with_capacity(schema.num_columns());
        let mut i = 0;
        for column in schema.columns() {
            let size = column.size();
            fields.push(Field::from_bytes(&bytes[i..i + size], column.field_type())?);
            i += size;
        }
        Ok(fields)
    }
}
