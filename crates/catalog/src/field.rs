use crate::types::{Type, STRING_LEN};
use bytes::{Buf, BufMut};
use heapdb_error::{errdata, Result};

/// Represents a view over a SQL value stored in some materialized state. Normally, tuple data is
/// passed around as a byte slice (e.g. a slot inside a heap page); you can think of this `Field`
/// class as being the value type the tuple data consists of once it's deserialized with its
/// corresponding schema.
///
/// Every field serializes to exactly [`Type::size`] bytes, so a row of fields always has the
/// fixed width its schema promises:
/// ```
///  use heapdb_catalog::field::Field;
///  use heapdb_catalog::types::Type;
///
///  let field = Field::Varchar("hi".into());
///  let bytes = field.to_bytes();
///  assert_eq!(bytes.len(), Type::Varchar.size());
///  assert_eq!(&bytes[..6], &[2, 0, 0, 0, b'h', b'i']);
/// ```
#[derive(Debug, Clone)]
pub enum Field {
    Boolean(bool),
    Integer(i32),
    Float(f64),
    Varchar(String),
}

impl Field {
    /// Serializes a field into an owned byte vector of exactly `self.get_type().size()` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.get_type().size());
        self.write_to(&mut bytes);
        bytes
    }

    /// Appends the fixed-width encoding of this field to `buf`.
    ///
    /// Note that [`Field::Float`], [`Field::Integer`] and the length prefix of
    /// [`Field::Varchar`] are written in **little-endian** form! Strings longer than
    /// [`STRING_LEN`] bytes are cut at the last character boundary that fits.
    pub fn write_to(&self, buf: &mut impl BufMut) {
        match self {
            Field::Boolean(value) => buf.put_u8(u8::from(*value)),
            Field::Integer(value) => buf.put_i32_le(*value),
            Field::Float(value) => buf.put_f64_le(*value),
            Field::Varchar(string) => {
                let mut end = string.len().min(STRING_LEN);
                while !string.is_char_boundary(end) {
                    end -= 1;
                }
                buf.put_u32_le(end as u32);
                buf.put_slice(&string.as_bytes()[..end]);
                buf.put_bytes(0, STRING_LEN - end);
            }
        }
    }

    /// Deserializes a byte slice into a field, given the field's underlying data type, which is
    /// represented by a [`crate::types::Type`].
    ///
    /// The slice must be exactly `field_type.size()` bytes long. Booleans other than 0/1, string
    /// lengths past [`STRING_LEN`] and invalid UTF-8 are all rejected as invalid data.
    pub fn from_bytes(mut bytes: &[u8], field_type: Type) -> Result<Self> {
        if bytes.len() != field_type.size() {
            return errdata!(
                "{} field needs {} bytes, got {}",
                field_type,
                field_type.size(),
                bytes.len()
            );
        }
        let field = match field_type {
            Type::Boolean => match bytes.get_u8() {
                0 => Field::Boolean(false),
                1 => Field::Boolean(true),
                other => return errdata!("invalid boolean byte {}", other),
            },
            Type::Integer => Field::Integer(bytes.get_i32_le()),
            Type::Float => Field::Float(bytes.get_f64_le()),
            Type::Varchar => {
                let len = bytes.get_u32_le() as usize;
                if len > STRING_LEN {
                    return errdata!("string length {} exceeds {}", len, STRING_LEN);
                }
                Field::Varchar(String::from_utf8(bytes[..len].to_vec())?)
            }
        };
        Ok(field)
    }

    /// Returns the corresponding [`crate::types::Type`] for the given field.
    pub fn get_type(&self) -> Type {
        match self {
            Field::Boolean(_) => Type::Boolean,
            Field::Integer(_) => Type::Integer,
            Field::Float(_) => Type::Float,
            Field::Varchar(_) => Type::Varchar,
        }
    }
}

impl From<bool> for Field {
    fn from(b: bool) -> Self {
        Field::Boolean(b)
    }
}

impl From<i32> for Field {
    fn from(i: i32) -> Self {
        Field::Integer(i)
    }
}

impl From<f64> for Field {
    fn from(f: f64) -> Self {
        Field::Float(f)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Varchar(s.to_owned())
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Boolean(a), Field::Boolean(b)) => a.eq(b),
            (Field::Integer(a), Field::Integer(b)) => a.eq(b),
            (Field::Varchar(a), Field::Varchar(b)) => a.eq(b),
            (Field::Float(a), Field::Float(b)) => {
                // Match on NaN, in addition to equality, for floats.
                a.eq(b) || (a.is_nan() && b.is_nan())
            }
            _ => false,
        }
    }
}
impl Eq for Field {}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Integer(i) => i.fmt(f),
            Self::Float(float) => float.fmt(f),
            Self::Varchar(varchar) => write!(f, "{}", varchar.escape_default()),
        }
    }
}
