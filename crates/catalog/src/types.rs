use serde::{Deserialize, Serialize};

/// The number of payload bytes reserved for every [`Type::Varchar`] value. Strings are stored in
/// fixed-width slots, so anything longer than this is truncated when serialized.
pub const STRING_LEN: usize = 128;

/// An exhaustive enumeration of all the data types of a [`crate::field::Field`] object.
///
/// Every type has a fixed on-disk width, which is what lets a heap page lay its tuples out in a
/// fixed-width slot array.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Integer,
    Float,
    Varchar,
}

impl Type {
    /// Returns the fixed byte size of a serialized value of this type.
    pub fn size(&self) -> usize {
        match self {
            Type::Boolean => 1,
            // We work with i32's, which are 4 bytes.
            Type::Integer => 4,
            // We work with f64's, which are 8 bytes.
            Type::Float => 8,
            // A u32 length prefix, followed by the zero-padded string payload.
            Type::Varchar => size_of::<u32>() + STRING_LEN,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{:?}", self))
    }
}
