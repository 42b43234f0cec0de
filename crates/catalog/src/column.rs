use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// The name of this column. Names need not be unique within a schema.
    name: String,
    /// This column value's type.
    field_type: Type,
}

impl Column {
    pub fn new(name: String, field_type: Type) -> Self {
        Column { name, field_type }
    }

    /// Returns the name of this column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `field_type` of the column.
    pub fn field_type(&self) -> Type {
        self.field_type
    }

    /// Returns the fixed byte size of this column's field data.
    pub fn size(&self) -> usize {
        self.field_type.size()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::STRING_LEN;

    #[test]
    fn test_width_follows_type() {
        let widths = [
            (Type::Boolean, 1),
            (Type::Integer, 4),
            (Type::Float, 8),
            (Type::Varchar, 4 + STRING_LEN),
        ];
        for (ty, width) in widths {
            let column = Column::new("c".to_string(), ty);
            assert_eq!(column.field_type(), ty);
            assert_eq!(column.size(), width);
        }
    }

    #[test]
    fn test_name_and_type_both_matter() {
        let column = Column::new("id".to_string(), Type::Integer);
        assert_eq!(column, column.clone());
        assert_ne!(column, Column::new("key".to_string(), Type::Integer));
        assert_ne!(column, Column::new("id".to_string(), Type::Float));
        assert_eq!(column.to_string(), "id(Integer)");
    }
}
