/// Constructs a [`crate::Error::InvalidData`] for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => { $crate::Error::InvalidData(format!($($args)*)).into() };
}

/// Constructs a [`crate::Error::InvalidInput`] for the given format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => { $crate::Error::InvalidInput(format!($($args)*)).into() };
}

/// Constructs a [`crate::Error::CorruptPage`] for the given format string.
#[macro_export]
macro_rules! errcorrupt {
    ($($args:tt)*) => { $crate::Error::CorruptPage(format!($($args)*)).into() };
}

/// Constructs a [`crate::Error::SchemaMismatch`] for the given format string.
#[macro_export]
macro_rules! errschema {
    ($($args:tt)*) => { $crate::Error::SchemaMismatch(format!($($args)*)).into() };
}
