pub type Result<T> = std::result::Result<T, Error>;
impl<T> From<Error> for Result<T> {
    fn from(e: Error) -> Self {
        Err(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Invalid data, which typically includes decoding errors or unexpected internal values.
    InvalidData(String),
    /// Invalid caller input, e.g. a record id that doesn't belong to the file it was handed to.
    InvalidInput(String),
    /// An IO error has occurred.
    IO(String),
    /// An out-of-bounds access has occurred.
    OutOfBounds,
    /// A tuple's shape doesn't match the tuple descriptor it's checked against.
    SchemaMismatch(String),
    /// Page bytes (or a file length) are inconsistent with the expected page layout.
    CorruptPage(String),
    /// A direct lookup of a page past the end of its file.
    PageOutOfRange { page_number: u32, num_pages: u32 },
    /// The lock manager gave up on the given transaction; it must be rolled back.
    TransactionAborted(u64),
    /// An iterator was asked for an element it doesn't have.
    NoSuchElement,
    /// A buffer pool error has occured.
    BufferPoolError(String),
}

impl std::error::Error for Error {}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::IO(msg) => write!(f, "IO error: {}", msg),
            Error::OutOfBounds => write!(f, "Out of bounds"),
            Error::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            Error::CorruptPage(msg) => write!(f, "Corrupt page: {}", msg),
            Error::PageOutOfRange {
                page_number,
                num_pages,
            } => write!(
                f,
                "Page {} is out of range for a file with {} pages",
                page_number, num_pages
            ),
            Error::TransactionAborted(tid) => write!(f, "Transaction {} aborted", tid),
            Error::NoSuchElement => write!(f, "No more elements"),
            Error::BufferPoolError(msg) => write!(f, "Buffer error: {}", msg),
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::InvalidData(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::InvalidInput(msg.to_string())
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IO(e.to_string())
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(e: std::num::TryFromIntError) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        // This occurs when a different thread panics when holding a mutex. Since this is
        // fatal, we should panic here too.
        panic!("{e}")
    }
}
