pub mod heap_file;
pub mod heap_file_iterator;
