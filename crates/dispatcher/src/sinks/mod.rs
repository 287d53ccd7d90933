//! Row writer implementations
//!
//! Contains CsvFileWriter and MemoryWriter.

mod file;
mod memory;

pub use self::file::CsvFileWriter;
pub use self::memory::{MemoryWriter, WriterLog};
