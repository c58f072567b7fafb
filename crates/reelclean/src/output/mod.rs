//! Writing cleaned tables and run reports to disk.

mod persistence;
mod writer;

pub use writer::{write_csv, CsvWriter};
