//! Tabular ingestion: reading rows from files and normalizing them into tickets.

pub mod normalizer;
pub mod parser;

pub use normalizer::{HeaderNormalizer, PositionalNormalizer, RowLayout, RowNormalizer};
pub use parser::FileSource;
