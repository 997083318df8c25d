pub mod reader;
pub mod stream;

pub use reader::las::{LasReader, ReaderOptions};
