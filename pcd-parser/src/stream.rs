//! Byte streams the reader pulls point data from.
//!
//! Every iterator allocates its own stream so that several iterators over
//! the same reader never share a file position.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pcd_core::Result;

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub trait StreamFactory: Send + Sync {
    fn allocate(&self) -> Result<Box<dyn ReadSeek>>;

    fn describe(&self) -> String;
}

pub struct FileStreamFactory {
    path: PathBuf,
}

impl FileStreamFactory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StreamFactory for FileStreamFactory {
    fn allocate(&self) -> Result<Box<dyn ReadSeek>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves an in-memory copy of a file.
pub struct MemoryStreamFactory {
    bytes: Arc<[u8]>,
}

impl MemoryStreamFactory {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl StreamFactory for MemoryStreamFactory {
    fn allocate(&self) -> Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.bytes.clone())))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}
