use thiserror::Error;

use crate::stage::IteratorKind;

#[derive(Debug, Error)]
pub enum Error {
    // configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("stage '{stage}' does not provide a {kind} iterator")]
    UnsupportedIterator { stage: String, kind: IteratorKind },

    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("point data is compressed but no compression codec is configured")]
    CodecUnavailable,

    // format
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported point data format {0}")]
    UnsupportedPointFormat(u8),

    #[error("unexpected end of stream while reading point {index}")]
    UnexpectedEof { index: u64 },

    #[error("compressed point data: {0}")]
    Codec(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // contract
    #[error("seek index {index} is beyond the point count {count}")]
    SeekOutOfRange { index: u64, count: u64 },

    #[error("dimension '{0}' is required but absent from the buffer schema")]
    MissingDimension(String),
}

pub type Result<T> = std::result::Result<T, Error>;
