//! Compressed point payloads.
//!
//! A [`CodecFactory`] is picked once when the reader is built. Each iterator
//! over a compressed file opens its own [`CodecSession`] on its own stream,
//! positioned at the point data offset.

use laz::{LasZipDecompressor, LazVlr};

use pcd_core::{Error, Result};

use super::header::Header;
use crate::stream::ReadSeek;

pub const LASZIP_USER_ID: &str = "laszip encoded";
pub const LASZIP_RECORD_ID: u16 = 22204;

pub trait CodecFactory: Send + Sync {
    fn name(&self) -> &str;

    /// `stream` is already positioned at the header's point data offset.
    fn open(&self, header: &Header, stream: Box<dyn ReadSeek>) -> Result<Box<dyn CodecSession>>;
}

pub trait CodecSession {
    /// Fills `record` with the next point record, exactly
    /// `header.record_length` bytes.
    fn read_record(&mut self, record: &mut [u8]) -> Result<()>;

    /// Positions the session so the next record is point `index`.
    fn seek(&mut self, index: u64) -> Result<()>;
}

/// LASzip through the `laz` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazCodec;

impl CodecFactory for LazCodec {
    fn name(&self) -> &str {
        "laszip"
    }

    fn open(&self, header: &Header, stream: Box<dyn ReadSeek>) -> Result<Box<dyn CodecSession>> {
        let vlr = header
            .vlrs
            .iter()
            .find(|vlr| vlr.is(LASZIP_USER_ID, LASZIP_RECORD_ID))
            .ok_or_else(|| Error::Codec("file has no laszip VLR".to_string()))?;

        let laz_vlr = LazVlr::from_buffer(&vlr.data)
            .map_err(|e| Error::Codec(format!("failed to parse laszip VLR: {}", e)))?;
        let decompressor = LasZipDecompressor::new(stream, laz_vlr)
            .map_err(|e| Error::Codec(format!("failed to open laszip session: {}", e)))?;

        log::debug!(
            "opened laszip session for point format {}",
            header.point_format.id()
        );
        Ok(Box::new(LazSession { decompressor }))
    }
}

struct LazSession {
    decompressor: LasZipDecompressor<'static, Box<dyn ReadSeek>>,
}

impl CodecSession for LazSession {
    fn read_record(&mut self, record: &mut [u8]) -> Result<()> {
        self.decompressor
            .decompress_one(record)
            .map_err(|e| Error::Codec(format!("failed to decompress point: {}", e)))
    }

    fn seek(&mut self, index: u64) -> Result<()> {
        self.decompressor
            .seek(index)
            .map_err(|e| Error::Codec(format!("failed to seek to point {}: {}", index, e)))
    }
}
