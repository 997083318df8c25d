use serde::Serialize;

use pcd_core::{Error, Result};

pub const BASE_RECORD_SIZE: usize = 20;
pub const GPS_TIME_SIZE: usize = 8;
pub const COLOR_SIZE: usize = 6;
pub const WAVEFORM_SIZE: usize = 29;

/// LAS point data record format, 0 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PointFormat(u8);

impl PointFormat {
    pub fn new(id: u8) -> Result<Self> {
        if id > 5 {
            return Err(Error::UnsupportedPointFormat(id));
        }
        Ok(Self(id))
    }

    /// Splits the stored format byte into the format and the compression
    /// flag. LASzip marks compressed files by setting bit 7 (older writers
    /// used bit 6).
    pub fn from_stored(byte: u8) -> Result<(Self, bool)> {
        let compressed = byte & 0xC0 != 0;
        Ok((Self::new(byte & 0x3F)?, compressed))
    }

    pub fn id(&self) -> u8 {
        self.0
    }

    pub fn has_time(&self) -> bool {
        matches!(self.0, 1 | 3 | 4 | 5)
    }

    pub fn has_color(&self) -> bool {
        matches!(self.0, 2 | 3 | 5)
    }

    pub fn has_waveform(&self) -> bool {
        matches!(self.0, 4 | 5)
    }

    /// Bytes this format defines per record. Files may declare a longer
    /// record length to carry extra bytes after these fields.
    pub fn record_size(&self) -> usize {
        let mut size = BASE_RECORD_SIZE;
        if self.has_time() {
            size += GPS_TIME_SIZE;
        }
        if self.has_color() {
            size += COLOR_SIZE;
        }
        if self.has_waveform() {
            size += WAVEFORM_SIZE;
        }
        size
    }
}
