use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

pub const VLR_HEADER_SIZE: usize = 54;

/// A variable length record, kept verbatim for pass-through reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableLengthRecord {
    pub reserved: u16,
    pub user_id: String,
    pub record_id: u16,
    pub description: String,
    pub data: Vec<u8>,
}

impl VariableLengthRecord {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let reserved = reader.read_u16::<LittleEndian>()?;
        let user_id = read_fixed_string(reader, 16)?;
        let record_id = reader.read_u16::<LittleEndian>()?;
        let length = reader.read_u16::<LittleEndian>()?;
        let description = read_fixed_string(reader, 32)?;

        let mut data = vec![0u8; length as usize];
        reader.read_exact(&mut data)?;

        Ok(Self {
            reserved,
            user_id,
            record_id,
            description,
            data,
        })
    }

    pub fn is(&self, user_id: &str, record_id: u16) -> bool {
        self.user_id == user_id && self.record_id == record_id
    }
}

/// Reads a NUL-padded ASCII field.
pub(crate) fn read_fixed_string<R: Read>(reader: &mut R, len: usize) -> io::Result<String> {
    let mut raw = vec![0u8; len];
    reader.read_exact(&mut raw)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&raw[..end]).trim_end().to_string())
}
