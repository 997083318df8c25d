use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use pcd_core::pointcloud::metadata::{BoundingVolume, Metadata, MetadataValue};
use pcd_core::{Error, Result};

use super::format::PointFormat;
use super::vlr::{read_fixed_string, VariableLengthRecord};

pub const LAS_SIGNATURE: &[u8; 4] = b"LASF";
pub const MIN_HEADER_SIZE: u16 = 227;
const LAS14_HEADER_SIZE: u16 = 375;

/// The public header block plus the VLRs that follow it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub file_source_id: u16,
    pub global_encoding: u16,
    pub project_id: String,
    pub version_major: u8,
    pub version_minor: u8,
    pub system_id: String,
    pub software_id: String,
    pub creation_doy: u16,
    pub creation_year: u16,
    pub header_size: u16,
    pub data_offset: u32,
    pub point_format: PointFormat,
    pub compressed: bool,
    pub record_length: u16,
    pub point_count: u64,
    pub points_by_return: [u32; 5],
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub bounds: BoundingVolume,
    pub vlrs: Vec<VariableLengthRecord>,
}

fn truncated(err: io::Error, what: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::InvalidHeader(format!("stream ends inside the {}", what))
    } else {
        Error::Io(err)
    }
}

fn format_guid(raw: &[u8; 16]) -> String {
    let data1 = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let data2 = u16::from_le_bytes([raw[4], raw[5]]);
    let data3 = u16::from_le_bytes([raw[6], raw[7]]);
    let tail: String = raw[10..].iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{}",
        data1, data2, data3, raw[8], raw[9], tail
    )
}

/// Header fields exactly as stored, before interpretation.
struct RawHeader {
    file_source_id: u16,
    global_encoding: u16,
    guid: [u8; 16],
    version_major: u8,
    version_minor: u8,
    system_id: String,
    software_id: String,
    creation_doy: u16,
    creation_year: u16,
    header_size: u16,
    data_offset: u32,
    vlr_count: u32,
    stored_format: u8,
    record_length: u16,
    legacy_count: u32,
    points_by_return: [u32; 5],
    scale: [f64; 3],
    offset: [f64; 3],
    bounds: BoundingVolume,
}

impl RawHeader {
    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let file_source_id = r.read_u16::<LittleEndian>()?;
        let global_encoding = r.read_u16::<LittleEndian>()?;
        let mut guid = [0u8; 16];
        r.read_exact(&mut guid)?;
        let version_major = r.read_u8()?;
        let version_minor = r.read_u8()?;
        let system_id = read_fixed_string(r, 32)?;
        let software_id = read_fixed_string(r, 32)?;
        let creation_doy = r.read_u16::<LittleEndian>()?;
        let creation_year = r.read_u16::<LittleEndian>()?;
        let header_size = r.read_u16::<LittleEndian>()?;
        let data_offset = r.read_u32::<LittleEndian>()?;
        let vlr_count = r.read_u32::<LittleEndian>()?;
        let stored_format = r.read_u8()?;
        let record_length = r.read_u16::<LittleEndian>()?;
        let legacy_count = r.read_u32::<LittleEndian>()?;

        let mut points_by_return = [0u32; 5];
        r.read_u32_into::<LittleEndian>(&mut points_by_return)?;
        let mut scale = [0f64; 3];
        r.read_f64_into::<LittleEndian>(&mut scale)?;
        let mut offset = [0f64; 3];
        r.read_f64_into::<LittleEndian>(&mut offset)?;

        // stored as max x, min x, max y, min y, max z, min z
        let mut extents = [0f64; 6];
        r.read_f64_into::<LittleEndian>(&mut extents)?;
        let bounds = BoundingVolume {
            min: [extents[1], extents[3], extents[5]],
            max: [extents[0], extents[2], extents[4]],
        };

        Ok(Self {
            file_source_id,
            global_encoding,
            guid,
            version_major,
            version_minor,
            system_id,
            software_id,
            creation_doy,
            creation_year,
            header_size,
            data_offset,
            vlr_count,
            stored_format,
            record_length,
            legacy_count,
            points_by_return,
            scale,
            offset,
            bounds,
        })
    }
}

impl Header {
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut signature = [0u8; 4];
        reader
            .read_exact(&mut signature)
            .map_err(|e| truncated(e, "file signature"))?;
        if &signature != LAS_SIGNATURE {
            return Err(Error::InvalidHeader(
                "missing LASF file signature".to_string(),
            ));
        }

        let raw = RawHeader::read_from(reader).map_err(|e| truncated(e, "public header block"))?;
        let (point_format, compressed) = PointFormat::from_stored(raw.stored_format)?;

        if raw.header_size < MIN_HEADER_SIZE {
            return Err(Error::InvalidHeader(format!(
                "header size {} is below the minimum of {}",
                raw.header_size, MIN_HEADER_SIZE
            )));
        }

        let mut point_count = raw.legacy_count as u64;
        if (raw.version_major, raw.version_minor) >= (1, 4)
            && raw.header_size >= LAS14_HEADER_SIZE
            && raw.legacy_count == 0
        {
            // waveform start, EVLR start and EVLR count precede the 64-bit count
            reader.seek(SeekFrom::Start(247))?;
            point_count = reader
                .read_u64::<LittleEndian>()
                .map_err(|e| truncated(e, "LAS 1.4 header fields"))?;
        }

        let mut header = Self {
            file_source_id: raw.file_source_id,
            global_encoding: raw.global_encoding,
            project_id: format_guid(&raw.guid),
            version_major: raw.version_major,
            version_minor: raw.version_minor,
            system_id: raw.system_id,
            software_id: raw.software_id,
            creation_doy: raw.creation_doy,
            creation_year: raw.creation_year,
            header_size: raw.header_size,
            data_offset: raw.data_offset,
            point_format,
            compressed,
            record_length: raw.record_length,
            point_count,
            points_by_return: raw.points_by_return,
            scale: raw.scale,
            offset: raw.offset,
            bounds: raw.bounds,
            vlrs: Vec::new(),
        };
        header.validate()?;

        reader.seek(SeekFrom::Start(header.header_size as u64))?;
        for i in 0..raw.vlr_count {
            let vlr = VariableLengthRecord::read_from(reader)
                .map_err(|e| truncated(e, &format!("variable length record {}", i)))?;
            header.vlrs.push(vlr);
        }

        log::debug!(
            "LAS {}.{} header: format {}, {} points, {} VLRs, compressed={}",
            header.version_major,
            header.version_minor,
            header.point_format.id(),
            header.point_count,
            header.vlrs.len(),
            header.compressed
        );

        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if (self.data_offset as u64) < self.header_size as u64 {
            return Err(Error::InvalidHeader(format!(
                "point data offset {} lies inside the {}-byte header",
                self.data_offset, self.header_size
            )));
        }
        let required = self.point_format.record_size();
        if (self.record_length as usize) < required {
            return Err(Error::InvalidHeader(format!(
                "record length {} is too short for point format {} ({} bytes)",
                self.record_length,
                self.point_format.id(),
                required
            )));
        }
        if self.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(Error::InvalidHeader(format!(
                "invalid scale factors {:?}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Header scalars and VLRs as name/value pairs.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.add("compressed", MetadataValue::Bool(self.compressed));
        metadata.add(
            "dataformatid",
            MetadataValue::UInt(self.point_format.id() as u64),
        );
        metadata.add("version_major", MetadataValue::UInt(self.version_major as u64));
        metadata.add("version_minor", MetadataValue::UInt(self.version_minor as u64));
        metadata.add("filesource_id", MetadataValue::UInt(self.file_source_id as u64));
        metadata.add("reserved", MetadataValue::UInt(self.global_encoding as u64));
        metadata.add("project_id", MetadataValue::Text(self.project_id.clone()));
        metadata.add("system_id", MetadataValue::Text(self.system_id.clone()));
        metadata.add("software_id", MetadataValue::Text(self.software_id.clone()));
        metadata.add("creation_doy", MetadataValue::UInt(self.creation_doy as u64));
        metadata.add("creation_year", MetadataValue::UInt(self.creation_year as u64));
        metadata.add("header_size", MetadataValue::UInt(self.header_size as u64));
        metadata.add("dataoffset", MetadataValue::UInt(self.data_offset as u64));

        for (axis, i) in [("x", 0), ("y", 1), ("z", 2)] {
            metadata.add(&format!("scale_{}", axis), MetadataValue::Float(self.scale[i]));
        }
        for (axis, i) in [("x", 0), ("y", 1), ("z", 2)] {
            metadata.add(&format!("offset_{}", axis), MetadataValue::Float(self.offset[i]));
        }
        for (axis, i) in [("x", 0), ("y", 1), ("z", 2)] {
            metadata.add(&format!("min{}", axis), MetadataValue::Float(self.bounds.min[i]));
        }
        for (axis, i) in [("x", 0), ("y", 1), ("z", 2)] {
            metadata.add(&format!("max{}", axis), MetadataValue::Float(self.bounds.max[i]));
        }
        metadata.add("count", MetadataValue::UInt(self.point_count));

        for (i, vlr) in self.vlrs.iter().enumerate() {
            metadata
                .add(&format!("vlr_{}", i), MetadataValue::Bytes(vlr.data.clone()))
                .attribute("reserved", vlr.reserved)
                .attribute("user_id", &vlr.user_id)
                .attribute("record_id", vlr.record_id)
                .attribute("description", &vlr.description);
        }

        metadata
    }
}
