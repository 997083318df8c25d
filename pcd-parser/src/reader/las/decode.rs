use byteorder::{ByteOrder, LittleEndian};

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::pointcloud::dimension::FieldValue;

use super::dimensions::PointDimensions;
use super::format::{PointFormat, BASE_RECORD_SIZE, COLOR_SIZE, GPS_TIME_SIZE};

/// The packed return byte of formats 0 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnFlags {
    pub return_number: u8,
    pub number_of_returns: u8,
    pub scan_direction: u8,
    pub edge_of_flight_line: u8,
}

impl ReturnFlags {
    pub fn unpack(byte: u8) -> Self {
        Self {
            return_number: byte & 0x07,
            number_of_returns: (byte >> 3) & 0x07,
            scan_direction: (byte >> 6) & 0x01,
            edge_of_flight_line: (byte >> 7) & 0x01,
        }
    }
}

#[inline]
fn put<T: FieldValue>(
    buffer: &mut PointBuffer,
    position: Option<usize>,
    index: usize,
    value: T,
) {
    if let Some(position) = position {
        buffer.set_field(position, index, value);
    }
}

/// Decodes `count` records laid out `stride` bytes apart into buffer slots
/// `0..count`. Bytes past the format's own fields are ignored.
pub fn decode_points(
    records: &[u8],
    stride: usize,
    format: PointFormat,
    dims: &PointDimensions,
    buffer: &mut PointBuffer,
    count: usize,
) {
    assert!(stride >= format.record_size());
    assert!(records.len() >= stride * count);

    for i in 0..count {
        let record = &records[i * stride..(i + 1) * stride];
        decode_record(record, format, dims, buffer, i);
    }
}

fn decode_record(
    record: &[u8],
    format: PointFormat,
    dims: &PointDimensions,
    buffer: &mut PointBuffer,
    i: usize,
) {
    put(buffer, dims.x, i, LittleEndian::read_i32(&record[0..4]));
    put(buffer, dims.y, i, LittleEndian::read_i32(&record[4..8]));
    put(buffer, dims.z, i, LittleEndian::read_i32(&record[8..12]));
    put(buffer, dims.intensity, i, LittleEndian::read_u16(&record[12..14]));

    let flags = ReturnFlags::unpack(record[14]);
    put(buffer, dims.return_number, i, flags.return_number);
    put(buffer, dims.number_of_returns, i, flags.number_of_returns);
    put(buffer, dims.scan_direction, i, flags.scan_direction);
    put(buffer, dims.edge_of_flight_line, i, flags.edge_of_flight_line);

    put(buffer, dims.classification, i, record[15]);
    put(buffer, dims.scan_angle, i, record[16] as i8);
    put(buffer, dims.user_data, i, record[17]);
    put(buffer, dims.point_source_id, i, LittleEndian::read_u16(&record[18..20]));

    let mut at = BASE_RECORD_SIZE;
    if format.has_time() {
        put(buffer, dims.time, i, LittleEndian::read_f64(&record[at..at + 8]));
        at += GPS_TIME_SIZE;
    }
    if format.has_color() {
        put(buffer, dims.red, i, LittleEndian::read_u16(&record[at..at + 2]));
        put(buffer, dims.green, i, LittleEndian::read_u16(&record[at + 2..at + 4]));
        put(buffer, dims.blue, i, LittleEndian::read_u16(&record[at + 4..at + 6]));
        at += COLOR_SIZE;
    }
    if format.has_waveform() {
        put(buffer, dims.packet_index, i, record[at]);
        put(buffer, dims.waveform_offset, i, LittleEndian::read_u64(&record[at + 1..at + 9]));
        put(buffer, dims.waveform_size, i, LittleEndian::read_u32(&record[at + 9..at + 13]));
        put(buffer, dims.return_location, i, LittleEndian::read_f32(&record[at + 13..at + 17]));
        put(buffer, dims.waveform_xt, i, LittleEndian::read_f32(&record[at + 17..at + 21]));
        put(buffer, dims.waveform_yt, i, LittleEndian::read_f32(&record[at + 21..at + 25]));
        put(buffer, dims.waveform_zt, i, LittleEndian::read_f32(&record[at + 25..at + 29]));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pcd_core::pointcloud::schema::Schema;

    use super::*;
    use crate::reader::las::dimensions::default_dimensions;
    use crate::reader::las::fixture::{FixturePoint, LasFixture};

    #[test]
    fn unpacks_return_byte() {
        let flags = ReturnFlags::unpack(0b1011_0101);
        assert_eq!(flags.return_number, 5);
        assert_eq!(flags.number_of_returns, 6);
        assert_eq!(flags.scan_direction, 0);
        assert_eq!(flags.edge_of_flight_line, 1);
    }

    #[test]
    fn decodes_format_5_record() {
        let mut fixture = LasFixture::new(5);
        fixture.points = vec![FixturePoint::sample(3), FixturePoint::sample(4)];
        let records = fixture.point_data();

        let schema = Arc::new(Schema::new(default_dimensions([1.0; 3], [0.0; 3])));
        let dims = PointDimensions::resolve(&schema).unwrap();
        let mut buffer = PointBuffer::new(schema.clone(), 2);
        let format = PointFormat::new(5).unwrap();
        decode_points(&records, fixture.stride(), format, &dims, &mut buffer, 2);

        let p = FixturePoint::sample(4);
        let at = |name: &str| schema.index_of(name).unwrap();
        assert_eq!(buffer.get_field::<i32>(at("X"), 1), p.x);
        assert_eq!(buffer.get_field::<i32>(at("Y"), 1), p.y);
        assert_eq!(buffer.get_field::<u16>(at("Intensity"), 1), p.intensity);
        assert_eq!(buffer.get_field::<u8>(at("ReturnNumber"), 1), 5);
        assert_eq!(buffer.get_field::<u8>(at("NumberOfReturns"), 1), 5);
        assert_eq!(buffer.get_field::<i8>(at("ScanAngleRank"), 1), p.scan_angle);
        assert_eq!(buffer.get_field::<f64>(at("Time"), 1), p.gps_time);
        assert_eq!(buffer.get_field::<u16>(at("Blue"), 1), p.rgb[2]);
        assert_eq!(buffer.get_field::<u64>(at("WaveformDataOffset"), 1), p.waveform_offset);
        assert_eq!(buffer.get_field::<u32>(at("WaveformPacketSize"), 1), 64);
        assert_eq!(buffer.get_field::<f32>(at("WaveformYt"), 1), -0.5);
        assert_eq!(buffer.get_field::<u8>(at("EdgeOfFlightLine"), 0), 1);
    }

    #[test]
    fn ignores_extra_bytes() {
        let mut fixture = LasFixture::new(0);
        fixture.record_length = Some(26);
        fixture.points = (0..3).map(FixturePoint::sample).collect();
        let records = fixture.point_data();
        assert_eq!(records.len(), 78);

        let table = default_dimensions([1.0; 3], [0.0; 3]);
        let schema = Arc::new(Schema::select(&table, &["Z", "Classification"]).unwrap());
        let dims = PointDimensions::resolve(&schema).unwrap();
        let mut buffer = PointBuffer::new(schema, 3);
        decode_points(&records, 26, PointFormat::new(0).unwrap(), &dims, &mut buffer, 3);

        for i in 0..3 {
            assert_eq!(buffer.get_field::<i32>(0, i), FixturePoint::sample(i as u32).z);
            assert_eq!(buffer.get_field::<u8>(1, i), (i % 8) as u8);
        }
    }
}
