//! Builds small LAS files in memory for tests. Only depends on std so
//! integration tests can pull it in with `#[path]`.

#![allow(dead_code)]

#[derive(Debug, Clone)]
pub struct FixtureVlr {
    pub user_id: String,
    pub record_id: u16,
    pub description: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixturePoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,
    pub flags: u8,
    pub classification: u8,
    pub scan_angle: i8,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: f64,
    pub rgb: [u16; 3],
    pub wave_packet_index: u8,
    pub waveform_offset: u64,
    pub waveform_size: u32,
    pub return_location: f32,
    pub xt: f32,
    pub yt: f32,
    pub zt: f32,
}

impl FixturePoint {
    /// A deterministic point whose fields all differ with `i`.
    pub fn sample(i: u32) -> Self {
        let return_number = (i % 5 + 1) as u8;
        let number_of_returns = 5u8;
        let scan_direction = (i % 2) as u8;
        let edge = (i % 3 == 0) as u8;
        Self {
            x: 1000 + i as i32 * 10,
            y: -2000 + i as i32 * 7,
            z: i as i32 * 3,
            intensity: (i * 11) as u16,
            flags: return_number | number_of_returns << 3 | scan_direction << 6 | edge << 7,
            classification: (i % 8) as u8,
            scan_angle: (i as i32 % 90 - 45) as i8,
            user_data: i as u8,
            point_source_id: 7,
            gps_time: 1000.5 + i as f64,
            rgb: [(i * 100) as u16, (i * 200) as u16, (i * 300) as u16],
            wave_packet_index: 1,
            waveform_offset: 4096 + i as u64 * 64,
            waveform_size: 64,
            return_location: 12.5,
            xt: 0.25,
            yt: -0.5,
            zt: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LasFixture {
    pub format: u8,
    pub compressed: bool,
    pub version: (u8, u8),
    pub record_length: Option<u16>,
    pub declared_vlrs: Option<u32>,
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub vlrs: Vec<FixtureVlr>,
    pub points: Vec<FixturePoint>,
}

fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(len, 0);
    bytes
}

impl LasFixture {
    pub fn new(format: u8) -> Self {
        Self {
            format,
            compressed: false,
            version: (1, 2),
            record_length: None,
            declared_vlrs: None,
            scale: [0.01, 0.01, 0.01],
            offset: [100.0, 200.0, 0.0],
            min: [110.0, 180.0, 0.0],
            max: [130.0, 190.0, 5.0],
            vlrs: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn base_record_size(format: u8) -> usize {
        let mut size = 20;
        if matches!(format, 1 | 3 | 4 | 5) {
            size += 8;
        }
        if matches!(format, 2 | 3 | 5) {
            size += 6;
        }
        if matches!(format, 4 | 5) {
            size += 29;
        }
        size
    }

    pub fn stride(&self) -> usize {
        self.record_length
            .map(|l| l as usize)
            .unwrap_or_else(|| Self::base_record_size(self.format))
    }

    pub fn encode_point(&self, p: &FixturePoint) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
        out.extend_from_slice(&p.z.to_le_bytes());
        out.extend_from_slice(&p.intensity.to_le_bytes());
        out.push(p.flags);
        out.push(p.classification);
        out.push(p.scan_angle as u8);
        out.push(p.user_data);
        out.extend_from_slice(&p.point_source_id.to_le_bytes());
        if matches!(self.format, 1 | 3 | 4 | 5) {
            out.extend_from_slice(&p.gps_time.to_le_bytes());
        }
        if matches!(self.format, 2 | 3 | 5) {
            for channel in p.rgb {
                out.extend_from_slice(&channel.to_le_bytes());
            }
        }
        if matches!(self.format, 4 | 5) {
            out.push(p.wave_packet_index);
            out.extend_from_slice(&p.waveform_offset.to_le_bytes());
            out.extend_from_slice(&p.waveform_size.to_le_bytes());
            out.extend_from_slice(&p.return_location.to_le_bytes());
            out.extend_from_slice(&p.xt.to_le_bytes());
            out.extend_from_slice(&p.yt.to_le_bytes());
            out.extend_from_slice(&p.zt.to_le_bytes());
        }
        let stride = self.stride();
        if out.len() < stride {
            // extra bytes
            out.resize(stride, 0xEE);
        }
        out
    }

    pub fn point_data(&self) -> Vec<u8> {
        self.points.iter().flat_map(|p| self.encode_point(p)).collect()
    }

    pub fn data_offset(&self) -> usize {
        let vlr_bytes: usize = self.vlrs.iter().map(|v| 54 + v.data.len()).sum();
        227 + vlr_bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"LASF");
        out.extend_from_slice(&0u16.to_le_bytes()); // file source id
        out.extend_from_slice(&0u16.to_le_bytes()); // global encoding
        out.extend_from_slice(&[0u8; 16]); // project id
        out.push(self.version.0);
        out.push(self.version.1);
        out.extend(padded("FIXTURE", 32));
        out.extend(padded("pcd-parser tests", 32));
        out.extend_from_slice(&1u16.to_le_bytes()); // creation day
        out.extend_from_slice(&2024u16.to_le_bytes()); // creation year
        out.extend_from_slice(&227u16.to_le_bytes());
        out.extend_from_slice(&(self.data_offset() as u32).to_le_bytes());
        let vlr_count = self.declared_vlrs.unwrap_or(self.vlrs.len() as u32);
        out.extend_from_slice(&vlr_count.to_le_bytes());
        let stored_format = if self.compressed {
            self.format | 0x80
        } else {
            self.format
        };
        out.push(stored_format);
        out.extend_from_slice(&(self.stride() as u16).to_le_bytes());
        out.extend_from_slice(&(self.points.len() as u32).to_le_bytes());
        let mut by_return = [0u32; 5];
        for p in &self.points {
            let rn = (p.flags & 0x07) as usize;
            if (1..=5).contains(&rn) {
                by_return[rn - 1] += 1;
            }
        }
        for count in by_return {
            out.extend_from_slice(&count.to_le_bytes());
        }
        for v in self.scale.iter().chain(self.offset.iter()) {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for axis in 0..3 {
            out.extend_from_slice(&self.max[axis].to_le_bytes());
            out.extend_from_slice(&self.min[axis].to_le_bytes());
        }
        assert_eq!(out.len(), 227);

        for vlr in &self.vlrs {
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend(padded(&vlr.user_id, 16));
            out.extend_from_slice(&vlr.record_id.to_le_bytes());
            out.extend_from_slice(&(vlr.data.len() as u16).to_le_bytes());
            out.extend(padded(&vlr.description, 32));
            out.extend_from_slice(&vlr.data);
        }

        out.extend(self.point_data());
        out
    }
}
