use pcd_core::pointcloud::dimension::{Dimension, Interpretation};
use pcd_core::pointcloud::schema::Schema;
use pcd_core::{Error, Result};

use Interpretation::{Float, SignedInteger, UnsignedInteger};

struct DimensionSpec {
    name: &'static str,
    interpretation: Interpretation,
    byte_size: usize,
    uuid: &'static str,
    description: &'static str,
}

const fn spec(
    name: &'static str,
    interpretation: Interpretation,
    byte_size: usize,
    uuid: &'static str,
    description: &'static str,
) -> DimensionSpec {
    DimensionSpec {
        name,
        interpretation,
        byte_size,
        uuid,
        description,
    }
}

#[rustfmt::skip]
const LAS_DIMENSIONS: &[DimensionSpec] = &[
    spec("X", SignedInteger, 4, "2ee118d1-119e-4906-99c3-42934203f872",
        "Scaled integer x coordinate; multiply by the header scale and add the offset."),
    spec("Y", SignedInteger, 4, "87707eee-2f30-4979-9987-8ef747e30275",
        "Scaled integer y coordinate; multiply by the header scale and add the offset."),
    spec("Z", SignedInteger, 4, "e74b5e41-95e6-4cf2-86ad-e3f5a996da5d",
        "Scaled integer z coordinate; multiply by the header scale and add the offset."),
    spec("Time", Float, 8, "aec43586-2711-4e59-9df0-65aca78a4ffc",
        "GPS time the point was acquired."),
    spec("Intensity", UnsignedInteger, 2, "61e90c9a-42fc-46c7-acd3-20d67bd5626f",
        "Pulse return magnitude as recorded by the sensor."),
    spec("ReturnNumber", UnsignedInteger, 1, "ffe5e5f8-4cec-4560-abf0-448008f7b89e",
        "Index of this return within its pulse, starting at 1."),
    spec("NumberOfReturns", UnsignedInteger, 1, "7c28bfd4-a9ed-4fb2-b07f-931c076fbaf0",
        "Total returns recorded for the pulse."),
    spec("ScanDirectionFlag", UnsignedInteger, 1, "13019a2c-cf88-480d-a995-0162055fe5f9",
        "1 while the mirror moves in the positive scan direction, 0 otherwise."),
    spec("EdgeOfFlightLine", UnsignedInteger, 1, "108c18f2-5cc0-4669-ae9a-f41eb4006ea5",
        "1 on the last point of a scan line before the direction changes."),
    spec("Classification", UnsignedInteger, 1, "b4c67de9-cef1-432c-8909-7c751b2a4e0b",
        "ASPRS class code."),
    spec("ScanAngleRank", SignedInteger, 1, "aaadaf77-e0c9-4df0-81a7-27060794cd69",
        "Rounded off-nadir scan angle in degrees, -90 to 90."),
    spec("UserData", UnsignedInteger, 1, "70eb558e-63d4-4804-b1db-fc2fd716927c",
        "Free for producer use."),
    spec("PointSourceId", UnsignedInteger, 2, "4e42e96a-6af0-4fdd-81cb-6216ff47bf6b",
        "Identifier of the flight line or file the point came from."),
    spec("WavePacketDescriptorIndex", UnsignedInteger, 1, "1d095eb0-099f-4800-abb6-2272be486f81",
        "Selects the waveform packet descriptor VLR, 0 when no waveform exists."),
    spec("WaveformDataOffset", UnsignedInteger, 8, "6dee8edf-0c2a-4554-b999-20c9d5f0e7b9",
        "Byte offset of the waveform packet."),
    spec("WaveformPacketSize", UnsignedInteger, 4, "",
        "Size of the waveform packet in bytes."),
    spec("ReturnPointWaveformLocation", Float, 4, "f0f37962-2563-4c3e-858d-28ec15a1103f",
        "Offset in picoseconds from the first digitized sample to this return."),
    spec("WaveformXt", Float, 4, "c0ec76eb-9121-4127-b3d7-af92ef871a2d",
        "X component of the parametric waveform line."),
    spec("WaveformYt", Float, 4, "b3f5bb56-3c25-42eb-9476-186bb6b78e3c",
        "Y component of the parametric waveform line."),
    spec("WaveformZt", Float, 4, "7499ae66-462f-4d0b-a449-6e5c721fb087",
        "Z component of the parametric waveform line."),
    spec("Red", UnsignedInteger, 2, "a42ce297-6aa2-4a62-bd29-2db19ba862d5",
        "Red channel of the point color."),
    spec("Green", UnsignedInteger, 2, "7752759d-5713-48cd-9842-51db350cc979",
        "Green channel of the point color."),
    spec("Blue", UnsignedInteger, 2, "5c1a99c8-1829-4d5b-8735-4f6f393a7970",
        "Blue channel of the point color."),
];

/// Every dimension a LAS 1.0 to 1.4 file with formats 0 to 5 can carry.
/// X, Y and Z take the header scale and offset.
pub fn default_dimensions(scale: [f64; 3], offset: [f64; 3]) -> Vec<Dimension> {
    LAS_DIMENSIONS
        .iter()
        .map(|spec| {
            let dimension = Dimension::new(spec.name, spec.interpretation, spec.byte_size)
                .with_uuid(spec.uuid)
                .with_description(spec.description);
            match spec.name {
                "X" => dimension.with_scaling(scale[0], offset[0]),
                "Y" => dimension.with_scaling(scale[1], offset[1]),
                "Z" => dimension.with_scaling(scale[2], offset[2]),
                _ => dimension,
            }
        })
        .collect()
}

/// Positions of the LAS dimensions inside a buffer schema. `None` means the
/// buffer does not ask for that dimension and the decoder leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointDimensions {
    pub x: Option<usize>,
    pub y: Option<usize>,
    pub z: Option<usize>,
    pub time: Option<usize>,
    pub intensity: Option<usize>,
    pub return_number: Option<usize>,
    pub number_of_returns: Option<usize>,
    pub scan_direction: Option<usize>,
    pub edge_of_flight_line: Option<usize>,
    pub classification: Option<usize>,
    pub scan_angle: Option<usize>,
    pub user_data: Option<usize>,
    pub point_source_id: Option<usize>,
    pub packet_index: Option<usize>,
    pub waveform_offset: Option<usize>,
    pub waveform_size: Option<usize>,
    pub return_location: Option<usize>,
    pub waveform_xt: Option<usize>,
    pub waveform_yt: Option<usize>,
    pub waveform_zt: Option<usize>,
    pub red: Option<usize>,
    pub green: Option<usize>,
    pub blue: Option<usize>,
}

impl PointDimensions {
    /// Looks each LAS dimension up by uuid, then by name, and checks the
    /// buffer stores it with the type the decoder writes.
    pub fn resolve(schema: &Schema) -> Result<Self> {
        let mut dims = Self::default();
        for spec in LAS_DIMENSIONS {
            let by_uuid = if spec.uuid.is_empty() {
                None
            } else {
                schema.find_by_id(spec.uuid)
            };
            let Some(layout) = by_uuid.or_else(|| schema.get(spec.name)) else {
                continue;
            };
            let found = &layout.dimension;
            if found.interpretation() != spec.interpretation || found.byte_size() != spec.byte_size
            {
                return Err(Error::Config(format!(
                    "dimension '{}' must be a {}-byte {:?} to receive LAS data, found a {}-byte {:?}",
                    spec.name,
                    spec.byte_size,
                    spec.interpretation,
                    found.byte_size(),
                    found.interpretation()
                )));
            }
            let slot = match spec.name {
                "X" => &mut dims.x,
                "Y" => &mut dims.y,
                "Z" => &mut dims.z,
                "Time" => &mut dims.time,
                "Intensity" => &mut dims.intensity,
                "ReturnNumber" => &mut dims.return_number,
                "NumberOfReturns" => &mut dims.number_of_returns,
                "ScanDirectionFlag" => &mut dims.scan_direction,
                "EdgeOfFlightLine" => &mut dims.edge_of_flight_line,
                "Classification" => &mut dims.classification,
                "ScanAngleRank" => &mut dims.scan_angle,
                "UserData" => &mut dims.user_data,
                "PointSourceId" => &mut dims.point_source_id,
                "WavePacketDescriptorIndex" => &mut dims.packet_index,
                "WaveformDataOffset" => &mut dims.waveform_offset,
                "WaveformPacketSize" => &mut dims.waveform_size,
                "ReturnPointWaveformLocation" => &mut dims.return_location,
                "WaveformXt" => &mut dims.waveform_xt,
                "WaveformYt" => &mut dims.waveform_yt,
                "WaveformZt" => &mut dims.waveform_zt,
                "Red" => &mut dims.red,
                "Green" => &mut dims.green,
                _ => &mut dims.blue,
            };
            *slot = Some(layout.position);
        }
        Ok(dims)
    }
}
