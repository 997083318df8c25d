//! The LAS format reader stage.

pub mod codec;
pub mod decode;
pub mod dimensions;
pub mod format;
pub mod header;
pub mod iterator;
pub mod vlr;

#[cfg(test)]
mod fixture;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pcd_core::pointcloud::dimension::Dimension;
use pcd_core::pointcloud::metadata::{BoundingVolume, Metadata};
use pcd_core::pointcloud::schema::Schema;
use pcd_core::stage::{IteratorKind, RandomIterator, SequentialIterator, Stage};
use pcd_core::{Error, Result};

use crate::stream::{FileStreamFactory, StreamFactory};
use codec::{CodecFactory, LazCodec};
use dimensions::default_dimensions;
use format::PointFormat;
use header::Header;
use iterator::{LasRandomIterator, LasSequentialIterator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub filename: Option<PathBuf>,
}

/// A source stage over one LAS file.
///
/// The header and VLRs are parsed when the reader is built and never change
/// afterwards. Iterators borrow the reader and each allocate their own
/// stream, so any number of them can be alive at once.
pub struct LasReader {
    streams: Box<dyn StreamFactory>,
    codec: Option<Box<dyn CodecFactory>>,
    header: Header,
    dimensions: Vec<Dimension>,
    schema: Arc<Schema>,
}

impl LasReader {
    pub const NAME: &'static str = "readers.las";

    pub fn new(options: &ReaderOptions) -> Result<Self> {
        let filename = options
            .filename
            .as_ref()
            .ok_or_else(|| Error::Config(format!("{} requires a filename", Self::NAME)))?;
        Self::from_path(filename)
    }

    /// Opens a file, decoding compressed point data with LASzip.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_stream_factory(
            Box::new(FileStreamFactory::new(path)),
            Some(Box::new(LazCodec)),
        )
    }

    pub fn with_stream_factory(
        streams: Box<dyn StreamFactory>,
        codec: Option<Box<dyn CodecFactory>>,
    ) -> Result<Self> {
        let mut stream = streams.allocate()?;
        let header = Header::read_from(&mut stream)?;

        if header.compressed && codec.is_none() {
            return Err(Error::CodecUnavailable);
        }

        let dimensions = default_dimensions(header.scale, header.offset);
        let schema = Arc::new(format_schema(&dimensions, header.point_format));

        log::info!(
            "{}: {} points of format {} from {}",
            Self::NAME,
            header.point_count,
            header.point_format.id(),
            streams.describe()
        );
        if let Some(codec) = &codec {
            if header.compressed {
                log::debug!("point data is compressed, decoding with {}", codec.name());
            }
        }

        Ok(Self {
            streams,
            codec,
            header,
            dimensions,
            schema,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The full LAS dimension table with this file's coordinate scaling,
    /// for building narrower requests with [`Schema::select`].
    pub fn default_dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn select(&self, names: &[&str]) -> Result<Arc<Schema>> {
        Ok(Arc::new(Schema::select(&self.dimensions, names)?))
    }

    pub(crate) fn streams(&self) -> &dyn StreamFactory {
        self.streams.as_ref()
    }

    pub(crate) fn codec(&self) -> Option<&dyn CodecFactory> {
        self.codec.as_deref()
    }
}

/// The dimensions a point format actually stores.
fn format_schema(table: &[Dimension], format: PointFormat) -> Schema {
    let stored = table.iter().filter(|d| match d.name() {
        "Time" => format.has_time(),
        "Red" | "Green" | "Blue" => format.has_color(),
        "WavePacketDescriptorIndex"
        | "WaveformDataOffset"
        | "WaveformPacketSize"
        | "ReturnPointWaveformLocation"
        | "WaveformXt"
        | "WaveformYt"
        | "WaveformZt" => format.has_waveform(),
        _ => true,
    });
    Schema::new(stored.cloned())
}

impl Stage for LasReader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn num_points(&self) -> u64 {
        self.header.point_count
    }

    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn bounds(&self) -> Option<BoundingVolume> {
        Some(self.header.bounds)
    }

    fn metadata(&self) -> Metadata {
        self.header.metadata()
    }

    fn supports_iterator(&self, kind: IteratorKind) -> bool {
        matches!(kind, IteratorKind::Sequential | IteratorKind::Random)
    }

    fn sequential_iterator(&self) -> Result<Box<dyn SequentialIterator + '_>> {
        Ok(Box::new(LasSequentialIterator::new(self)?))
    }

    fn random_iterator(&self) -> Result<Box<dyn RandomIterator + '_>> {
        Ok(Box::new(LasRandomIterator::new(self)?))
    }
}
