use std::io::{self, Read, Seek, SeekFrom};

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::stage::{RandomIterator, SchemaBinding, SequentialIterator};
use pcd_core::{Error, Result};

use super::codec::CodecSession;
use super::decode::decode_points;
use super::dimensions::PointDimensions;
use super::LasReader;
use crate::stream::ReadSeek;

/// Where an iterator's record bytes come from. Chosen when the iterator is
/// created and fixed for its lifetime.
enum PointSource {
    Raw(Box<dyn ReadSeek>),
    Compressed(Box<dyn CodecSession>),
}

fn at_point(err: Error, index: u64) -> Error {
    match err {
        Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => Error::UnexpectedEof { index },
        other => other,
    }
}

/// State shared by both iterator kinds: an owned stream or codec session,
/// the dimension positions for the current buffer schema, and scratch space
/// for raw records.
struct LasCursor<'a> {
    reader: &'a LasReader,
    source: PointSource,
    binding: SchemaBinding<PointDimensions>,
    scratch: Vec<u8>,
    index: u64,
}

impl<'a> LasCursor<'a> {
    fn open(reader: &'a LasReader) -> Result<Self> {
        let header = reader.header();
        let mut stream = reader.streams().allocate()?;
        stream.seek(SeekFrom::Start(header.data_offset as u64))?;

        let source = if header.compressed {
            let codec = reader.codec().ok_or(Error::CodecUnavailable)?;
            PointSource::Compressed(codec.open(header, stream)?)
        } else {
            PointSource::Raw(stream)
        };

        log::debug!(
            "opened {} iterator over {}",
            if header.compressed { "compressed" } else { "raw" },
            reader.streams().describe()
        );

        Ok(Self {
            reader,
            source,
            binding: SchemaBinding::new(),
            scratch: Vec::new(),
            index: 0,
        })
    }

    fn point_count(&self) -> u64 {
        self.reader.header().point_count
    }

    fn stride(&self) -> usize {
        self.reader.header().record_length as usize
    }

    fn at_end(&self) -> bool {
        self.index >= self.point_count()
    }

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
        let remaining = self.point_count().saturating_sub(self.index);
        let count = remaining.min(buffer.capacity() as u64) as usize;
        if count == 0 {
            buffer.set_count(0);
            return Ok(0);
        }

        let schema = buffer.schema().clone();
        let dims = self.binding.resolve(&schema, PointDimensions::resolve)?;

        let header = self.reader.header();
        let stride = header.record_length as usize;
        let start = self.index;
        self.scratch.resize(count * stride, 0);

        match &mut self.source {
            PointSource::Raw(stream) => {
                stream
                    .read_exact(&mut self.scratch)
                    .map_err(|e| at_point(Error::Io(e), start))?;
            }
            PointSource::Compressed(session) => {
                for (i, record) in self.scratch.chunks_exact_mut(stride).enumerate() {
                    session
                        .read_record(record)
                        .map_err(|e| at_point(e, start + i as u64))?;
                }
            }
        }

        decode_points(&self.scratch, stride, header.point_format, dims, buffer, count);
        buffer.set_count(count);
        buffer.set_bounds(header.bounds);
        self.index += count as u64;
        Ok(count)
    }

    fn skip(&mut self, count: u64) -> Result<u64> {
        let skipped = count.min(self.point_count().saturating_sub(self.index));
        if skipped == 0 {
            return Ok(0);
        }
        let target = self.index + skipped;
        match &mut self.source {
            PointSource::Raw(stream) => {
                let bytes = skipped * self.reader.header().record_length as u64;
                stream.seek(SeekFrom::Current(bytes as i64))?;
            }
            PointSource::Compressed(session) => session.seek(target)?,
        }
        self.index = target;
        Ok(skipped)
    }

    fn seek(&mut self, index: u64) -> Result<u64> {
        let count = self.point_count();
        if index >= count {
            return Err(Error::SeekOutOfRange { index, count });
        }
        let data_offset = self.reader.header().data_offset as u64;
        let stride = self.stride() as u64;
        match &mut self.source {
            PointSource::Raw(stream) => {
                stream.seek(SeekFrom::Start(data_offset + index * stride))?;
            }
            PointSource::Compressed(session) => session.seek(index)?,
        }
        self.index = index;
        Ok(index)
    }
}

pub struct LasSequentialIterator<'a> {
    cursor: LasCursor<'a>,
}

impl<'a> LasSequentialIterator<'a> {
    pub(crate) fn new(reader: &'a LasReader) -> Result<Self> {
        Ok(Self {
            cursor: LasCursor::open(reader)?,
        })
    }
}

impl SequentialIterator for LasSequentialIterator<'_> {
    fn index(&self) -> u64 {
        self.cursor.index
    }

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
        self.cursor.read(buffer)
    }

    fn skip(&mut self, count: u64) -> Result<u64> {
        self.cursor.skip(count)
    }

    fn at_end(&self) -> bool {
        self.cursor.at_end()
    }
}

pub struct LasRandomIterator<'a> {
    cursor: LasCursor<'a>,
}

impl<'a> LasRandomIterator<'a> {
    pub(crate) fn new(reader: &'a LasReader) -> Result<Self> {
        Ok(Self {
            cursor: LasCursor::open(reader)?,
        })
    }
}

impl RandomIterator for LasRandomIterator<'_> {
    fn index(&self) -> u64 {
        self.cursor.index
    }

    fn seek(&mut self, index: u64) -> Result<u64> {
        self.cursor.seek(index)
    }

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
        self.cursor.read(buffer)
    }
}
