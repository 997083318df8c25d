use crate::error::Result;
use crate::pointcloud::buffer::PointBuffer;
use crate::pointcloud::schema::Schema;
use crate::stage::iterator::{RandomIterator, SchemaBinding, SequentialIterator};

/// The in-place work of a pass-through filter.
///
/// `process` sees records `[0, count)` after the upstream iterator filled
/// the buffer. It may rewrite dimension values but never changes the count
/// or the record order.
pub trait BufferProcessor {
    /// Resolves whatever the processor needs from the buffer schema. Called
    /// before the first buffer and again whenever the schema changes.
    fn bind(&mut self, schema: &Schema) -> Result<()>;

    fn process(&mut self, buffer: &mut PointBuffer) -> Result<()>;
}

fn process_pulled<P: BufferProcessor>(
    processor: &mut P,
    binding: &mut SchemaBinding<()>,
    buffer: &mut PointBuffer,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let schema = buffer.schema().clone();
    binding.resolve(&schema, |s| processor.bind(s))?;
    processor.process(buffer)
}

pub struct FilterSequentialIterator<'a, P> {
    upstream: Box<dyn SequentialIterator + 'a>,
    processor: P,
    binding: SchemaBinding<()>,
}

impl<'a, P: BufferProcessor> FilterSequentialIterator<'a, P> {
    pub fn new(upstream: Box<dyn SequentialIterator + 'a>, processor: P) -> Self {
        Self {
            upstream,
            processor,
            binding: SchemaBinding::new(),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

impl<P: BufferProcessor> SequentialIterator for FilterSequentialIterator<'_, P> {
    fn index(&self) -> u64 {
        self.upstream.index()
    }

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
        let count = self.upstream.read(buffer)?;
        process_pulled(&mut self.processor, &mut self.binding, buffer)?;
        Ok(count)
    }

    fn skip(&mut self, count: u64) -> Result<u64> {
        self.upstream.skip(count)
    }

    fn at_end(&self) -> bool {
        self.upstream.at_end()
    }
}

pub struct FilterRandomIterator<'a, P> {
    upstream: Box<dyn RandomIterator + 'a>,
    processor: P,
    binding: SchemaBinding<()>,
}

impl<'a, P: BufferProcessor> FilterRandomIterator<'a, P> {
    pub fn new(upstream: Box<dyn RandomIterator + 'a>, processor: P) -> Self {
        Self {
            upstream,
            processor,
            binding: SchemaBinding::new(),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

impl<P: BufferProcessor> RandomIterator for FilterRandomIterator<'_, P> {
    fn index(&self) -> u64 {
        self.upstream.index()
    }

    fn seek(&mut self, index: u64) -> Result<u64> {
        self.upstream.seek(index)
    }

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
        let count = self.upstream.read(buffer)?;
        process_pulled(&mut self.processor, &mut self.binding, buffer)?;
        Ok(count)
    }
}
