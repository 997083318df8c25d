//! The pull-based stage protocol.
//!
//! A pipeline is a chain of [`Stage`]s. The consumer asks the last stage
//! for an iterator and drives it with `read`; each stage's iterator pulls
//! from its upstream iterator, so the work bottoms out in a reader's decode
//! and then flows back up through the filters, one buffer at a time.
//!
//! Stages borrow their upstream; whoever builds the pipeline owns every
//! stage. Iterators borrow the stage that created them.

mod filter;
mod iterator;

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pointcloud::metadata::{BoundingVolume, Metadata};
use crate::pointcloud::schema::Schema;

pub use filter::{BufferProcessor, FilterRandomIterator, FilterSequentialIterator};
pub use iterator::{ReadState, RandomIterator, SchemaBinding, SequentialIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IteratorKind {
    Sequential,
    Random,
    Block,
}

impl fmt::Display for IteratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IteratorKind::Sequential => "sequential",
            IteratorKind::Random => "random",
            IteratorKind::Block => "block",
        };
        f.write_str(name)
    }
}

pub trait Stage {
    fn name(&self) -> &str;

    /// Number of points this stage will produce.
    fn num_points(&self) -> u64;

    /// Every dimension this stage can populate.
    fn schema(&self) -> Arc<Schema>;

    fn bounds(&self) -> Option<BoundingVolume> {
        None
    }

    fn metadata(&self) -> Metadata {
        Metadata::new()
    }

    fn supports_iterator(&self, kind: IteratorKind) -> bool;

    /// Fails with [`Error::UnsupportedIterator`] unless
    /// `supports_iterator(IteratorKind::Sequential)` holds.
    fn sequential_iterator(&self) -> Result<Box<dyn SequentialIterator + '_>> {
        Err(unsupported(self.name(), IteratorKind::Sequential))
    }

    /// Fails with [`Error::UnsupportedIterator`] unless
    /// `supports_iterator(IteratorKind::Random)` holds.
    fn random_iterator(&self) -> Result<Box<dyn RandomIterator + '_>> {
        Err(unsupported(self.name(), IteratorKind::Random))
    }
}

pub fn unsupported(stage: &str, kind: IteratorKind) -> Error {
    Error::UnsupportedIterator {
        stage: stage.to_string(),
        kind,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A tiny in-memory source stage for exercising the protocol.

    use super::*;
    use crate::pointcloud::buffer::PointBuffer;
    use crate::pointcloud::dimension::{Dimension, Interpretation};

    pub struct ValueStage {
        pub values: Vec<f64>,
        pub schema: Arc<Schema>,
    }

    impl ValueStage {
        pub fn new(values: Vec<f64>) -> Self {
            let schema = Schema::new(vec![Dimension::new("V", Interpretation::Float, 8)]);
            Self {
                values,
                schema: Arc::new(schema),
            }
        }
    }

    pub struct ValueIterator<'a> {
        stage: &'a ValueStage,
        index: u64,
    }

    impl ValueIterator<'_> {
        fn fill(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
            let start = self.index as usize;
            let remaining = self.stage.values.len().saturating_sub(start);
            let count = remaining.min(buffer.capacity());
            let position = buffer
                .schema()
                .index_of("V")
                .ok_or_else(|| Error::MissingDimension("V".to_string()))?;
            for i in 0..count {
                buffer.set_field(position, i, self.stage.values[start + i]);
            }
            buffer.set_count(count);
            self.index += count as u64;
            Ok(count)
        }
    }

    impl SequentialIterator for ValueIterator<'_> {
        fn index(&self) -> u64 {
            self.index
        }

        fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
            self.fill(buffer)
        }

        fn skip(&mut self, count: u64) -> Result<u64> {
            let skipped = count.min(self.stage.num_points() - self.index);
            self.index += skipped;
            Ok(skipped)
        }

        fn at_end(&self) -> bool {
            self.index >= self.stage.num_points()
        }
    }

    impl RandomIterator for ValueIterator<'_> {
        fn index(&self) -> u64 {
            self.index
        }

        fn seek(&mut self, index: u64) -> Result<u64> {
            if index >= self.stage.num_points() {
                return Err(Error::SeekOutOfRange {
                    index,
                    count: self.stage.num_points(),
                });
            }
            self.index = index;
            Ok(index)
        }

        fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize> {
            self.fill(buffer)
        }
    }

    impl Stage for ValueStage {
        fn name(&self) -> &str {
            "test.values"
        }

        fn num_points(&self) -> u64 {
            self.values.len() as u64
        }

        fn schema(&self) -> Arc<Schema> {
            self.schema.clone()
        }

        fn supports_iterator(&self, kind: IteratorKind) -> bool {
            matches!(kind, IteratorKind::Sequential | IteratorKind::Random)
        }

        fn sequential_iterator(&self) -> Result<Box<dyn SequentialIterator + '_>> {
            Ok(Box::new(ValueIterator {
                stage: self,
                index: 0,
            }))
        }

        fn random_iterator(&self) -> Result<Box<dyn RandomIterator + '_>> {
            Ok(Box::new(ValueIterator {
                stage: self,
                index: 0,
            }))
        }
    }
}
