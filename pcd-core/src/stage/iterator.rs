use std::sync::Arc;

use crate::error::Result;
use crate::pointcloud::buffer::PointBuffer;
use crate::pointcloud::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Ready,
    Reading,
    AtEnd,
}

/// Forward-only cursor over a stage's points.
///
/// `read` fills the buffer from record 0 with as many points as fit or
/// remain, sets the buffer's count and advances the cursor by that many.
/// Once everything has been produced `read` returns 0 and `at_end` holds.
pub trait SequentialIterator {
    fn index(&self) -> u64;

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize>;

    /// Moves forward without materializing points. Returns how many were
    /// actually skipped, which is less than `count` near the end.
    fn skip(&mut self, count: u64) -> Result<u64>;

    fn at_end(&self) -> bool;

    fn state(&self) -> ReadState {
        if self.at_end() {
            ReadState::AtEnd
        } else if self.index() == 0 {
            ReadState::Ready
        } else {
            ReadState::Reading
        }
    }
}

/// Cursor that can be repositioned to any point before reading.
pub trait RandomIterator {
    fn index(&self) -> u64;

    /// `index` must be below the stage's point count.
    fn seek(&mut self, index: u64) -> Result<u64>;

    fn read(&mut self, buffer: &mut PointBuffer) -> Result<usize>;
}

/// Per-iterator cache of something derived from a buffer's schema, such as
/// resolved dimension positions. Rebuilt only when a buffer with a
/// different schema shows up.
#[derive(Debug)]
pub struct SchemaBinding<T> {
    bound: Option<(Arc<Schema>, T)>,
}

impl<T> Default for SchemaBinding<T> {
    fn default() -> Self {
        Self { bound: None }
    }
}

impl<T> SchemaBinding<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<F>(&mut self, schema: &Arc<Schema>, resolver: F) -> Result<&T>
    where
        F: FnOnce(&Schema) -> Result<T>,
    {
        let stale = match &self.bound {
            Some((bound, _)) => !(Arc::ptr_eq(bound, schema) || **bound == **schema),
            None => true,
        };
        if stale {
            log::debug!("binding iterator to a schema of {} dimensions", schema.len());
            let value = resolver(schema)?;
            self.bound = Some((schema.clone(), value));
        }
        match &self.bound {
            Some((_, value)) => Ok(value),
            None => unreachable!("binding was just resolved"),
        }
    }
}
