use serde::Serialize;

use crate::error::{Error, Result};
use crate::pointcloud::dimension::Dimension;

/// A dimension together with its resolved position in a point record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionLayout {
    pub dimension: Dimension,
    pub offset: usize,
    pub position: usize,
}

/// Ordered, offset-resolved set of dimensions describing one point record.
///
/// A schema never changes once built. Buffers share it through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    dimensions: Vec<DimensionLayout>,
    byte_size: usize,
}

impl Schema {
    pub fn new<I>(dimensions: I) -> Self
    where
        I: IntoIterator<Item = Dimension>,
    {
        let mut layouts = Vec::new();
        let mut offset = 0;

        for (position, dimension) in dimensions.into_iter().enumerate() {
            let size = dimension.byte_size();
            layouts.push(DimensionLayout {
                dimension,
                offset,
                position,
            });
            offset += size;
        }

        Self {
            dimensions: layouts,
            byte_size: offset,
        }
    }

    /// Builds a schema holding the named dimensions of `table`, in the order
    /// the names are given.
    pub fn select(table: &[Dimension], names: &[&str]) -> Result<Self> {
        let mut picked = Vec::with_capacity(names.len());
        for name in names {
            let dimension = table
                .iter()
                .find(|d| d.name() == *name)
                .ok_or_else(|| Error::UnknownDimension(name.to_string()))?;
            picked.push(dimension.clone());
        }
        Ok(Self::new(picked))
    }

    /// Record stride in bytes.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn dimensions(&self) -> &[DimensionLayout] {
        &self.dimensions
    }

    pub fn layout(&self, position: usize) -> &DimensionLayout {
        &self.dimensions[position]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .position(|d| d.dimension.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&DimensionLayout> {
        self.index_of(name).map(|i| &self.dimensions[i])
    }

    pub fn find_by_id(&self, id: &str) -> Option<&DimensionLayout> {
        self.dimensions.iter().find(|d| d.dimension.id() == id)
    }
}
