use std::sync::Arc;

use crate::pointcloud::dimension::{FieldValue, Interpretation};
use crate::pointcloud::metadata::BoundingVolume;
use crate::pointcloud::schema::Schema;

/// Bounded store of point records laid out by a [`Schema`].
///
/// The record area is allocated once (`capacity * stride` bytes) and reused
/// across reads; only `count` changes. Values are kept in native byte order.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    schema: Arc<Schema>,
    data: Vec<u8>,
    capacity: usize,
    count: usize,
    bounds: Option<BoundingVolume>,
}

impl PointBuffer {
    pub fn new(schema: Arc<Schema>, capacity: usize) -> Self {
        let data = vec![0u8; schema.byte_size() * capacity];
        Self {
            schema,
            data,
            capacity,
            count: 0,
            bounds: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn set_count(&mut self, count: usize) {
        assert!(
            count <= self.capacity,
            "point count {} exceeds buffer capacity {}",
            count,
            self.capacity
        );
        self.count = count;
    }

    pub fn bounds(&self) -> Option<&BoundingVolume> {
        self.bounds.as_ref()
    }

    pub fn set_bounds(&mut self, bounds: BoundingVolume) {
        self.bounds = Some(bounds);
    }

    /// Forgets the current contents without touching the allocation.
    pub fn reset(&mut self) {
        self.count = 0;
        self.bounds = None;
    }

    pub fn record(&self, index: usize) -> &[u8] {
        let stride = self.schema.byte_size();
        assert!(index < self.capacity, "point index {} out of range", index);
        &self.data[index * stride..(index + 1) * stride]
    }

    fn slot(&self, position: usize, index: usize, width: usize) -> std::ops::Range<usize> {
        assert!(
            index < self.capacity,
            "point index {} out of range for capacity {}",
            index,
            self.capacity
        );
        let layout = self.schema.layout(position);
        assert_eq!(
            layout.dimension.byte_size(),
            width,
            "width mismatch on dimension '{}'",
            layout.dimension.name()
        );
        let start = index * self.schema.byte_size() + layout.offset;
        start..start + width
    }

    pub fn set_field<T: FieldValue>(&mut self, position: usize, index: usize, value: T) {
        let range = self.slot(position, index, std::mem::size_of::<T>());
        self.data[range].copy_from_slice(bytemuck::bytes_of(&value));
    }

    pub fn get_field<T: FieldValue>(&self, position: usize, index: usize) -> T {
        let range = self.slot(position, index, std::mem::size_of::<T>());
        bytemuck::pod_read_unaligned(&self.data[range])
    }

    /// Reads any dimension as `f64`, whatever its stored type.
    pub fn get_field_as_f64(&self, position: usize, index: usize) -> f64 {
        let dimension = &self.schema.layout(position).dimension;
        match (dimension.interpretation(), dimension.byte_size()) {
            (Interpretation::SignedInteger, 1) => self.get_field::<i8>(position, index).to_f64(),
            (Interpretation::SignedInteger, 2) => self.get_field::<i16>(position, index).to_f64(),
            (Interpretation::SignedInteger, 4) => self.get_field::<i32>(position, index).to_f64(),
            (Interpretation::SignedInteger, _) => self.get_field::<i64>(position, index).to_f64(),
            (Interpretation::UnsignedInteger, 1) => self.get_field::<u8>(position, index).to_f64(),
            (Interpretation::UnsignedInteger, 2) => {
                self.get_field::<u16>(position, index).to_f64()
            }
            (Interpretation::UnsignedInteger, 4) => {
                self.get_field::<u32>(position, index).to_f64()
            }
            (Interpretation::UnsignedInteger, _) => {
                self.get_field::<u64>(position, index).to_f64()
            }
            (Interpretation::Float, 4) => self.get_field::<f32>(position, index).to_f64(),
            (Interpretation::Float, _) => self.get_field::<f64>(position, index),
        }
    }

    /// Writes `value` converted to the dimension's stored type.
    pub fn set_field_from_f64(&mut self, position: usize, index: usize, value: f64) {
        let dimension = &self.schema.layout(position).dimension;
        match (dimension.interpretation(), dimension.byte_size()) {
            (Interpretation::SignedInteger, 1) => {
                self.set_field(position, index, i8::from_f64(value))
            }
            (Interpretation::SignedInteger, 2) => {
                self.set_field(position, index, i16::from_f64(value))
            }
            (Interpretation::SignedInteger, 4) => {
                self.set_field(position, index, i32::from_f64(value))
            }
            (Interpretation::SignedInteger, _) => {
                self.set_field(position, index, i64::from_f64(value))
            }
            (Interpretation::UnsignedInteger, 1) => {
                self.set_field(position, index, u8::from_f64(value))
            }
            (Interpretation::UnsignedInteger, 2) => {
                self.set_field(position, index, u16::from_f64(value))
            }
            (Interpretation::UnsignedInteger, 4) => {
                self.set_field(position, index, u32::from_f64(value))
            }
            (Interpretation::UnsignedInteger, _) => {
                self.set_field(position, index, u64::from_f64(value))
            }
            (Interpretation::Float, 4) => self.set_field(position, index, value as f32),
            (Interpretation::Float, _) => self.set_field(position, index, value),
        }
    }

    /// Physical value of a dimension, with its scale and offset applied.
    pub fn get_scaled(&self, position: usize, index: usize) -> f64 {
        let raw = self.get_field_as_f64(position, index);
        self.schema.layout(position).dimension.apply_scaling(raw)
    }

    /// Stores a physical value, removing the dimension's scale and offset.
    pub fn set_scaled(&mut self, position: usize, index: usize, value: f64) {
        let raw = self.schema.layout(position).dimension.remove_scaling(value);
        self.set_field_from_f64(position, index, raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcloud::dimension::Dimension;

    fn every_type_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Dimension::new("i8", Interpretation::SignedInteger, 1),
            Dimension::new("u8", Interpretation::UnsignedInteger, 1),
            Dimension::new("i16", Interpretation::SignedInteger, 2),
            Dimension::new("u16", Interpretation::UnsignedInteger, 2),
            Dimension::new("i32", Interpretation::SignedInteger, 4),
            Dimension::new("u32", Interpretation::UnsignedInteger, 4),
            Dimension::new("f32", Interpretation::Float, 4),
            Dimension::new("i64", Interpretation::SignedInteger, 8),
            Dimension::new("u64", Interpretation::UnsignedInteger, 8),
            Dimension::new("f64", Interpretation::Float, 8),
        ]))
    }

    #[test]
    fn typed_fields_read_back_unchanged() {
        let mut buffer = PointBuffer::new(every_type_schema(), 3);

        for index in 0..3 {
            buffer.set_field(0, index, -7i8);
            buffer.set_field(1, index, 250u8);
            buffer.set_field(2, index, -30_000i16);
            buffer.set_field(3, index, 65_000u16);
            buffer.set_field(4, index, i32::MIN + index as i32);
            buffer.set_field(5, index, u32::MAX - index as u32);
            buffer.set_field(6, index, 1.5f32);
            buffer.set_field(7, index, i64::MIN);
            buffer.set_field(8, index, u64::MAX);
            buffer.set_field(9, index, std::f64::consts::PI);
        }
        buffer.set_count(3);

        for index in 0..3 {
            assert_eq!(buffer.get_field::<i8>(0, index), -7);
            assert_eq!(buffer.get_field::<u8>(1, index), 250);
            assert_eq!(buffer.get_field::<i16>(2, index), -30_000);
            assert_eq!(buffer.get_field::<u16>(3, index), 65_000);
            assert_eq!(buffer.get_field::<i32>(4, index), i32::MIN + index as i32);
            assert_eq!(buffer.get_field::<u32>(5, index), u32::MAX - index as u32);
            assert_eq!(buffer.get_field::<f32>(6, index), 1.5);
            assert_eq!(buffer.get_field::<i64>(7, index), i64::MIN);
            assert_eq!(buffer.get_field::<u64>(8, index), u64::MAX);
            assert_eq!(buffer.get_field::<f64>(9, index), std::f64::consts::PI);
        }
    }

    #[test]
    fn records_do_not_overlap() {
        let schema = Arc::new(Schema::new(vec![
            Dimension::new("a", Interpretation::UnsignedInteger, 2),
            Dimension::new("b", Interpretation::UnsignedInteger, 1),
        ]));
        let mut buffer = PointBuffer::new(schema, 2);
        buffer.set_field(0, 0, 0xFFFFu16);
        buffer.set_field(1, 0, 0xAAu8);
        buffer.set_field(0, 1, 0x0102u16);
        buffer.set_field(1, 1, 0x03u8);

        assert_eq!(buffer.record(0).len(), 3);
        assert_eq!(buffer.get_field::<u16>(0, 0), 0xFFFF);
        assert_eq!(buffer.get_field::<u8>(1, 0), 0xAA);
        assert_eq!(buffer.get_field::<u16>(0, 1), 0x0102);
        assert_eq!(buffer.get_field::<u8>(1, 1), 0x03);
    }

    #[test]
    fn f64_access_dispatches_on_type() {
        let mut buffer = PointBuffer::new(every_type_schema(), 1);
        buffer.set_field_from_f64(0, 0, -12.0);
        buffer.set_field_from_f64(3, 0, 512.9);
        buffer.set_field_from_f64(6, 0, 0.25);

        assert_eq!(buffer.get_field::<i8>(0, 0), -12);
        assert_eq!(buffer.get_field::<u16>(3, 0), 512);
        assert_eq!(buffer.get_field_as_f64(6, 0), 0.25);
    }

    #[test]
    fn scaled_access_uses_dimension_scaling() {
        let schema = Arc::new(Schema::new(vec![Dimension::new(
            "X",
            Interpretation::SignedInteger,
            4,
        )
        .with_scaling(0.5, 500.0)]));
        let mut buffer = PointBuffer::new(schema, 1);
        buffer.set_field(0, 0, 1234i32);
        assert_eq!(buffer.get_scaled(0, 0), 1117.0);

        buffer.set_scaled(0, 0, 501.0);
        assert_eq!(buffer.get_field::<i32>(0, 0), 2);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = PointBuffer::new(every_type_schema(), 4);
        buffer.set_count(4);
        buffer.reset();
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    #[should_panic]
    fn width_mismatch_panics() {
        let mut buffer = PointBuffer::new(every_type_schema(), 1);
        buffer.set_field(0, 0, 1u32);
    }

    #[test]
    #[should_panic]
    fn index_beyond_capacity_panics() {
        let buffer = PointBuffer::new(every_type_schema(), 1);
        buffer.get_field::<u8>(1, 1);
    }

    #[test]
    #[should_panic]
    fn count_beyond_capacity_panics() {
        let mut buffer = PointBuffer::new(every_type_schema(), 1);
        buffer.set_count(2);
    }
}
