use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpretation {
    SignedInteger,
    UnsignedInteger,
    Float,
}

/// A named, fixed-width point attribute.
///
/// The stored value is a raw number. `scale` and `offset` describe how the
/// raw value maps to a physical one: `physical = raw * scale + offset`.
/// LAS coordinates are the common case, where X/Y/Z are kept as `i32` and
/// the header scale/offset is stamped onto the dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    name: String,
    uuid: String,
    interpretation: Interpretation,
    byte_size: usize,
    description: String,
    scale: f64,
    offset: f64,
}

impl Dimension {
    pub fn new(name: &str, interpretation: Interpretation, byte_size: usize) -> Self {
        assert!(
            matches!(byte_size, 1 | 2 | 4 | 8),
            "dimension '{}' has unsupported width {}",
            name,
            byte_size
        );
        assert!(
            interpretation != Interpretation::Float || byte_size >= 4,
            "float dimension '{}' must be 4 or 8 bytes wide",
            name
        );

        Self {
            name: name.to_string(),
            uuid: String::new(),
            interpretation,
            byte_size,
            description: String::new(),
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = uuid.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Stable identity: the UUID when one was assigned, otherwise the name.
    pub fn id(&self) -> &str {
        if self.uuid.is_empty() {
            &self.name
        } else {
            &self.uuid
        }
    }

    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn apply_scaling(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    pub fn remove_scaling(&self, physical: f64) -> f64 {
        (physical - self.offset) / self.scale
    }
}

/// Rust types that can be stored in a dimension slot.
pub trait FieldValue: bytemuck::Pod {
    const INTERPRETATION: Interpretation;

    fn to_f64(self) -> f64;

    /// Saturating conversion, fractional parts are truncated for integers.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_field_value {
    ($ty:ty, $interp:expr) => {
        impl FieldValue for $ty {
            const INTERPRETATION: Interpretation = $interp;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
        }
    };
}

impl_field_value!(i8, Interpretation::SignedInteger);
impl_field_value!(i16, Interpretation::SignedInteger);
impl_field_value!(i32, Interpretation::SignedInteger);
impl_field_value!(i64, Interpretation::SignedInteger);
impl_field_value!(u8, Interpretation::UnsignedInteger);
impl_field_value!(u16, Interpretation::UnsignedInteger);
impl_field_value!(u32, Interpretation::UnsignedInteger);
impl_field_value!(u64, Interpretation::UnsignedInteger);
impl_field_value!(f32, Interpretation::Float);
impl_field_value!(f64, Interpretation::Float);
