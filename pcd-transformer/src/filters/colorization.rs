//! Colors points from a raster.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::pointcloud::metadata::{BoundingVolume, Metadata};
use pcd_core::pointcloud::schema::Schema;
use pcd_core::stage::{
    BufferProcessor, FilterRandomIterator, FilterSequentialIterator, IteratorKind,
    RandomIterator, SequentialIterator, Stage,
};
use pcd_core::{Error, Result};

use crate::geotransform::GeoTransform;
use crate::raster::RasterSource;

fn unit_scale() -> f64 {
    1.0
}

/// Writes raster `band` (1-based), multiplied by `scale`, into `dimension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandMapping {
    pub dimension: String,
    pub band: usize,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

impl BandMapping {
    pub fn new(dimension: &str, band: usize, scale: f64) -> Self {
        Self {
            dimension: dimension.to_string(),
            band,
            scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizationOptions {
    /// Raster pixel/line to world transform.
    pub transform: GeoTransform,
    pub bands: Vec<BandMapping>,
}

impl Default for ColorizationOptions {
    fn default() -> Self {
        Self {
            transform: GeoTransform::identity(),
            bands: vec![
                BandMapping::new("Red", 1, 1.0),
                BandMapping::new("Green", 2, 1.0),
                BandMapping::new("Blue", 3, 1.0),
            ],
        }
    }
}

/// Pass-through stage that samples a raster under each point's X/Y and
/// stores the band values in the configured dimensions.
pub struct Colorization<'a> {
    upstream: &'a dyn Stage,
    raster: &'a dyn RasterSource,
    inverse: GeoTransform,
    bands: Vec<BandMapping>,
}

impl<'a> Colorization<'a> {
    pub const NAME: &'static str = "filters.colorization";

    pub fn new(
        upstream: &'a dyn Stage,
        raster: &'a dyn RasterSource,
        options: ColorizationOptions,
    ) -> Result<Self> {
        let inverse = options.transform.invert().ok_or_else(|| {
            Error::Config(format!(
                "geotransform {:?} cannot be inverted",
                options.transform.coefficients()
            ))
        })?;
        for mapping in &options.bands {
            if mapping.band == 0 || mapping.band > raster.band_count() {
                return Err(Error::Config(format!(
                    "band {} for dimension '{}' is outside the raster's {} bands",
                    mapping.band,
                    mapping.dimension,
                    raster.band_count()
                )));
            }
            if !mapping.scale.is_finite() {
                return Err(Error::Config(format!(
                    "scale for dimension '{}' must be finite",
                    mapping.dimension
                )));
            }
        }

        Ok(Self {
            upstream,
            raster,
            inverse,
            bands: options.bands,
        })
    }

    fn colorizer(&self) -> Colorizer<'a> {
        Colorizer {
            raster: self.raster,
            inverse: self.inverse,
            bands: self.bands.clone(),
            x: 0,
            y: 0,
            targets: Vec::new(),
        }
    }
}

/// The per-iterator half of [`Colorization`].
pub struct Colorizer<'a> {
    raster: &'a dyn RasterSource,
    inverse: GeoTransform,
    bands: Vec<BandMapping>,
    x: usize,
    y: usize,
    // (buffer position, band, scale)
    targets: Vec<(usize, usize, f64)>,
}

impl Colorizer<'_> {
    /// The raster cell covering a world coordinate, if it lies inside the
    /// grid.
    pub fn pixel_and_line(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (pixel, line) = self.inverse.apply(x, y);
        let (pixel, line) = (pixel.floor(), line.floor());
        if !(pixel >= 0.0 && line >= 0.0) {
            return None;
        }
        if pixel >= self.raster.width() as f64 || line >= self.raster.height() as f64 {
            return None;
        }
        Some((pixel as usize, line as usize))
    }
}

impl BufferProcessor for Colorizer<'_> {
    fn bind(&mut self, schema: &Schema) -> Result<()> {
        self.x = schema
            .index_of("X")
            .ok_or_else(|| Error::MissingDimension("X".to_string()))?;
        self.y = schema
            .index_of("Y")
            .ok_or_else(|| Error::MissingDimension("Y".to_string()))?;

        self.targets.clear();
        for mapping in &self.bands {
            match schema.index_of(&mapping.dimension) {
                Some(position) => self.targets.push((position, mapping.band, mapping.scale)),
                None => log::debug!(
                    "dimension '{}' is not in the buffer, band {} is not written",
                    mapping.dimension,
                    mapping.band
                ),
            }
        }
        Ok(())
    }

    fn process(&mut self, buffer: &mut PointBuffer) -> Result<()> {
        let mut outside = 0usize;
        for index in 0..buffer.count() {
            let x = buffer.get_scaled(self.x, index);
            let y = buffer.get_scaled(self.y, index);
            let Some((pixel, line)) = self.pixel_and_line(x, y) else {
                outside += 1;
                continue;
            };
            for &(position, band, scale) in &self.targets {
                if let Some(value) = self.raster.value(band, pixel, line) {
                    buffer.set_scaled(position, index, value * scale);
                }
            }
        }
        if outside > 0 {
            log::debug!(
                "{} of {} points fall outside the raster",
                outside,
                buffer.count()
            );
        }
        Ok(())
    }
}

pub type ColorizationIterator<'a> = FilterSequentialIterator<'a, Colorizer<'a>>;
pub type ColorizationRandomIterator<'a> = FilterRandomIterator<'a, Colorizer<'a>>;

impl<'a> Colorization<'a> {
    pub fn colorization_iterator(&self) -> Result<ColorizationIterator<'a>> {
        let upstream = self.upstream.sequential_iterator()?;
        Ok(FilterSequentialIterator::new(upstream, self.colorizer()))
    }

    pub fn colorization_random_iterator(&self) -> Result<ColorizationRandomIterator<'a>> {
        let upstream = self.upstream.random_iterator()?;
        Ok(FilterRandomIterator::new(upstream, self.colorizer()))
    }
}

impl Stage for Colorization<'_> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn num_points(&self) -> u64 {
        self.upstream.num_points()
    }

    fn schema(&self) -> Arc<Schema> {
        self.upstream.schema()
    }

    fn bounds(&self) -> Option<BoundingVolume> {
        self.upstream.bounds()
    }

    fn metadata(&self) -> Metadata {
        self.upstream.metadata()
    }

    fn supports_iterator(&self, kind: IteratorKind) -> bool {
        matches!(kind, IteratorKind::Sequential | IteratorKind::Random)
            && self.upstream.supports_iterator(kind)
    }

    fn sequential_iterator(&self) -> Result<Box<dyn SequentialIterator + '_>> {
        Ok(Box::new(self.colorization_iterator()?))
    }

    fn random_iterator(&self) -> Result<Box<dyn RandomIterator + '_>> {
        Ok(Box::new(self.colorization_random_iterator()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridRaster;
    use pcd_core::pointcloud::dimension::{Dimension, Interpretation};

    struct NoUpstream;

    impl Stage for NoUpstream {
        fn name(&self) -> &str {
            "test.none"
        }

        fn num_points(&self) -> u64 {
            0
        }

        fn schema(&self) -> Arc<Schema> {
            Arc::new(Schema::new(Vec::new()))
        }

        fn supports_iterator(&self, _kind: IteratorKind) -> bool {
            false
        }
    }

    fn raster_with_seven() -> GridRaster {
        let mut band = vec![0.0; 25];
        band[4 * 5 + 3] = 7.0;
        GridRaster::new(5, 5).with_band(band).unwrap()
    }

    fn xy_red_buffer(points: &[(f64, f64)]) -> PointBuffer {
        let schema = Arc::new(Schema::new(vec![
            Dimension::new("X", Interpretation::Float, 8),
            Dimension::new("Y", Interpretation::Float, 8),
            Dimension::new("Red", Interpretation::UnsignedInteger, 2),
        ]));
        let mut buffer = PointBuffer::new(schema, points.len());
        for (i, (x, y)) in points.iter().enumerate() {
            buffer.set_field(0, i, *x);
            buffer.set_field(1, i, *y);
            buffer.set_field(2, i, 999u16);
        }
        buffer.set_count(points.len());
        buffer
    }

    #[test]
    fn identity_transform_samples_cell() {
        let raster = raster_with_seven();
        let upstream = NoUpstream;
        let options = ColorizationOptions {
            transform: GeoTransform::new([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            bands: vec![BandMapping::new("Red", 1, 2.0)],
        };
        let filter = Colorization::new(&upstream, &raster, options).unwrap();
        let mut colorizer = filter.colorizer();
        assert_eq!(colorizer.pixel_and_line(3.0, 4.0), Some((3, 4)));

        let mut buffer = xy_red_buffer(&[(3.0, 4.0), (3.9, 4.2), (-0.5, 1.0), (5.0, 0.0)]);
        let schema = buffer.schema().clone();
        colorizer.bind(&schema).unwrap();
        colorizer.process(&mut buffer).unwrap();

        assert_eq!(buffer.get_field::<u16>(2, 0), 14);
        assert_eq!(buffer.get_field::<u16>(2, 1), 14);
        // outside the grid: untouched
        assert_eq!(buffer.get_field::<u16>(2, 2), 999);
        assert_eq!(buffer.get_field::<u16>(2, 3), 999);
        assert_eq!(buffer.count(), 4);
    }

    #[test]
    fn absent_output_dimension_is_skipped() {
        let raster = raster_with_seven();
        let upstream = NoUpstream;
        let options = ColorizationOptions {
            transform: GeoTransform::identity(),
            bands: vec![BandMapping::new("Infrared", 1, 1.0)],
        };
        let filter = Colorization::new(&upstream, &raster, options).unwrap();
        let mut colorizer = filter.colorizer();

        let mut buffer = xy_red_buffer(&[(3.0, 4.0)]);
        let schema = buffer.schema().clone();
        colorizer.bind(&schema).unwrap();
        colorizer.process(&mut buffer).unwrap();
        assert_eq!(buffer.get_field::<u16>(2, 0), 999);
    }

    #[test]
    fn missing_coordinates_fail_to_bind() {
        let raster = raster_with_seven();
        let upstream = NoUpstream;
        let options = ColorizationOptions {
            bands: vec![BandMapping::new("Red", 1, 1.0)],
            ..ColorizationOptions::default()
        };
        let filter = Colorization::new(&upstream, &raster, options).unwrap();
        let schema = Schema::new(vec![Dimension::new("Red", Interpretation::UnsignedInteger, 2)]);
        let err = filter.colorizer().bind(&schema).unwrap_err();
        assert!(matches!(err, Error::MissingDimension(name) if name == "X"));
    }

    #[test]
    fn rejects_bad_configuration() {
        let raster = raster_with_seven();
        let upstream = NoUpstream;

        // default options ask for three bands
        let err = Colorization::new(&upstream, &raster, ColorizationOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(msg) if msg.contains("band 2")));

        let singular = ColorizationOptions {
            transform: GeoTransform::new([0.0; 6]),
            bands: Vec::new(),
        };
        assert!(matches!(
            Colorization::new(&upstream, &raster, singular),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn options_from_json() {
        let options: ColorizationOptions = serde_json::from_str(
            r#"{"transform": [10, 2, 0, 20, 0, -2], "bands": [{"dimension": "Red", "band": 1}]}"#,
        )
        .unwrap();
        assert_eq!(
            options.transform.coefficients(),
            [10.0, 2.0, 0.0, 20.0, 0.0, -2.0]
        );
        assert_eq!(options.bands, vec![BandMapping::new("Red", 1, 1.0)]);
    }
}
