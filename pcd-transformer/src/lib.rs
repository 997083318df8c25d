pub mod filters;
pub mod geotransform;
pub mod raster;

pub use filters::colorization::{BandMapping, Colorization, ColorizationOptions};
pub use filters::stats::{Stats, StatsCollector, StatsOptions, StatsResults, Summary};
pub use geotransform::GeoTransform;
pub use raster::{GridRaster, RasterSource};
