use std::env;

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::stage::Stage;
use pcd_parser::LasReader;
use pcd_transformer::{
    BandMapping, Colorization, ColorizationOptions, GeoTransform, GridRaster, Stats, StatsOptions,
};

fn main() {
    let filename = env::args()
        .nth(1)
        .unwrap_or_else(|| "pcd-transformer/examples/data/sample.las".to_string());
    let reader = LasReader::from_path(&filename).unwrap();
    let bounds = reader.bounds().unwrap();

    // a 16x16 gradient draped over the file's extent
    let size = 16;
    let gradient: Vec<f64> = (0..size * size).map(|i| (i % size) as f64 * 16.0).collect();
    let raster = GridRaster::new(size, size).with_band(gradient).unwrap();
    let transform = GeoTransform::new([
        bounds.min[0],
        (bounds.max[0] - bounds.min[0]) / size as f64,
        0.0,
        bounds.max[1],
        0.0,
        -(bounds.max[1] - bounds.min[1]) / size as f64,
    ]);

    let stats = Stats::new(&reader, StatsOptions::default()).unwrap();
    let colorization = Colorization::new(
        &stats,
        &raster,
        ColorizationOptions {
            transform,
            bands: vec![BandMapping::new("Red", 1, 256.0)],
        },
    )
    .unwrap();

    let mut buffer = PointBuffer::new(colorization.schema(), 4096);
    let mut iter = colorization.sequential_iterator().unwrap();
    let mut total = 0;
    loop {
        let n = iter.read(&mut buffer).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }
    println!("Colorized {} points", total);
    if let Some(z) = stats.summary("Z") {
        println!("Z ranges from {} to {}", z.minimum(), z.maximum());
    }
}
