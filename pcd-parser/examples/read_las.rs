use std::env;

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::stage::Stage;
use pcd_parser::{LasReader, ReaderOptions};

fn main() {
    let filename = env::args()
        .nth(1)
        .unwrap_or_else(|| "examples/data/sample.las".to_string());
    let reader = LasReader::new(&ReaderOptions {
        filename: Some(filename.into()),
    })
    .unwrap();

    println!(
        "Number of points: {num_points}",
        num_points = reader.num_points()
    );

    let schema = reader.select(&["X", "Y", "Z"]).unwrap();
    let mut buffer = PointBuffer::new(schema, 1);
    let mut iter = reader.sequential_iterator().unwrap();
    if iter.read(&mut buffer).unwrap() == 1 {
        println!(
            "First point: ({}, {}, {})",
            buffer.get_scaled(0, 0),
            buffer.get_scaled(1, 0),
            buffer.get_scaled(2, 0)
        );
    }
}
