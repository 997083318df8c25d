#[path = "../src/reader/las/fixture.rs"]
mod fixture;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fixture::{FixturePoint, LasFixture};
use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::stage::Stage;
use pcd_parser::stream::MemoryStreamFactory;
use pcd_parser::LasReader;

fn decode_benchmark(c: &mut Criterion) {
    let mut fixture = LasFixture::new(3);
    fixture.points = (0..100_000).map(FixturePoint::sample).collect();
    let bytes = fixture.to_bytes();

    let reader =
        LasReader::with_stream_factory(Box::new(MemoryStreamFactory::new(bytes)), None).unwrap();
    let mut buffer = PointBuffer::new(reader.schema(), 8192);

    c.bench_function("decode format 3, 100k points", |b| {
        b.iter(|| {
            let mut iter = reader.sequential_iterator().unwrap();
            let mut total = 0;
            loop {
                let n = iter.read(&mut buffer).unwrap();
                if n == 0 {
                    break;
                }
                total += n;
            }
            black_box(total)
        })
    });
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
