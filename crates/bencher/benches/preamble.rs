use std::hint::black_box;

use bencher::request_fixtures;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use simult_http::codec::read_preamble;
use tokio::io::BufReader;
use tokio::runtime::Runtime;

fn benchmark_read_preamble(criterion: &mut Criterion) {
    let rt = Runtime::new().expect("runtime should start");
    let mut group = criterion.benchmark_group("read_preamble");

    for fixture in request_fixtures() {
        let wire = fixture.wire_bytes();
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fixture.name()), &wire, |b, wire| {
            b.to_async(&rt).iter_batched(
                || wire.clone(),
                |bytes| async move {
                    let mut reader = BufReader::new(&bytes[..]);
                    let preamble = read_preamble(&mut reader).await.expect("input should be a valid http preamble");
                    black_box(preamble);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(preamble, benchmark_read_preamble);
criterion_main!(preamble);
