use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mailbox_pir::params::{BfvParams, MESSAGE_SIZE};
use mailbox_pir::pir::{PirClient, PirServer};

fn filled_server(params: &BfvParams, rows: usize) -> PirServer {
    let server = PirServer::new(params.clone()).unwrap();
    server.allocate_to(rows - 1);
    for index in (0..rows).step_by(97) {
        let row = [(index % 251) as u8; MESSAGE_SIZE];
        server.set_value(index, &row).unwrap();
    }
    server
}

fn answer_benchmark(c: &mut Criterion) {
    let params = BfvParams::production();
    let mut group = c.benchmark_group("answer");
    group.sample_size(10);

    for chunks in [1, 4] {
        let rows = chunks * params.slot_count();
        let server = filled_server(&params, rows);
        let client = PirClient::new(params.clone()).unwrap();
        let query = client.build_query(rows / 2, rows).unwrap();

        group.bench_with_input(
            BenchmarkId::new("answer", format!("{}_chunks", chunks)),
            &chunks,
            |b, _| {
                b.iter(|| server.answer(&query).unwrap());
            },
        );
    }

    group.finish();
}

fn client_benchmark(c: &mut Criterion) {
    let params = BfvParams::production();
    let rows = params.slot_count();
    let server = filled_server(&params, rows);
    let client = PirClient::new(params.clone()).unwrap();

    let mut group = c.benchmark_group("client");
    group.sample_size(10);

    group.bench_function("build_query_1_chunk", |b| {
        b.iter(|| client.build_query(5, rows).unwrap());
    });

    let query = client.build_query(5, rows).unwrap();
    let answer = server.answer(&query).unwrap();
    group.bench_function("decode", |b| {
        b.iter(|| client.decode(&answer, 5).unwrap());
    });

    group.bench_function("set_value", |b| {
        b.iter(|| server.set_value(5, &[7u8; MESSAGE_SIZE]).unwrap());
    });

    group.finish();
}

criterion_group!(benches, answer_benchmark, client_benchmark);
criterion_main!(benches);
