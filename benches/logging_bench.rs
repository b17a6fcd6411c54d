use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use request_logger::logger::Logger;
use request_logger::middleware::{
    correlation_id, with_logger, Handler, InstrumentedSink, RequestFields, RequestSnapshot,
    ResponseRecorder, ResponseSink, SinkState,
};

fn request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/v1/orders?page=3")
        .header("x-correlation-id", "c0ffee")
        .header("user-agent", "bench/1.0")
        .body(Body::empty())
        .unwrap()
}

fn field_assembly_benchmark(c: &mut Criterion) {
    let snapshot = RequestSnapshot::from(&request());
    let sink = SinkState {
        status: Some(StatusCode::OK),
        written: 4096,
    };

    c.bench_function("field_assembly", |b| {
        b.iter(|| {
            let fields =
                RequestFields::completion(&snapshot, &sink, Duration::from_micros(1_500));
            black_box(serde_json::to_string(&fields).unwrap())
        })
    });
}

fn correlation_resolution_benchmark(c: &mut Criterion) {
    let req = request();
    c.bench_function("correlation_resolution", |b| {
        b.iter(|| black_box(correlation_id(&req)))
    });
}

fn instrumented_write_benchmark(c: &mut Criterion) {
    let chunk = [b'x'; 512];
    c.bench_function("instrumented_write", |b| {
        b.iter(|| {
            let mut sink = InstrumentedSink::new(ResponseRecorder::new());
            for _ in 0..16 {
                sink.write(black_box(&chunk)).unwrap();
            }
            black_box(sink.state())
        })
    });
}

fn middleware_round_trip_benchmark(c: &mut Criterion) {
    let handler = |sink: &mut dyn ResponseSink, _: &mut Request<Body>| {
        sink.set_status(StatusCode::CREATED);
        let _ = sink.write(b"{\"id\":1}");
    };
    let logger = Logger::stdout().output(io::sink()).configure("bench", false);
    let h = with_logger(handler, logger, ["/health"]);

    c.bench_function("middleware_round_trip", |b| {
        b.iter(|| {
            let mut req = request();
            h.serve(&mut ResponseRecorder::new(), &mut req);
        })
    });
}

criterion_group!(
    benches,
    field_assembly_benchmark,
    correlation_resolution_benchmark,
    instrumented_write_benchmark,
    middleware_round_trip_benchmark
);
criterion_main!(benches);
