use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io;
use std::thread;
use std::time::Duration;

use tether::command::Command;
use tether::dispatch::Dispatcher;
use tether::protocol::{self, CommandMessage, ResponseMessage};
use tether::server::Server;
use tether::session::Session;
use tether::transport::Connection;

// ---------------------------------------------------------------------------
// Codec benchmarks — encode/decode cost without any I/O
// ---------------------------------------------------------------------------

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(5));

    let message = CommandMessage {
        command: "get".to_string(),
        args: Some(vec!["/var/log/syslog".to_string()]),
        closed: false,
    };
    group.bench_function("command", |b| {
        b.iter(|| {
            let bytes = protocol::encode_command(black_box(&message)).unwrap();
            black_box(bytes);
        });
    });

    for size in [64usize, 4096, 262_144] {
        let payload = vec![0x5au8; size];
        let response = ResponseMessage::ok_file(&payload, "/var/log/syslog");
        group.bench_with_input(BenchmarkId::new("response", size), &response, |b, response| {
            b.iter(|| {
                let bytes = protocol::encode_response(black_box(response)).unwrap();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(5));

    for size in [64usize, 4096, 262_144] {
        let payload = vec![0x5au8; size];
        let bytes = protocol::encode_response(&ResponseMessage::ok(&payload)).unwrap();
        group.bench_with_input(BenchmarkId::new("response", size), &bytes, |b, bytes| {
            b.iter(|| {
                let response = protocol::decode_response(black_box(bytes)).unwrap();
                let payload = protocol::decode_payload(&response).unwrap();
                black_box(payload);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Round-trip benchmarks — full command cycle against an in-process daemon
// ---------------------------------------------------------------------------

fn start_session() -> Session<io::Sink> {
    let server = Server::bind("127.0.0.1:0").expect("Failed to bind daemon");
    let addr = server.local_addr().expect("Failed to read daemon address");
    thread::spawn(move || {
        let _ = server.run();
    });

    let connection =
        Connection::connect("127.0.0.1", addr.port()).expect("Failed to connect to daemon");
    Session::new(connection, Dispatcher::new(io::sink()))
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(100);

    for (name, line) in [("pwd", "pwd"), ("echo", "echo hello world")] {
        let mut session = start_session();
        let command = Command::parse(line).expect("Failed to parse command");
        group.bench_function(name, |b| {
            b.iter(|| {
                let outcome = session.run(black_box(&command)).expect("Round trip failed");
                black_box(outcome);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_round_trip);
criterion_main!(benches);
