//! Benchmarks for the Drawbridge frame codec

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::pedantic)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use drawbridge_protocol::{
    Command, Diagram, DiagramImport, Field, Frame, FrameCodec, ResponseFrame, Table,
};
use serde_json::json;
use std::hint::black_box;

fn sample_table(index: usize) -> Table {
    Table {
        id: format!("table-{index}"),
        name: format!("table_{index}"),
        x: 100.0,
        y: 100.0,
        fields: (0..8)
            .map(|f| Field {
                id: format!("field-{index}-{f}"),
                name: format!("column_{f}"),
                data_type: "VARCHAR".to_string(),
                not_null: f == 0,
                primary: f == 0,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn create_test_frames() -> Vec<(&'static str, Frame)> {
    let diagram = Diagram {
        database: "postgresql".to_string(),
        tables: (0..50).map(sample_table).collect(),
        ..Default::default()
    };

    vec![
        ("ping", Frame::ping()),
        (
            "get_tables",
            Frame::Command(Command::GetTables {}.into_frame("cmd_bench_1").unwrap()),
        ),
        (
            "add_table",
            Frame::Command(
                Command::AddTable {
                    data: Some(sample_table(0)),
                    add_to_history: true,
                }
                .into_frame("cmd_bench_2")
                .unwrap(),
            ),
        ),
        (
            "import_diagram",
            Frame::Command(
                Command::ImportDiagram {
                    diagram: DiagramImport::from(diagram.clone()),
                    clear_current: true,
                }
                .into_frame("cmd_bench_3")
                .unwrap(),
            ),
        ),
        (
            "diagram_response",
            Frame::Response(ResponseFrame::ok(
                "cmd_bench_4",
                Some(serde_json::to_value(&diagram).unwrap()),
                None,
            )),
        ),
        (
            "failure_response",
            Frame::Response(ResponseFrame::failure("cmd_bench_5", "Table not found: x")),
        ),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let codec = FrameCodec::new();

    for (name, frame) in &create_test_frames() {
        let size = codec.encode(frame).expect("encode failed").len();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("frame", name), frame, |b, frame| {
            b.iter(|| {
                let text = codec.encode(black_box(frame)).expect("encode failed");
                black_box(text);
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let codec = FrameCodec::new();

    for (name, frame) in &create_test_frames() {
        let encoded = codec.encode(frame).expect("encode failed");
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("frame", name), &encoded, |b, encoded| {
            b.iter(|| {
                let frame = codec.decode(black_box(encoded)).expect("decode failed");
                black_box(frame);
            });
        });
    }

    group.finish();
}

fn bench_command_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_parse");

    for count in [1usize, 10, 100] {
        let params = json!({
            "diagram": {
                "database": "mysql",
                "tables": (0..count).map(sample_table).collect::<Vec<_>>(),
            },
            "clearCurrent": false,
        });

        group.bench_with_input(BenchmarkId::new("import_tables", count), &params, |b, params| {
            b.iter(|| {
                let command = Command::from_parts("importDiagram", black_box(params.clone()))
                    .expect("parse failed");
                black_box(command);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_command_parse);
criterion_main!(benches);
