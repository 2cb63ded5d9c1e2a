use criterion::{criterion_group, criterion_main, Criterion};
use eodflow_core::config::EngineConfig;
use eodflow_core::id::{SlotId, WorkerId};
use eodflow_core::record::Record;
use eodflow_core::schema::{input_header, output_header, OUTPUT_WIDTH};
use eodflow_core::table::Row;
use eodflow_exec::Engine;
use eodflow_operators::{Registry, Stage};

fn make_input(rows: usize) -> Vec<Row> {
    let mut input = Vec::with_capacity(rows + 1);
    input.push(input_header());
    for i in 0..rows {
        input.push(vec![
            i.to_string(),
            format!("name-{}", i),
            "30".to_string(),
            ((i * 7) % 300).to_string(),
            ((i * 13) % 300).to_string(),
            "0".to_string(),
            (i % 4).to_string(),
        ]);
    }
    input
}

fn bench_stages(c: &mut Criterion) {
    let registry = Registry::new();
    let stages: Vec<_> = ["parse", "average", "benefit", "bonus"]
        .iter()
        .filter_map(|k| registry.make(k))
        .collect();
    let input = make_input(1024);
    c.bench_function("stage_chain_inline", |b| {
        b.iter(|| {
            for (i, row) in input[1..].iter().enumerate() {
                let mut r = Record::new(i, row.clone(), SlotId::new(i), vec![String::new(); OUTPUT_WIDTH]);
                for s in &stages {
                    let _ = s.transform(WorkerId::new(1), &mut r);
                }
            }
        })
    });
}

fn bench_engine(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig {
        parallelism: Some(4),
        ..Default::default()
    });
    let input = make_input(10_000);
    c.bench_function("engine_run_10k", |b| {
        b.iter(|| {
            let _ = engine.run(input.clone(), vec![output_header()]).unwrap();
        })
    });
}

criterion_group!(benches, bench_stages, bench_engine);
criterion_main!(benches);
