//! Benchmarks for filter parsing, binding and evaluation.
//!
//! Filters are parsed once per check configuration but evaluated against every
//! record of every cycle, so `check` and `matching` are the numbers that
//! matter most.

use check_filter::consumers::{process_registry, ProcessRecord, ProcessState};
use check_filter::{parse, FilterConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const FILTERS: &[(&str, &str)] = &[
    ("single", "pid > 100"),
    ("string", "exe == 'sshd' && state = 'started'"),
    (
        "nested",
        "exe == 'sshd' && (time_percent > 50% || state != 'started') || working_set > 512m",
    ),
    (
        "sets",
        "exe in ('sshd', 'httpd', 'nginx', 'postgres') && pid not_in (1, 2, 3) && creation > -1h",
    ),
];

fn generate_processes(count: usize) -> Vec<ProcessRecord> {
    let names = ["sshd", "httpd", "cron", "postgres", "init", "nginx"];
    (0..count)
        .map(|i| {
            let mut process = ProcessRecord::new(i as u32, names[i % names.len()]);
            if i % 7 == 0 {
                process = process.with_state(ProcessState::Hung);
            }
            process.creation = (i * 37 % 7200) as f64;
            process.kernel_percent = (i % 40) as f64;
            process.user_percent = (i % 30) as f64;
            process.working_set = (i as u64 % 1024) * 1024 * 1024;
            process
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, filter) in FILTERS {
        group.bench_with_input(BenchmarkId::new("filter", name), filter, |b, filter| {
            b.iter(|| parse(black_box(filter)))
        });
    }

    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");
    let registry = process_registry();

    for (name, filter) in FILTERS {
        let tree = parse(filter).expect("benchmark filter parses");
        group.bench_with_input(BenchmarkId::new("filter", name), &tree, |b, tree| {
            b.iter(|| tree.bind(black_box(&registry)))
        });
    }

    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    let registry = process_registry();
    let processes = generate_processes(64);

    for (name, filter) in FILTERS {
        let bound = parse(filter)
            .expect("benchmark filter parses")
            .bind(&registry)
            .expect("benchmark filter binds");
        group.bench_with_input(BenchmarkId::new("filter", name), &bound, |b, bound| {
            b.iter(|| {
                for process in &processes {
                    black_box(bound.check(black_box(process)));
                }
            })
        });
    }

    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");
    let bound = parse(FILTERS[2].1)
        .expect("benchmark filter parses")
        .bind(&process_registry())
        .expect("benchmark filter binds")
        .with_config(FilterConfig::high_throughput());

    for count in [100, 1_000, 10_000, 100_000].iter() {
        let processes = generate_processes(*count);

        group.bench_with_input(BenchmarkId::new("sequential", count), count, |b, _| {
            b.iter(|| bound.matching(black_box(&processes)).len())
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), count, |b, _| {
            b.iter(|| bound.matching_par(black_box(&processes)).len())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_bind, bench_check, bench_matching);
criterion_main!(benches);
