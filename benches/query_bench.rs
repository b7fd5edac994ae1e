use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Instant;
use sysgauge::error::ProcessError;
use sysgauge::system::process::ProcessEntry;
use sysgauge::system::query::{DEFAULT_LIST_LIMIT, SortKey, select_processes};
use sysgauge::system::rate::rate_kbs;

fn make_rows(n: usize) -> Vec<Result<ProcessEntry, ProcessError>> {
    (0..n)
        .map(|i| {
            if i % 50 == 49 {
                Err(ProcessError::NotFound(i as u32 + 1))
            } else {
                Ok(ProcessEntry::new(
                    i as u32 + 1,
                    format!("Proc_{}", (i * 7919) % n),
                    (i % 100) as f32,
                    ((n - i) % 37) as f32,
                ))
            }
        })
        .collect()
}

fn bench_select(c: &mut Criterion) {
    for sort in [SortKey::Cpu, SortKey::Memory, SortKey::Name] {
        let mut group = c.benchmark_group(format!(
            "select_processes_{}_500_1000_2000",
            sort.label().to_lowercase()
        ));
        for size in [500usize, 1000, 2000] {
            let rows = make_rows(size);
            group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
                b.iter(|| {
                    let out = select_processes(
                        black_box(rows.clone()),
                        black_box("proc_1"),
                        sort,
                        DEFAULT_LIST_LIMIT,
                    );
                    black_box(out);
                })
            });
        }
        group.finish();
    }
}

fn bench_rate(c: &mut Criterion) {
    let t0 = Instant::now();
    let t1 = t0 + std::time::Duration::from_millis(1000);
    c.bench_function("rate_kbs", |b| {
        b.iter(|| black_box(rate_kbs(black_box(1 << 20), black_box(3 << 20), t0, t1)))
    });
}

criterion_group!(benches, bench_select, bench_rate);
criterion_main!(benches);
