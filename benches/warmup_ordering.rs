use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portal_cache::warmup::{order_tasks, warmup_fn, WarmupPriority, WarmupTask};

/// `count` tasks in chains of four, priorities cycling low/medium/high
fn chained_tasks(count: usize) -> Vec<WarmupTask> {
    let priorities = [
        WarmupPriority::Low,
        WarmupPriority::Medium,
        WarmupPriority::High,
    ];
    (0..count)
        .map(|i| {
            let task = WarmupTask::new(
                format!("task_{i}"),
                priorities[i % priorities.len()],
                warmup_fn(|| async { Ok(()) }),
            );
            if i % 4 == 0 {
                task
            } else {
                task.depends_on([format!("task_{}", i - 1)])
            }
        })
        .collect()
}

fn benchmark_order_tasks(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_tasks");
    for count in [6, 64, 512] {
        let tasks = chained_tasks(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &tasks, |b, tasks| {
            b.iter(|| order_tasks(black_box(tasks)))
        });
    }
    group.finish();
}

fn benchmark_order_tasks_with_cycle(c: &mut Criterion) {
    let mut tasks = chained_tasks(64);
    tasks[0] = tasks[0].clone().depends_on(["task_63"]);
    c.bench_function("order_tasks_cycle", |b| {
        b.iter(|| order_tasks(black_box(&tasks)))
    });
}

criterion_group!(benches, benchmark_order_tasks, benchmark_order_tasks_with_cycle);
criterion_main!(benches);
