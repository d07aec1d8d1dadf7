//! Routing benchmarks.
//!
//! Run with: `cargo bench -p fox-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fox_router::{RouteTable, RoutingPolicy, Span};

fn build_table(num_routes: usize) -> RouteTable<usize> {
    let mut table = RouteTable::new(RoutingPolicy::default());
    table.use_prefix("/api", vec![0]).unwrap();

    for i in 0..num_routes / 3 {
        table
            .register("GET", &format!("/api/v1/resource{i}"), vec![i])
            .unwrap();
    }
    for i in 0..num_routes / 3 {
        table
            .register("GET", &format!("/api/v1/resource{i}/:id"), vec![i])
            .unwrap();
    }
    for i in 0..num_routes / 3 {
        table
            .register("GET", &format!("/api/v1/org/:org/resource{i}/:id?"), vec![i])
            .unwrap();
    }

    table
}

fn first_match(table: &RouteTable<usize>, path: &str) -> Option<usize> {
    let mut segments: Vec<Span> = Vec::with_capacity(8);
    let mut captures: Vec<Span> = Vec::with_capacity(4);
    table.policy().split_path(path, &mut segments);
    table
        .stack(0)
        .iter()
        .find(|route| !route.is_middleware() && route.matches(path, &segments, &mut captures))
        .map(|route| route.handlers()[0])
}

fn bench_static_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("static_match", |b| {
        b.iter(|| black_box(first_match(&table, "/api/v1/resource20")));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("param_match", |b| {
        b.iter(|| black_box(first_match(&table, "/api/v1/resource25/12345")));
    });
}

fn bench_optional_match(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("optional_match", |b| {
        b.iter(|| black_box(first_match(&table, "/api/v1/org/acme-corp/resource10")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("miss", |b| {
        b.iter(|| black_box(first_match(&table, "/api/v1/nonexistent/path")));
    });
}

fn bench_allowed_methods(c: &mut Criterion) {
    let table = build_table(100);

    c.bench_function("allowed_methods", |b| {
        b.iter(|| black_box(table.allowed_methods("/api/v1/resource25/12345")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_routes in [10, 50, 100, 500, 1000] {
        let table = build_table(num_routes);

        group.bench_with_input(
            BenchmarkId::new("static_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}", n / 6);
                b.iter(|| black_box(first_match(&table, &path)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("param_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}/12345", n / 6);
                b.iter(|| black_box(first_match(&table, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_optional_match,
    bench_miss,
    bench_allowed_methods,
    bench_scaling
);
criterion_main!(benches);
