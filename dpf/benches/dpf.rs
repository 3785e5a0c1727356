use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dpf::eval::{evaluate_at, evaluate_domain_parallel, full_domain_iter};
use dpf::key::DpfParameters;
use dpf::keygen::generate_keys;

const LOG_DOMAIN_SIZES: [u32; 4] = [8, 12, 16, 20];
const VALUE_BIT_WIDTH: u32 = 64;

fn bench_keygen(c: &mut Criterion) {
    let mut group = c.benchmark_group("dpf-keygen");
    let beta = 0x1337_4247;
    for log_domain_size in LOG_DOMAIN_SIZES.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(log_domain_size),
            log_domain_size,
            |b, &log_domain_size| {
                let params = DpfParameters::new(log_domain_size, VALUE_BIT_WIDTH).unwrap();
                let alpha = (1u128 << log_domain_size) / 2;
                b.iter(|| {
                    let (_key_0, _key_1) = generate_keys(params, alpha, beta).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_evaluate_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("dpf-evaluate_at");
    for log_domain_size in LOG_DOMAIN_SIZES.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(log_domain_size),
            log_domain_size,
            |b, &log_domain_size| {
                let params = DpfParameters::new(log_domain_size, VALUE_BIT_WIDTH).unwrap();
                let alpha = (1u128 << log_domain_size) / 2;
                let (key_0, _key_1) = generate_keys(params, alpha, 0x1337_4247).unwrap();
                b.iter(|| {
                    evaluate_at(&key_0, alpha).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_evaluate_domain(c: &mut Criterion) {
    let mut group = c.benchmark_group("dpf-evaluate_domain");
    for log_domain_size in LOG_DOMAIN_SIZES.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(log_domain_size),
            log_domain_size,
            |b, &log_domain_size| {
                let params = DpfParameters::new(log_domain_size, VALUE_BIT_WIDTH).unwrap();
                let alpha = (1u128 << log_domain_size) / 2;
                let (key_0, _key_1) = generate_keys(params, alpha, 0x1337_4247).unwrap();
                b.iter(|| {
                    full_domain_iter(&key_0).for_each(|leaf| {
                        criterion::black_box(leaf);
                    });
                });
            },
        );
    }
    group.finish();
}

fn bench_evaluate_domain_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("dpf-evaluate_domain_parallel");
    for log_domain_size in LOG_DOMAIN_SIZES.iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(log_domain_size),
            log_domain_size,
            |b, &log_domain_size| {
                let params = DpfParameters::new(log_domain_size, VALUE_BIT_WIDTH).unwrap();
                let alpha = (1u128 << log_domain_size) / 2;
                let (key_0, _key_1) = generate_keys(params, alpha, 0x1337_4247).unwrap();
                b.iter(|| {
                    evaluate_domain_parallel(&key_0);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_keygen,
    bench_evaluate_at,
    bench_evaluate_domain,
    bench_evaluate_domain_parallel
);
criterion_main!(benches);
