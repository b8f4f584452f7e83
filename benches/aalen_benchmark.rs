use aalen_hazards::{AalenFitter, SurvivalTable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_synthetic_table(n_samples: usize, n_features: usize) -> SurvivalTable {
    let mut rng = StdRng::seed_from_u64(42);

    let mut times = Vec::with_capacity(n_samples);
    let mut events = Vec::with_capacity(n_samples);
    let mut features: Vec<Vec<f64>> = vec![Vec::with_capacity(n_samples); n_features];

    for _ in 0..n_samples {
        let mut linear_pred = 0.0;
        for (j, feature) in features.iter_mut().enumerate() {
            let value: f64 = rng.gen_range(-2.0..2.0);
            if j < 3 {
                linear_pred += value * [0.5, -0.3, 0.2][j];
            }
            feature.push(value);
        }

        let rate = 0.1 * linear_pred.exp();
        let uniform: f64 = rng.gen_range(0.0001..1.0);
        let time = (-uniform.ln() / rate).max(0.1);
        let censoring_time = rng.gen_range(1.0..8.0);

        if time < censoring_time {
            times.push(time);
            events.push(1.0);
        } else {
            times.push(censoring_time);
            events.push(0.0);
        }
    }

    let mut table = SurvivalTable::new()
        .with_column("T", times)
        .unwrap()
        .with_column("E", events)
        .unwrap();
    for (j, feature) in features.into_iter().enumerate() {
        table = table.with_column(&format!("x{}", j), feature).unwrap();
    }
    table
}

fn benchmark_aalen_fitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("aalen_fitting");

    for &n_samples in [50, 100, 200, 500].iter() {
        for &n_features in [2, 5, 10].iter() {
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{}x{}", n_samples, n_features)),
                &(n_samples, n_features),
                |b, &(n_samples, n_features)| {
                    let table = generate_synthetic_table(n_samples, n_features);
                    b.iter(|| {
                        let mut aaf = AalenFitter::new().with_coef_penalizer(0.1);
                        aaf.fit(black_box(&table), "T", Some("E"), None, false).unwrap();
                    });
                },
            );
        }
    }
    group.finish();
}

fn benchmark_penalizers(c: &mut Criterion) {
    let mut group = c.benchmark_group("penalized_fitting");

    let table = generate_synthetic_table(200, 8);

    for &coef_penalizer in [0.0, 0.1, 1.0].iter() {
        for &smoothing_penalizer in [0.0, 0.5].iter() {
            group.bench_with_input(
                BenchmarkId::from_parameter(format!(
                    "c1_{}_c2_{}",
                    coef_penalizer, smoothing_penalizer
                )),
                &(coef_penalizer, smoothing_penalizer),
                |b, &(coef_penalizer, smoothing_penalizer)| {
                    b.iter(|| {
                        let mut aaf = AalenFitter::new()
                            .with_coef_penalizer(coef_penalizer)
                            .with_smoothing_penalizer(smoothing_penalizer);
                        aaf.fit(black_box(&table), "T", Some("E"), None, false).unwrap();
                    });
                },
            );
        }
    }
    group.finish();
}

fn benchmark_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let train = generate_synthetic_table(200, 5);
    let mut aaf = AalenFitter::new().with_coef_penalizer(0.1);
    aaf.fit(&train, "T", Some("E"), None, false).unwrap();

    for &n_samples in [50, 100, 500].iter() {
        let test = generate_synthetic_table(n_samples, 5);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("cumulative_hazard_{}", n_samples)),
            &n_samples,
            |b, _| {
                b.iter(|| {
                    aaf.predict_cumulative_hazard(black_box(&test)).unwrap();
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("median_{}", n_samples)),
            &n_samples,
            |b, _| {
                b.iter(|| {
                    aaf.predict_median(black_box(&test)).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn benchmark_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");

    let table = generate_synthetic_table(300, 8);
    let mut aaf = AalenFitter::new().with_coef_penalizer(0.1);
    aaf.fit(&table, "T", Some("E"), None, false).unwrap();

    group.bench_function("summary_table", |b| {
        b.iter(|| {
            black_box(aaf.summary().unwrap());
        });
    });

    group.bench_function("smoothed_hazards", |b| {
        b.iter(|| {
            black_box(aaf.smoothed_hazards(2.0).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_aalen_fitting,
    benchmark_penalizers,
    benchmark_prediction,
    benchmark_summary
);

criterion_main!(benches);
