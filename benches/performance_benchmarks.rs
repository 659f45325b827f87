use aerors::{
    Activity, ActivityPoint, AeroAnalyzer, CdaRegressionEstimator, NormalizedPowerCalculator,
    PhysicalConstants, PowerComponentModel,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Performance benchmarks for the analysis core
///
/// Ride lengths range from a 30 minute effort to a 4 hour ride at 1 Hz.

const RIDE_LENGTHS: [usize; 4] = [1800, 3600, 7200, 14400];

fn create_ride(seconds: usize) -> Vec<ActivityPoint> {
    (0..seconds)
        .map(|i| {
            let t = i as f64;
            let speed = 9.0 + 2.0 * (t / 45.0).sin();
            let grade = 0.03 * (t / 300.0).sin();
            let power = 220.0 + 60.0 * (t / 30.0).sin() + 25.0 * (t / 7.0).cos();
            ActivityPoint::new(i as u32, power, speed, grade)
        })
        .collect()
}

fn bench_power_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("Power Components");
    let constants = PhysicalConstants::default();

    for &seconds in &RIDE_LENGTHS {
        let ride = create_ride(seconds);

        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(BenchmarkId::new("compute_series", seconds), &ride, |b, ride| {
            b.iter(|| PowerComponentModel::compute_series(black_box(ride), &constants));
        });
    }

    group.finish();
}

fn bench_normalized_power(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalized Power");

    for &seconds in &RIDE_LENGTHS {
        let power: Vec<f64> = create_ride(seconds).iter().map(|p| p.power_w).collect();

        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(BenchmarkId::new("window_30", seconds), &power, |b, power| {
            b.iter(|| NormalizedPowerCalculator::normalized_power(black_box(power), 30));
        });
    }

    group.finish();
}

fn bench_cda_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("CdA Regression");
    let constants = PhysicalConstants::default();
    let estimator = CdaRegressionEstimator::new();

    for &seconds in &RIDE_LENGTHS {
        let ride = create_ride(seconds);

        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(BenchmarkId::new("estimate", seconds), &ride, |b, ride| {
            b.iter(|| estimator.estimate(black_box(ride), &constants));
        });
    }

    group.finish();
}

fn bench_batch_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch Analysis");
    group.sample_size(20);
    let analyzer = AeroAnalyzer::default();

    for &count in &[1, 8, 32] {
        let activities: Vec<Activity> = (0..count)
            .map(|i| Activity::new(format!("ride-{}", i), create_ride(3600)))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("analyze_batch", count),
            &activities,
            |b, activities| {
                b.iter(|| analyzer.analyze_batch(black_box(activities)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_power_components,
    bench_normalized_power,
    bench_cda_regression,
    bench_batch_analysis
);
criterion_main!(benches);
