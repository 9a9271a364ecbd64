use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId, Throughput, black_box};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use readyrs::{baseline, dedup, illness, models, pmc, power, recovery, sleep, strain};

/// Performance benchmarks for the readiness engine
///
/// These benchmarks test the performance of core calculations
/// with varying dataset sizes to ensure scalability.

fn bench_strain_impulses(c: &mut Criterion) {
    let calc = strain::StrainCalculator::new();
    let ctx = strain::StrainContext {
        ftp: Some(250),
        max_hr: Some(190),
        resting_hr: Some(48),
    };

    let mut group = c.benchmark_group("Strain Impulses");

    // Summary-only activities take the platform TSS shortcut
    for &size in &[1, 10, 100, 1000] {
        let items = create_activity_batch(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_impulses", size),
            &items,
            |b, items| {
                b.iter(|| {
                    let _ = calc.batch_impulses(items, &ctx);
                });
            },
        );
    }

    // Stream-backed activities walk the normalized-power method
    for &points in &[600, 3600, 14400] {
        let items = vec![create_stream_activity(points)];

        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(
            BenchmarkId::new("stream_tss", points),
            &items,
            |b, items| {
                b.iter(|| {
                    let _ = calc.batch_impulses(items, &ctx);
                });
            },
        );
    }

    group.finish();
}

fn bench_power_analysis(c: &mut Criterion) {
    let estimator = power::ThresholdEstimator::new();
    let mut group = c.benchmark_group("Power Analysis");

    // Curve extraction over streams from 30 minutes to 4 hours
    for &duration in &[1800, 3600, 7200, 14400] {
        let observations = vec![create_observation(duration)];
        let window = models::DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );

        group.throughput(Throughput::Elements(duration as u64));
        group.bench_with_input(
            BenchmarkId::new("power_curve", duration),
            &observations,
            |b, observations| {
                b.iter(|| {
                    let _ = estimator.calculate_curve(observations, &window);
                });
            },
        );
    }

    // Rolling 30-second fourth-power mean
    for &data_points in &[360, 3600, 36000] {
        let points = create_power_points(data_points, 200);

        group.throughput(Throughput::Elements(data_points as u64));
        group.bench_with_input(
            BenchmarkId::new("normalized_power", data_points),
            &points,
            |b, points| {
                b.iter(|| {
                    let _ = strain::normalized_power(points);
                });
            },
        );
    }

    group.finish();
}

fn bench_load_replay(c: &mut Criterion) {
    let tracker = pmc::LoadTracker::new();
    let mut group = c.benchmark_group("Load Replay");

    for &days in &[7, 30, 90, 365] {
        let (daily_tss, window) = create_tss_series(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("replay", days),
            &daily_tss,
            |b, daily_tss| {
                b.iter(|| {
                    let _ = tracker.replay(pmc::LoadSeed::Estimated, daily_tss, &window);
                });
            },
        );
    }

    group.finish();
}

fn bench_daily_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("Daily Scoring");

    // Sleep scoring across increasingly fragmented nights
    let sleep_calc = sleep::SleepScoreCalculator::new();
    let duration_baseline = create_baseline(models::BaselineMetric::SleepDuration, 450.0);
    for &intervals in &[8, 32, 128] {
        let session = create_staged_session(intervals);

        group.bench_with_input(
            BenchmarkId::new("sleep_score", intervals),
            &session,
            |b, session| {
                let ctx = sleep::SleepContext {
                    duration_baseline: Some(&duration_baseline),
                    ..Default::default()
                };
                b.iter(|| {
                    let _ = sleep_calc.score(session, &ctx);
                });
            },
        );
    }

    // Recovery fusion with every factor available
    let recovery_calc = recovery::RecoveryScoreCalculator::new();
    let hrv = create_baseline(models::BaselineMetric::Hrv, 65.0);
    let rhr = create_baseline(models::BaselineMetric::RestingHr, 48.0);
    let resp = create_baseline(models::BaselineMetric::RespiratoryRate, 14.0);
    let night = models::DailyScore::new(bench_date(), models::ScoreType::Sleep, 85.0);
    group.bench_function("recovery_score", |b| {
        let inputs = recovery::RecoveryInputs {
            date: bench_date(),
            hrv: Some(62.0),
            hrv_baseline: Some(&hrv),
            resting_hr: Some(50.0),
            rhr_baseline: Some(&rhr),
            respiratory_rate: Some(14.4),
            respiratory_baseline: Some(&resp),
            sleep_score: Some(&night),
            tsb: Some(dec!(-4)),
            illness: None,
        };
        b.iter(|| {
            let _ = recovery_calc.score(black_box(&inputs));
        });
    });

    group.finish();
}

fn bench_baseline_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("Baseline Updates");

    for &days in &[30, 90, 365] {
        group.throughput(Throughput::Elements(days as u64 * 5));
        group.bench_with_input(
            BenchmarkId::new("update_window", days),
            &days,
            |b, &days| {
                b.iter_batched(
                    baseline::BaselineTracker::new,
                    |mut tracker| {
                        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                        for i in 0..days {
                            let date = start + Duration::days(i as i64);
                            let wobble = (i as f64 * 0.1).sin();
                            tracker.update(models::BaselineMetric::Hrv, 65.0 + wobble * 5.0, date);
                            tracker.update(
                                models::BaselineMetric::RestingHr,
                                48.0 - wobble * 2.0,
                                date,
                            );
                            tracker.update(
                                models::BaselineMetric::RespiratoryRate,
                                14.0 + wobble,
                                date,
                            );
                            tracker.update(
                                models::BaselineMetric::SleepDuration,
                                450.0 + wobble * 30.0,
                                date,
                            );
                            tracker.update(
                                models::BaselineMetric::TrainingVolume,
                                70.0 + wobble * 40.0,
                                date,
                            );
                        }
                        black_box(tracker);
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_illness_sweep(c: &mut Criterion) {
    let detector = illness::IllnessDetector::new();
    let hrv = create_baseline(models::BaselineMetric::Hrv, 65.0);
    let rhr = create_baseline(models::BaselineMetric::RestingHr, 48.0);
    let resp = create_baseline(models::BaselineMetric::RespiratoryRate, 14.0);
    let volume = create_baseline(models::BaselineMetric::TrainingVolume, 70.0);
    let ctx = illness::IllnessContext {
        hrv_baseline: Some(&hrv),
        rhr_baseline: Some(&rhr),
        respiratory_baseline: Some(&resp),
        activity_baseline: Some(&volume),
    };

    let mut group = c.benchmark_group("Illness Sweep");

    for &days in &[7, 14, 28] {
        let window = create_vitals_window(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("evaluate", days),
            &window,
            |b, window| {
                b.iter(|| {
                    let _ = detector.evaluate(window, &ctx);
                });
            },
        );
    }

    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let deduplicator = dedup::Deduplicator::new();
    let mut group = c.benchmark_group("Deduplication");

    for &size in &[10, 100, 1000] {
        let activities = create_duplicated_batch(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("dedup", size),
            &activities,
            |b, activities| {
                b.iter(|| {
                    let _ = deduplicator.dedup(activities.clone());
                });
            },
        );
    }

    group.finish();
}

fn bench_data_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("Data Serialization");

    for &num_scores in &[10, 100, 1000] {
        let scores = create_score_series(num_scores);

        group.throughput(Throughput::Elements(num_scores as u64));
        group.bench_with_input(
            BenchmarkId::new("json_serialize", num_scores),
            &scores,
            |b, scores| {
                b.iter(|| {
                    let _ = serde_json::to_string(scores);
                });
            },
        );

        let json_data = serde_json::to_string(&scores).unwrap();
        group.bench_with_input(
            BenchmarkId::new("json_deserialize", num_scores),
            &json_data,
            |b, json| {
                b.iter(|| {
                    let _: Result<Vec<models::DailyScore>, _> = serde_json::from_str(json);
                });
            },
        );
    }

    group.finish();
}

// Helper functions for benchmarks

fn bench_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn create_baseline(metric: models::BaselineMetric, mean: f64) -> models::DailyBaseline {
    models::DailyBaseline {
        metric,
        date: bench_date(),
        mean,
        std_dev: mean * 0.05,
        window_size_days: 7,
        sample_count: 7,
        low_confidence: false,
    }
}

fn create_activity_batch(
    size: usize,
) -> Vec<(models::Activity, Option<models::ActivitySamples>)> {
    (0..size)
        .map(|i| {
            let category = match i % 3 {
                0 => models::ActivityCategory::Cardio,
                1 => models::ActivityCategory::Strength,
                _ => models::ActivityCategory::General,
            };
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 17, 0, 0).unwrap()
                + Duration::days((i % 365) as i64);

            let mut activity =
                models::Activity::new(start, 3600 + (i % 3600) as u32, category);
            activity.id = format!("bench_activity_{}", i);
            activity.source_platform = "garmin".to_string();
            activity.tss = Some(dec!(70) + Decimal::from((i % 40) as u32));
            (activity, None)
        })
        .collect()
}

fn create_stream_activity(
    points: usize,
) -> (models::Activity, Option<models::ActivitySamples>) {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap();
    let mut activity =
        models::Activity::new(start, points as u32, models::ActivityCategory::Cardio);
    activity.id = format!("bench_stream_{}", points);
    activity.source_platform = "garmin".to_string();

    let samples = models::ActivitySamples {
        activity_id: activity.id.clone(),
        points: create_power_points(points, 200),
    };
    (activity, Some(samples))
}

fn create_power_points(count: usize, base: u16) -> Vec<models::SamplePoint> {
    (0..count)
        .map(|i| models::SamplePoint {
            offset_seconds: i as u32,
            heart_rate: Some(150 + (i % 30) as u16),
            power: Some(base + (i % 100) as u16),
        })
        .collect()
}

fn create_observation(duration: usize) -> power::PowerObservation {
    power::PowerObservation {
        date: bench_date(),
        activity_id: format!("bench_ride_{}", duration),
        watts: (0..duration).map(|i| 180 + (i % 120) as u16).collect(),
    }
}

fn create_tss_series(days: usize) -> (BTreeMap<NaiveDate, Decimal>, models::DateWindow) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    let mut daily_tss = BTreeMap::new();
    for day in 0..days {
        // Skip some days for rest
        if day % 7 == 6 {
            continue;
        }
        let date = start + Duration::days(day as i64);
        daily_tss.insert(date, dec!(70) + Decimal::from((day % 60) as u32));
    }

    let window = models::DateWindow::new(start, start + Duration::days(days as i64 - 1));
    (daily_tss, window)
}

fn create_staged_session(intervals: usize) -> models::SleepSession {
    let bedtime = Utc.with_ymd_and_hms(2024, 6, 14, 22, 0, 0).unwrap();
    let minutes_each = (480 / intervals.max(1)) as i64;

    let stages = (0..intervals)
        .map(|i| {
            let stage = match i % 4 {
                0 => models::SleepStage::Core,
                1 => models::SleepStage::Deep,
                2 => models::SleepStage::Rem,
                _ => models::SleepStage::Core,
            };
            models::StageInterval::new(
                stage,
                bedtime + Duration::minutes(i as i64 * minutes_each),
                bedtime + Duration::minutes((i as i64 + 1) * minutes_each),
            )
        })
        .collect();

    models::SleepSession::from_stages(bench_date(), stages).unwrap()
}

fn create_vitals_window(days: usize) -> Vec<illness::DailyVitals> {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    (0..days)
        .map(|i| {
            let wobble = (i as f64 * 0.4).sin();
            illness::DailyVitals {
                date: start + Duration::days(i as i64),
                hrv: Some(65.0 + wobble * 6.0),
                resting_hr: Some(48.0 - wobble * 2.0),
                respiratory_rate: Some(14.0 + wobble * 0.5),
                sleep_score: Some(80.0 + wobble * 10.0),
                activity_minutes: Some(70.0 + wobble * 30.0),
            }
        })
        .collect()
}

fn create_duplicated_batch(size: usize) -> Vec<models::Activity> {
    let mut activities = Vec::with_capacity(size);
    for i in 0..size {
        // Consecutive entries pair up as the same ride seen twice
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
            + Duration::hours((i / 2) as i64 * 20);
        let start = base + Duration::seconds((i % 2) as i64 * 30);

        let mut activity =
            models::Activity::new(start, 3600, models::ActivityCategory::Cardio);
        activity.id = format!("bench_activity_{}", i);
        activity.source_platform = if i % 2 == 0 { "garmin" } else { "strava" }.to_string();
        activity.tss = Some(dec!(85));
        activities.push(activity);
    }
    activities
}

fn create_score_series(size: usize) -> Vec<models::DailyScore> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    (0..size)
        .map(|i| {
            let value = 50.0 + ((i as f64 * 0.2).sin() + 1.0) * 25.0;
            models::DailyScore::new(
                start + Duration::days((i % 365) as i64),
                models::ScoreType::Recovery,
                value,
            )
            .with_sub_score("hrv", value)
            .with_sub_score("sleep", value * 0.9)
        })
        .collect()
}

// Define benchmark groups
criterion_group!(
    benches,
    bench_strain_impulses,
    bench_power_analysis,
    bench_load_replay,
    bench_daily_scoring,
    bench_baseline_updates,
    bench_illness_sweep,
    bench_dedup,
    bench_data_serialization
);

criterion_main!(benches);
