use chrono::{Duration as ChronoDuration, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::Rng;
use reveal::domain::rsvp::{Attendance, GenderPrediction, RsvpRecord};
use reveal::domain::stats::DashboardStats;
use reveal::services::admin_sync::filter_records;
use reveal::services::FilterCriteria;
use std::time::Duration;

const SURNAMES: [&str; 6] = ["Tan", "Santos", "Wei", "Lim", "Garcia", "Okafor"];

fn random_guests(count: usize) -> Vec<RsvpRecord> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    (0..count)
        .map(|i| {
            let surname = SURNAMES[rng.gen_range(0..SURNAMES.len())];
            RsvpRecord {
                id: i as i64 + 1,
                guest_name: format!("Guest{} {}", i, surname),
                email: format!("guest{}@example.com", i),
                phone: rng.gen_bool(0.3).then(|| "+65 9123 4567".to_string()),
                attendee_count: rng.gen_range(1..=10),
                attendance: if rng.gen_bool(0.8) {
                    Attendance::Coming
                } else {
                    Attendance::NotComing
                },
                gender_prediction: if rng.gen_bool(0.5) {
                    GenderPrediction::Boy
                } else {
                    GenderPrediction::Girl
                },
                dietary_restrictions: None,
                special_message: rng.gen_bool(0.2).then(|| "Congrats!".to_string()),
                created_at: now - ChronoDuration::minutes(rng.gen_range(0..60 * 24 * 14)),
                updated_at: None,
            }
        })
        .collect()
}

fn bench_dashboard_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("dashboard_stats");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    let today = Utc::now().date_naive();

    for count in [100, 1000, 10_000].iter() {
        let guests = random_guests(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &guests, |b, guests| {
            b.iter(|| black_box(DashboardStats::compute(guests, today)));
        });
    }
    group.finish();
}

fn bench_client_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("client_filter");
    group.sample_size(20);

    let criteria = FilterCriteria {
        attendance: Some(Attendance::Coming),
        gender_prediction: Some(GenderPrediction::Girl),
        search: Some("santos".to_string()),
    };

    for count in [100, 1000, 10_000].iter() {
        let guests = random_guests(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &guests, |b, guests| {
            b.iter(|| black_box(filter_records(guests, &criteria)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dashboard_stats, bench_client_filter);

criterion_main!(benches);
