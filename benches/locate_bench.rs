//! Benchmarks for range location and predicate evaluation
//!
//! Run with: cargo bench

use boardsift::crawl::locate;
use boardsift::model::{Comment, Entry, Sample, TimeOfDayWindow, TimeSpan};
use boardsift::query::Predicate;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 4)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

/// Samples every `stride` indices, newest first, one post per minute
fn create_samples(newest: u64, stride: u64) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut index = newest;
    while index >= 1 {
        samples.push(Sample::new(index, base() + Duration::minutes(index as i64)));
        match index.checked_sub(stride) {
            Some(next) => index = next,
            None => break,
        }
    }
    samples
}

fn create_entries(count: u64) -> Vec<Entry> {
    (1..=count)
        .map(|i| {
            let entry = Entry::posted_at(
                i,
                format!("[問卦] post {}", i),
                format!("user{} (nick)", i % 50),
                base() + Duration::minutes(i as i64),
            );
            if i % 3 == 0 {
                entry.comment(Comment::push(format!("user{}", i % 7), "推 好文"))
            } else {
                entry.comment(Comment::neutral("bob", "路過"))
            }
        })
        .collect()
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");

    for newest in [1_000u64, 10_000, 100_000] {
        let samples = create_samples(newest, 100);
        let start = base() + Duration::minutes((newest / 2) as i64);
        let span = TimeSpan::new(start, start + Duration::minutes(60)).unwrap();

        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_function(format!("samples_{}", samples.len()), |b| {
            b.iter(|| locate(black_box(&samples), black_box(&span), 100, newest))
        });
    }

    group.finish();
}

fn bench_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate");

    let entries = create_entries(10_000);
    let window = TimeOfDayWindow::new(
        NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
    )
    .unwrap();

    let title = Predicate::all(vec![
        Predicate::TitleContains("問卦".into()),
        Predicate::TimeOfDayWithin(window),
    ]);
    let commenter = Predicate::CommentAuthorIs("user3".into());

    group.throughput(Throughput::Elements(entries.len() as u64));

    group.bench_function("title_in_window", |b| {
        b.iter_batched(
            || entries.clone(),
            |entries| title.apply(black_box(entries)),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("comment_author", |b| {
        b.iter_batched(
            || entries.clone(),
            |entries| commenter.apply(black_box(entries)),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_locate, bench_predicates);
criterion_main!(benches);
