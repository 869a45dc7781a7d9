//! Benchmark tests for kino-telemetry operations
//!
//! Run with: cargo bench -p kino-telemetry

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use kino_telemetry::adapter::{self, DiscontinuityReason};
use kino_telemetry::{
    content_id, Credentials, EventEnricher, FakeClock, PlaybackStateTracker, PlayerPlaybackState,
    PlayerSignal,
};

// ============================================================================
// Helpers
// ============================================================================

/// One startup, one seek, one rebuffer and a rendition switch
fn session_script() -> Vec<PlayerSignal> {
    let state = |state| PlayerSignal::PlaybackStateChanged { state };
    vec![
        PlayerSignal::TimelineChanged {
            base_uri: Some("https://cdn.example.com/720p/".to_string()),
        },
        state(PlayerPlaybackState::Buffering),
        state(PlayerPlaybackState::Ready),
        PlayerSignal::IsPlayingChanged { is_playing: true },
        PlayerSignal::RenderedFirstFrame,
        PlayerSignal::PositionDiscontinuity {
            old_position_ms: 10_000,
            new_position_ms: 20_000,
            reason: DiscontinuityReason::Seek,
        },
        PlayerSignal::IsPlayingChanged { is_playing: false },
        state(PlayerPlaybackState::Buffering),
        state(PlayerPlaybackState::Ready),
        PlayerSignal::IsPlayingChanged { is_playing: true },
        state(PlayerPlaybackState::Buffering),
        PlayerSignal::IsPlayingChanged { is_playing: true },
        PlayerSignal::TimelineChanged {
            base_uri: Some("https://cdn.example.com/1080p/".to_string()),
        },
        state(PlayerPlaybackState::Ended),
    ]
}

// ============================================================================
// Tracker Benchmarks
// ============================================================================

fn bench_tracker_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tracker Session");
    let script = session_script();

    for sessions in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &sessions, |b, &sessions| {
            b.iter(|| {
                let clock = Arc::new(FakeClock::new(0));
                let mut emitted = 0;
                for _ in 0..sessions {
                    let mut tracker = PlaybackStateTracker::new(clock.clone());
                    for signal in &script {
                        clock.advance(40);
                        emitted += adapter::translate(&mut tracker, signal.clone()).len();
                    }
                }
                black_box(emitted)
            });
        });
    }

    group.finish();
}

fn bench_enrichment(c: &mut Criterion) {
    let clock = Arc::new(FakeClock::new(1_700_000_000_000));
    let enricher = EventEnricher::new(Credentials::new("1001", "token"), clock.clone());
    let mut tracker = PlaybackStateTracker::new(clock);
    tracker.media_item_changed("https://cdn.example.com/master.m3u8");
    let events = session_script()
        .into_iter()
        .flat_map(|signal| adapter::translate(&mut tracker, signal))
        .collect::<Vec<_>>();

    c.bench_function("enrich_session_events", |b| {
        b.iter(|| {
            for (i, event) in events.iter().enumerate() {
                black_box(enricher.enrich(tracker.session(), event.clone(), i as u64));
            }
        });
    });

    c.bench_function("enrich_serialize_json", |b| {
        b.iter(|| {
            for (i, event) in events.iter().enumerate() {
                let enriched = enricher.enrich(tracker.session(), event.clone(), i as u64);
                black_box(serde_json::to_vec(&enriched).ok());
            }
        });
    });
}

fn bench_content_id(c: &mut Criterion) {
    c.bench_function("content_id", |b| {
        b.iter(|| content_id(black_box("https://cdn.example.com/stream/1080p/index.m3u8")))
    });
}

criterion_group!(
    tracker_benches,
    bench_tracker_session,
);

criterion_group!(
    enrich_benches,
    bench_enrichment,
    bench_content_id,
);

criterion_main!(
    tracker_benches,
    enrich_benches,
);
