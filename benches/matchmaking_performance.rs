//! Performance benchmarks for matchmaking scans and room scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quiz_arena::bot::BotSimulator;
use quiz_arena::config::{BotSettings, DuelSettings, MatchmakingSettings};
use quiz_arena::duel::{DuelArena, DuelRoom, SeatInfo};
use quiz_arena::matchmaking::MatchmakingManager;
use quiz_arena::metrics::MetricsCollector;
use quiz_arena::questions::StaticQuestionBank;
use quiz_arena::rating::{classify, InMemoryPlayerStore, RatingRules};
use quiz_arena::session::ConnectionRegistry;
use quiz_arena::types::{PlayerProfile, Question, Seat};
use quiz_arena::utils::{generate_connection_id, generate_room_id};
use std::sync::Arc;

fn create_bench_system() -> (MatchmakingManager, Arc<ConnectionRegistry>) {
    let registry = Arc::new(ConnectionRegistry::new());
    let metrics = Arc::new(MetricsCollector::new().unwrap());
    let bot = Arc::new(BotSimulator::new(BotSettings {
        seed: Some(7),
        ..BotSettings::default()
    }));
    let arena = DuelArena::new(
        registry.clone(),
        bot.clone(),
        Arc::new(InMemoryPlayerStore::default()),
        RatingRules::default(),
        DuelSettings::default(),
        metrics.clone(),
    );
    let manager = MatchmakingManager::new(
        registry.clone(),
        arena,
        Arc::new(StaticQuestionBank::with_seed(
            StaticQuestionBank::builtin().questions().to_vec(),
            7,
        )),
        bot,
        MatchmakingSettings::default(),
        metrics,
    );
    (manager, registry)
}

fn profile(index: usize) -> PlayerProfile {
    PlayerProfile {
        id: format!("bench_player_{}", index),
        name: format!("Bench {}", index),
        avatar: None,
        rating_points: ((index * 37) % 900) as u32,
    }
}

fn bench_tier_classification(c: &mut Criterion) {
    c.bench_function("classify_1000_ratings", |b| {
        b.iter(|| {
            for points in 0..1000u32 {
                black_box(classify(black_box(points)));
            }
        })
    });
}

fn bench_scan(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("matchmaking_scan");

    for players in [10usize, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(players), &players, |b, &players| {
            b.iter(|| {
                rt.block_on(async {
                    let (manager, registry) = create_bench_system();
                    let mut inboxes = Vec::with_capacity(players);
                    for index in 0..players {
                        let player = profile(index);
                        let (connection, inbox) = registry.register(player.clone());
                        let _ = manager.enqueue(connection, player);
                        inboxes.push(inbox);
                    }

                    let report = manager.run_scan().await;
                    manager.arena().shutdown().await;
                    black_box(report)
                })
            })
        });
    }
    group.finish();
}

fn bench_room_rounds(c: &mut Criterion) {
    let questions: Vec<Question> = StaticQuestionBank::builtin().questions().to_vec();

    c.bench_function("room_full_game_10_rounds", |b| {
        b.iter(|| {
            let mut room = DuelRoom::new(
                generate_room_id(),
                SeatInfo::player(profile(0), generate_connection_id()),
                SeatInfo::player(profile(1), generate_connection_id()),
                questions.clone(),
                20,
                1,
            )
            .unwrap();

            room.begin();
            loop {
                let correct = room.current_question().answer.clone();
                room.submit_answer(Seat::A, &correct, None);
                room.submit_answer(Seat::B, "Z", None);
                black_box(room.resolve_round(false));
                if !room.advance() {
                    break;
                }
            }
            room.finish();
            black_box(room.outcome_for(Seat::A))
        })
    });
}

criterion_group!(
    benches,
    bench_tier_classification,
    bench_scan,
    bench_room_rounds
);
criterion_main!(benches);
