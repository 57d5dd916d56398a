//! High concurrency stress tests for matchmaking
//!
//! Many scans run against the same queues at once; every waiting player must
//! end up in at most one room and nowhere else.

mod fixtures;

use fixtures::{test_config, TestArena, TestClient};
use quiz_arena::protocol::{ClientMessage, ServerMessage};
use quiz_arena::session::Binding;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const PLAYERS: usize = 200;
const SCANNERS: usize = 8;

fn connect_all(arena: &TestArena) -> Vec<TestClient> {
    (0..PLAYERS)
        .map(|i| arena.connect(&format!("load_{}", i), ((i * 13) % 800) as u32))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scans_never_double_match() {
    let arena = Arc::new(TestArena::scripted());
    let mut clients = connect_all(&arena);
    for client in &clients {
        client.send(&arena.context, ClientMessage::Match).await;
    }
    assert_eq!(arena.context.matchmaking.queues().len(), PLAYERS);

    let scans: Vec<_> = (0..SCANNERS)
        .map(|_| {
            let matchmaking = arena.context.matchmaking.clone();
            tokio::spawn(async move { matchmaking.run_scan().await })
        })
        .collect();

    let mut rooms_created = 0;
    for scan in scans {
        rooms_created += scan.await.unwrap().rooms_created();
    }
    assert!(rooms_created > 0);

    // every MATCH_SUCCESS names a room shared by exactly two players
    let mut members: HashMap<String, usize> = HashMap::new();
    for client in clients.iter_mut() {
        let matches: Vec<_> = client
            .drain()
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::MatchSuccess(matched) => Some(matched.room_id),
                _ => None,
            })
            .collect();
        assert!(matches.len() <= 1, "{} matched twice", client.profile.id);
        for room_id in matches {
            *members.entry(room_id).or_default() += 1;
        }
    }
    assert_eq!(members.len(), rooms_created);
    assert!(members.values().all(|count| *count == 2));
    assert_eq!(arena.context.arena.room_count(), rooms_created);

    // queued and seated players never overlap
    let queues = arena.context.matchmaking.queues();
    let mut seen = HashSet::new();
    for client in &clients {
        let queued = queues.contains(client.connection);
        let seated = matches!(
            arena.context.registry.binding(&client.profile.id),
            Some(Binding::InRoom { .. })
        );
        assert!(!(queued && seated), "{} queued and seated", client.profile.id);
        assert!(queued || seated, "{} lost", client.profile.id);
        assert!(seen.insert(client.profile.id.clone()));
    }
    assert_eq!(queues.len() + 2 * rooms_created, PLAYERS);

    arena.context.arena.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_match_requests_queue_once() {
    let arena = Arc::new(TestArena::new(
        test_config(),
        Arc::new(quiz_arena::questions::StaticQuestionBank::builtin()),
    ));
    let client = Arc::new(arena.connect("spammer", 100));

    let requests: Vec<_> = (0..50)
        .map(|_| {
            let arena = arena.clone();
            let client = client.clone();
            tokio::spawn(async move {
                client.send(&arena.context, ClientMessage::Match).await;
            })
        })
        .collect();
    for request in requests {
        request.await.unwrap();
    }

    assert_eq!(arena.context.matchmaking.queues().len(), 1);
    let rejected = arena
        .context
        .metrics
        .service()
        .protocol_errors_total
        .with_label_values(&["rejected"])
        .get();
    assert_eq!(rejected, 49);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_racing_scan_leaves_no_orphans() {
    let arena = Arc::new(TestArena::scripted());
    let clients = connect_all(&arena);
    for client in &clients {
        client.send(&arena.context, ClientMessage::Match).await;
    }

    let scan = {
        let matchmaking = arena.context.matchmaking.clone();
        tokio::spawn(async move { matchmaking.run_scan().await })
    };
    let clients = Arc::new(clients);
    let cancels = {
        let arena = arena.clone();
        let clients = clients.clone();
        tokio::spawn(async move {
            for client in clients.iter().step_by(2) {
                client.send(&arena.context, ClientMessage::Cancel).await;
            }
        })
    };

    let report = scan.await.unwrap();
    cancels.await.unwrap();

    // a player is either seated, still queued, or fully released
    for client in clients.iter() {
        let queued = arena.context.matchmaking.queues().contains(client.connection);
        match arena.context.registry.binding(&client.profile.id) {
            Some(Binding::InRoom { .. }) => assert!(!queued),
            Some(Binding::Waiting { .. }) => assert!(queued),
            None => assert!(!queued),
        }
    }
    assert_eq!(arena.context.arena.room_count(), report.rooms_created());

    arena.context.arena.shutdown().await;
}
