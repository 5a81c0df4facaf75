//! Integration tests for the room system: registry, actors and publisher
//! working together, observed the way a subscriber sees them.

use std::sync::Arc;
use std::time::Duration;

use cardroom_protocol::{InboundEvent, RoomId, Snapshot};
use cardroom_room::{RoomConfig, RoomError, RoomRegistry, TopicPublisher};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

// =========================================================================
// Helpers
// =========================================================================

fn setup() -> (RoomRegistry, Arc<TopicPublisher>) {
    setup_with(RoomConfig::default())
}

fn setup_with(config: RoomConfig) -> (RoomRegistry, Arc<TopicPublisher>) {
    let publisher = Arc::new(TopicPublisher::new(config.snapshot_buffer));
    let registry = RoomRegistry::new(config, publisher.clone());
    (registry, publisher)
}

fn rid(id: &str) -> RoomId {
    RoomId::from(id)
}

fn join(room: &str, id: &str, name: &str) -> InboundEvent {
    InboundEvent::Join {
        room_id: rid(room),
        participant_id: id.into(),
        name: name.to_string(),
    }
}

fn leave(room: &str, id: &str) -> InboundEvent {
    InboundEvent::Leave {
        room_id: rid(room),
        participant_id: id.into(),
    }
}

fn play(room: &str, id: &str, card: &str) -> InboundEvent {
    InboundEvent::CardPlayed {
        room_id: rid(room),
        participant_id: id.into(),
        card: card.to_string(),
    }
}

fn reveal(room: &str) -> InboundEvent {
    InboundEvent::Reveal { room_id: rid(room) }
}

fn reset(room: &str) -> InboundEvent {
    InboundEvent::Reset { room_id: rid(room) }
}

/// Receives the next snapshot or fails the test after one second.
async fn next(rx: &mut broadcast::Receiver<Snapshot>) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("snapshot within a second")
        .expect("topic open")
}

/// Waits (bounded) until the registry holds `expected` rooms.
async fn wait_for_room_count(registry: &RoomRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.room_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {expected} rooms, still have {}",
        registry.room_count().await
    );
}

fn cards(snapshot: &Snapshot) -> Vec<&str> {
    snapshot
        .participants
        .iter()
        .map(|p| p.card.as_str())
        .collect()
}

// =========================================================================
// Voting round: scenarios A-F
// =========================================================================

#[tokio::test]
async fn test_scenario_a_two_joins_start_empty_and_hidden() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));

    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    registry.dispatch(join("r1", "p2", "Bob")).await.unwrap();

    let first = next(&mut rx).await;
    assert_eq!(first.participants.len(), 1);

    let snap = next(&mut rx).await;
    assert_eq!(cards(&snap), vec!["", ""]);
    assert_eq!(snap.participants[0].name, "Alice");
    assert_eq!(snap.participants[1].name, "Bob");
    assert!(!snap.revealed);
    assert!(!snap.reveal_eligible());
}

#[tokio::test]
async fn test_scenario_b_c_votes_then_reveal_once() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    for event in [
        join("r1", "p1", "Alice"),
        join("r1", "p2", "Bob"),
        play("r1", "p1", "5"),
        play("r1", "p2", "8"),
    ] {
        registry.dispatch(event).await.unwrap();
    }
    for _ in 0..3 {
        next(&mut rx).await;
    }

    // B
    let voted = next(&mut rx).await;
    assert!(voted.all_voted());
    assert!(!voted.revealed);

    // C
    registry.dispatch(reveal("r1")).await.unwrap();
    let revealed = next(&mut rx).await;
    assert!(revealed.revealed);
    assert_eq!(cards(&revealed), vec!["5", "8"]);

    registry.dispatch(reveal("r1")).await.unwrap();
    let again = next(&mut rx).await;
    assert_eq!(again, revealed);
}

#[tokio::test]
async fn test_scenario_d_reset_snapshot_shape() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    for event in [
        join("r1", "p1", "Alice"),
        join("r1", "p2", "Bob"),
        play("r1", "p1", "5"),
        play("r1", "p2", "8"),
        reveal("r1"),
        reset("r1"),
    ] {
        registry.dispatch(event).await.unwrap();
    }
    for _ in 0..5 {
        next(&mut rx).await;
    }

    let after_reset = next(&mut rx).await;
    assert_eq!(
        serde_json::to_value(&after_reset).unwrap(),
        serde_json::json!({
            "players": [
                {"id": "p1", "name": "Alice", "card": ""},
                {"id": "p2", "name": "Bob", "card": ""}
            ],
            "revealed": false,
            "reset": true
        })
    );

    // One-shot: the next snapshot no longer carries the flag.
    registry.dispatch(play("r1", "p1", "3")).await.unwrap();
    assert!(!next(&mut rx).await.just_reset);
}

#[tokio::test]
async fn test_scenario_e_unknown_participant_rebroadcasts_same_state() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    let before = next(&mut rx).await;

    registry.dispatch(play("r1", "ghost", "5")).await.unwrap();

    assert_eq!(next(&mut rx).await, before);
}

#[tokio::test]
async fn test_scenario_f_last_leave_retires_room() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    registry.dispatch(join("r1", "p2", "Bob")).await.unwrap();
    registry.dispatch(play("r1", "p1", "5")).await.unwrap();
    for _ in 0..3 {
        next(&mut rx).await;
    }

    registry.dispatch(leave("r1", "p2")).await.unwrap();
    let one_left = next(&mut rx).await;
    assert_eq!(one_left.participants.len(), 1);
    assert_eq!(one_left.participants[0].id.as_str(), "p1");

    registry.dispatch(leave("r1", "p1")).await.unwrap();
    assert!(next(&mut rx).await.participants.is_empty());
    wait_for_room_count(&registry, 0).await;

    // Next lookup creates a fresh, empty room.
    let handle = registry.get_or_create(&rid("r1")).await;
    let fresh = handle.snapshot().await.unwrap();
    assert!(fresh.participants.is_empty());
    assert!(!fresh.revealed);
}

// =========================================================================
// Properties
// =========================================================================

#[tokio::test]
async fn test_card_played_is_ignored_until_reset() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    for event in [
        join("r1", "p1", "Alice"),
        play("r1", "p1", "5"),
        reveal("r1"),
        play("r1", "p1", "13"),
        reset("r1"),
        play("r1", "p1", "13"),
    ] {
        registry.dispatch(event).await.unwrap();
    }

    let snaps: Vec<Snapshot> = {
        let mut v = Vec::new();
        for _ in 0..6 {
            v.push(next(&mut rx).await);
        }
        v
    };
    assert_eq!(cards(&snaps[3]), vec!["5"]);
    assert_eq!(cards(&snaps[5]), vec!["13"]);
}

#[tokio::test]
async fn test_reveal_never_exposes_missing_votes() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    for event in [
        join("r1", "p1", "Alice"),
        join("r1", "p2", "Bob"),
        play("r1", "p1", "5"),
        reveal("r1"),
        play("r1", "p1", ""),
        reveal("r1"),
    ] {
        registry.dispatch(event).await.unwrap();
    }

    for _ in 0..6 {
        let snap = next(&mut rx).await;
        assert!(!snap.revealed, "revealed without everyone voting: {snap:?}");
    }
}

#[tokio::test]
async fn test_every_event_yields_exactly_one_snapshot() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    let events = vec![
        join("r1", "p1", "Alice"),
        reveal("r1"),             // no-op
        play("r1", "ghost", "1"), // no-op
        leave("r1", "ghost"),     // no-op
        join("r1", "p1", "Alice"),
        reset("r1"),
    ];
    let count = events.len();
    for event in events {
        registry.dispatch(event).await.unwrap();
    }

    for _ in 0..count {
        next(&mut rx).await;
    }
    // The query is queued behind the events, so once it answers every
    // event has been processed and published.
    registry.snapshot(&rid("r1")).await.unwrap();
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_concurrent_senders_are_serialized() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("r1"));
    registry.dispatch(join("r1", "host", "Host")).await.unwrap();
    next(&mut rx).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("p{i}");
            registry.dispatch(join("r1", &id, &id)).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Each snapshot reflects exactly one more join than the last.
    for expected in 2..=21 {
        assert_eq!(next(&mut rx).await.participants.len(), expected);
    }
}

#[tokio::test]
async fn test_rooms_are_independent() {
    let (registry, publisher) = setup();
    let mut rx1 = publisher.subscribe(&rid("r1"));
    let mut rx2 = publisher.subscribe(&rid("r2"));

    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    registry.dispatch(join("r2", "p1", "Alice")).await.unwrap();
    registry.dispatch(play("r1", "p1", "5")).await.unwrap();

    next(&mut rx1).await;
    assert_eq!(cards(&next(&mut rx1).await), vec!["5"]);
    assert_eq!(cards(&next(&mut rx2).await), vec![""]);
    assert!(matches!(rx2.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(registry.room_ids().await, vec![rid("r1"), rid("r2")]);
}

// =========================================================================
// Registry operations
// =========================================================================

#[tokio::test]
async fn test_dispatch_non_join_to_unknown_room_is_dropped() {
    let (registry, publisher) = setup();
    let mut rx = publisher.subscribe(&rid("nowhere"));

    let result = registry.dispatch(reveal("nowhere")).await;

    assert!(matches!(result, Err(RoomError::NotFound(id)) if id == rid("nowhere")));
    assert_eq!(registry.room_count().await, 0);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_get_or_create_returns_same_room() {
    let (registry, _publisher) = setup();

    let a = registry.get_or_create(&rid("r1")).await;
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    let b = registry.get_or_create(&rid("r1")).await;

    assert_eq!(registry.room_count().await, 1);
    assert_eq!(a.snapshot().await.unwrap(), b.snapshot().await.unwrap());
}

#[tokio::test]
async fn test_remove_if_empty_keeps_occupied_room() {
    let (registry, _publisher) = setup();
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();

    registry.remove_if_empty(&rid("r1")).await.unwrap();

    let snap = registry.snapshot(&rid("r1")).await.unwrap();
    assert_eq!(snap.participants.len(), 1);
    assert_eq!(registry.room_count().await, 1);
}

#[tokio::test]
async fn test_remove_if_empty_retires_never_joined_room() {
    let (registry, _publisher) = setup();
    registry.get_or_create(&rid("r1")).await;

    registry.remove_if_empty(&rid("r1")).await.unwrap();

    wait_for_room_count(&registry, 0).await;
}

#[tokio::test]
async fn test_remove_if_empty_unknown_room_is_not_found() {
    let (registry, _publisher) = setup();
    let result = registry.remove_if_empty(&rid("r1")).await;
    assert!(matches!(result, Err(RoomError::NotFound(_))));
}

#[tokio::test]
async fn test_stale_handle_reports_unavailable() {
    let (registry, _publisher) = setup();
    let handle = registry.get_or_create(&rid("r1")).await;
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    registry.dispatch(leave("r1", "p1")).await.unwrap();
    wait_for_room_count(&registry, 0).await;

    let result = handle.snapshot().await;

    assert!(matches!(result, Err(RoomError::Unavailable(_))));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_shutdown_stops_every_room() {
    let (registry, _publisher) = setup();
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    registry.dispatch(join("r2", "p2", "Bob")).await.unwrap();

    registry.shutdown().await;

    assert_eq!(registry.room_count().await, 0);
    assert!(matches!(
        registry.snapshot(&rid("r1")).await,
        Err(RoomError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_idle_room_is_retired_after_ttl() {
    let (registry, publisher) = setup_with(RoomConfig {
        idle_ttl: Duration::from_secs(60),
        ..RoomConfig::default()
    });
    let mut rx = publisher.subscribe(&rid("r1"));
    registry.dispatch(join("r1", "p1", "Alice")).await.unwrap();
    next(&mut rx).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    registry.dispatch(play("r1", "p1", "5")).await.unwrap();
    next(&mut rx).await;

    // Activity at t=30 pushed the deadline to t=90.
    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(registry.room_count().await, 1);

    tokio::time::sleep(Duration::from_secs(20)).await;
    wait_for_room_count(&registry, 0).await;
}
