//! Integration tests for the authority actor, driven through its handle.

use std::time::Duration;

use coinrush::prelude::*;
use coinrush::spawn_authority;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

type Events = mpsc::UnboundedReceiver<ServerEvent>;

fn pid(n: u64) -> PlayerId {
    PlayerId(n)
}

fn server_config(duration_secs: f32) -> ServerConfig {
    ServerConfig {
        session: SessionConfig {
            duration_secs,
            rng_seed: Some(7),
            ..SessionConfig::default()
        },
        ..ServerConfig::default()
    }
}

async fn join(handle: &AuthorityHandle, n: u64) -> Events {
    let (tx, rx) = mpsc::unbounded_channel();
    handle.connect(pid(n), tx).await.expect("connect");
    rx
}

/// Everything queued so far.
fn drain(rx: &mut Events) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Waits until every command sent so far has been handled.
async fn sync(handle: &AuthorityHandle) -> WorldSnapshot {
    handle.snapshot().await.expect("snapshot")
}

fn first_spawned(events: &[ServerEvent]) -> EntityId {
    events
        .iter()
        .find_map(|e| match e {
            ServerEvent::CollectibleSpawned { entity_id, .. } => Some(*entity_id),
            _ => None,
        })
        .expect("a collectible should have spawned")
}

fn score_of(snapshot: &WorldSnapshot, player_id: PlayerId) -> Option<u32> {
    snapshot
        .scores
        .iter()
        .find(|r| r.player_id == player_id)
        .map(|r| r.score)
}

#[derive(Default)]
struct Recorder {
    texts: Vec<String>,
}

impl PresentationSink for Recorder {
    fn render(&mut self, _scoreboard: &[ScoreLine]) {}

    fn render_session_text(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }
}

// =========================================================================
// Connections
// =========================================================================

#[tokio::test]
async fn test_connect_sends_welcome_then_snapshot() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;

    let events = drain(&mut rx1);
    assert_eq!(
        events[0],
        ServerEvent::Welcome {
            player_id: pid(1),
            host: true,
        }
    );
    assert!(matches!(&events[1], ServerEvent::Snapshot(s) if s.phase == SessionPhase::Idle));
    assert!(matches!(&events[2], ServerEvent::ScoresChanged { records } if records.len() == 1));

    let _rx2 = join(&handle, 2).await;
    let events = drain(&mut rx1);
    assert!(matches!(&events[0], ServerEvent::ScoresChanged { records } if records.len() == 2));
}

#[tokio::test]
async fn test_second_player_is_not_host() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;
    let mut rx2 = join(&handle, 2).await;

    assert_eq!(
        drain(&mut rx2)[0],
        ServerEvent::Welcome {
            player_id: pid(2),
            host: false,
        }
    );
}

#[tokio::test]
async fn test_disconnect_keeps_record_and_passes_host() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;
    let mut rx2 = join(&handle, 2).await;

    handle.disconnect(pid(1)).await.unwrap();
    let snapshot = sync(&handle).await;

    assert!(
        drain(&mut rx2).contains(&ServerEvent::PlayerDisconnected { player_id: pid(1) })
    );
    assert_eq!(snapshot.scores.len(), 2);
    assert_eq!(snapshot.names.len(), 1);

    // Player 2 is now the earliest connection and may start.
    handle.submit(pid(2), ClientRequest::StartSession).await.unwrap();
    assert_eq!(sync(&handle).await.phase, SessionPhase::Active);
}

#[tokio::test]
async fn test_next_player_replica_learns_it_is_host() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;
    let mut rx2 = join(&handle, 2).await;
    sync(&handle).await;

    let mut replica = ObserverReplica::new("bob", Recorder::default());
    for event in drain(&mut rx2) {
        replica.apply(&event);
    }
    assert!(!replica.is_host());

    handle.disconnect(pid(1)).await.unwrap();
    sync(&handle).await;
    let events = drain(&mut rx2);
    for event in &events {
        replica.apply(event);
    }

    assert!(events.contains(&ServerEvent::HostChanged { player_id: pid(2) }));
    assert!(replica.is_host());
}

// =========================================================================
// Request validation
// =========================================================================

#[tokio::test]
async fn test_start_session_only_from_host() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;
    let _rx2 = join(&handle, 2).await;

    handle.submit(pid(2), ClientRequest::StartSession).await.unwrap();
    assert_eq!(sync(&handle).await.phase, SessionPhase::Idle);

    handle.submit(pid(1), ClientRequest::StartSession).await.unwrap();
    assert_eq!(sync(&handle).await.phase, SessionPhase::Active);
}

#[tokio::test]
async fn test_request_from_unknown_connection_ignored() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;

    handle.submit(pid(99), ClientRequest::StartSession).await.unwrap();
    assert_eq!(sync(&handle).await.phase, SessionPhase::Idle);
}

#[tokio::test]
async fn test_concurrent_pickups_credit_once() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;
    let _rx2 = join(&handle, 2).await;
    handle.start_session().await.unwrap();
    let coin = first_spawned(&drain(&mut rx1));

    let (a, b) = tokio::join!(
        handle.submit(
            pid(1),
            ClientRequest::RequestPickup {
                entity_id: coin,
                player_id: pid(1),
            }
        ),
        handle.submit(
            pid(2),
            ClientRequest::RequestPickup {
                entity_id: coin,
                player_id: pid(2),
            }
        ),
    );
    a.unwrap();
    b.unwrap();
    let snapshot = sync(&handle).await;

    let total = score_of(&snapshot, pid(1)).unwrap() + score_of(&snapshot, pid(2)).unwrap();
    assert_eq!(total, 1);
    assert!(snapshot.collectibles.iter().all(|c| c.entity_id != coin));

    let removals = drain(&mut rx1)
        .iter()
        .filter(|e| matches!(e, ServerEvent::CollectibleRemoved { entity_id, .. } if *entity_id == coin))
        .count();
    assert_eq!(removals, 1);
}

#[tokio::test]
async fn test_pickup_for_another_player_ignored() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;
    let _rx2 = join(&handle, 2).await;
    handle.start_session().await.unwrap();
    let coin = first_spawned(&drain(&mut rx1));

    handle
        .submit(
            pid(2),
            ClientRequest::RequestPickup {
                entity_id: coin,
                player_id: pid(1),
            },
        )
        .await
        .unwrap();
    let snapshot = sync(&handle).await;

    assert_eq!(score_of(&snapshot, pid(1)), Some(0));
    assert!(snapshot.collectibles.iter().any(|c| c.entity_id == coin));
}

#[tokio::test]
async fn test_score_increase_rules() {
    let handle = spawn_authority(&server_config(60.0));
    let _rx1 = join(&handle, 1).await;
    let increase = |delta| ClientRequest::RequestScoreIncrease {
        player_id: pid(1),
        delta,
    };

    // Not active yet.
    handle.submit(pid(1), increase(3)).await.unwrap();
    assert_eq!(score_of(&sync(&handle).await, pid(1)), Some(0));

    handle.start_session().await.unwrap();
    handle.submit(pid(1), increase(0)).await.unwrap();
    handle.submit(pid(1), increase(3)).await.unwrap();
    assert_eq!(score_of(&sync(&handle).await, pid(1)), Some(3));
}

#[tokio::test]
async fn test_non_owner_name_write_rejected() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;
    let _rx2 = join(&handle, 2).await;

    handle
        .submit(
            pid(1),
            ClientRequest::DisplayNameWrite {
                player_id: pid(1),
                name: DisplayName::new("alice"),
            },
        )
        .await
        .unwrap();
    handle
        .submit(
            pid(2),
            ClientRequest::DisplayNameWrite {
                player_id: pid(1),
                name: DisplayName::new("mallory"),
            },
        )
        .await
        .unwrap();
    let snapshot = sync(&handle).await;

    let name = snapshot
        .names
        .iter()
        .find(|n| n.player_id == pid(1))
        .map(|n| n.name.clone());
    assert_eq!(name, Some(DisplayName::new("alice")));

    let renames: Vec<ServerEvent> = drain(&mut rx1)
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::DisplayNameChanged { .. }))
        .collect();
    assert_eq!(renames.len(), 1);
}

// =========================================================================
// Session lifecycle
// =========================================================================

#[tokio::test]
async fn test_invalid_session_config_stays_idle() {
    let config = ServerConfig {
        session: SessionConfig {
            spawn_interval_secs: 0.0,
            ..SessionConfig::default()
        },
        ..ServerConfig::default()
    };
    let handle = spawn_authority(&config);
    let _rx1 = join(&handle, 1).await;

    let err = handle.start_session().await.unwrap_err();
    assert!(matches!(
        err,
        CoinrushError::Session(SessionError::InvalidConfig(_))
    ));
    assert_eq!(sync(&handle).await.phase, SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_short_session_ends_with_one_winner() {
    let handle = spawn_authority(&server_config(1.0));
    let mut rx1 = join(&handle, 1).await;
    handle.start_session().await.unwrap();

    let mut winners = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx1.recv())
            .await
            .expect("session should end")
            .expect("channel open");
        if let ServerEvent::WinnerAnnounced { winner, text } = event {
            winners.push((winner, text));
            break;
        }
    }

    // Ticks stop once the session has ended.
    let after = tokio::time::timeout(Duration::from_secs(5), rx1.recv()).await;
    assert!(after.is_err(), "unexpected event after end: {after:?}");

    assert_eq!(winners, vec![(Some(pid(1)), "Unknown won!".to_string())]);
    let snapshot = sync(&handle).await;
    assert_eq!(snapshot.phase, SessionPhase::Ended);
    assert_eq!(snapshot.remaining_time, 0.0);
    assert!(snapshot.collectibles.is_empty());
}

#[tokio::test]
async fn test_operator_end_session() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;

    // Ending an idle session does nothing.
    handle.end_session().await.unwrap();
    assert_eq!(sync(&handle).await.phase, SessionPhase::Idle);

    handle.start_session().await.unwrap();
    handle.end_session().await.unwrap();
    handle.end_session().await.unwrap();

    let winners = drain(&mut rx1)
        .iter()
        .filter(|e| matches!(e, ServerEvent::WinnerAnnounced { .. }))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(sync(&handle).await.phase, SessionPhase::Ended);
}

#[tokio::test]
async fn test_late_joiner_converges() {
    let handle = spawn_authority(&server_config(60.0));
    let mut rx1 = join(&handle, 1).await;
    let mut early = ObserverReplica::new("alice", Recorder::default());

    for event in drain(&mut rx1) {
        for request in early.apply(&event) {
            handle.submit(pid(1), request).await.unwrap();
        }
    }
    handle.start_session().await.unwrap();
    sync(&handle).await;
    let spawned: Vec<ServerEvent> = drain(&mut rx1);
    let coin = first_spawned(&spawned);
    for event in &spawned {
        early.apply(event);
    }
    handle
        .submit(
            pid(1),
            ClientRequest::RequestPickup {
                entity_id: coin,
                player_id: pid(1),
            },
        )
        .await
        .unwrap();
    sync(&handle).await;

    let mut rx3 = join(&handle, 3).await;
    let mut late = ObserverReplica::new("carol", Recorder::default());
    for event in drain(&mut rx3) {
        for request in late.apply(&event) {
            handle.submit(pid(3), request).await.unwrap();
        }
    }

    handle.end_session().await.unwrap();
    sync(&handle).await;
    for event in drain(&mut rx1) {
        early.apply(&event);
    }
    for event in drain(&mut rx3) {
        late.apply(&event);
    }

    assert_eq!(early.scoreboard(), late.scoreboard());
    assert_eq!(early.session_text(), "alice won!");
    assert_eq!(late.session_text(), "alice won!");
    assert_eq!(
        late.scoreboard()
            .iter()
            .map(|l| (l.name.to_string(), l.score))
            .collect::<Vec<_>>(),
        vec![("alice".to_string(), 1), ("carol".to_string(), 0)]
    );
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let handle = spawn_authority(&server_config(60.0));
    handle.shutdown().await.unwrap();

    let err = handle.snapshot().await.unwrap_err();
    assert!(matches!(err, CoinrushError::Unavailable));
}
