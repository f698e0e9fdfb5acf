//! End-to-end pipeline tests over in-memory backends and channel
//! transports: queue → team build → ready → veto → host → validation →
//! settlement, plus the cancellation cascades.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strikeforge::prelude::*;
use strikeforge::store::keys;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct TestEnv {
    coordinator: Arc<Coordinator>,
    router: Arc<SessionRouter>,
    matches: Arc<InMemoryMatchStore>,
    store: Arc<InMemoryStore>,
    logs: Arc<InMemoryLogSource>,
}

async fn env_with(config: CoordinatorConfig) -> TestEnv {
    let store = Arc::new(InMemoryStore::new());
    let matches = Arc::new(InMemoryMatchStore::new());
    let logs = Arc::new(InMemoryLogSource::new());
    let registry = Arc::new(ConnectionRegistry::new());

    let coordinator = Coordinator::new(
        config,
        store.clone(),
        matches.clone(),
        logs.clone(),
        Arc::new(EloRankFunction::default()),
        registry.clone(),
    );
    coordinator.clone().start().await;

    let router = Arc::new(SessionRouter::new(
        coordinator.clone(),
        registry,
        matches.clone(),
        Arc::new(AllowAllAuthenticator),
    ));

    TestEnv {
        coordinator,
        router,
        matches,
        store,
        logs,
    }
}

/// Ten players whose primaries cover every role twice.
async fn seed_roster(matches: &InMemoryMatchStore) {
    use WeaponClass::*;
    let spread = [
        (1, Sniper, T1),
        (2, Sniper, T2),
        (3, T1, T2),
        (4, T1, T3),
        (5, T2, T1),
        (6, T2, T4),
        (7, T3, T1),
        (8, T3, T2),
        (9, T4, T1),
        (10, T4, T3),
    ];
    for (id, primary, secondary) in spread {
        let mut player = Player::new(PlayerId(id), format!("player-{id}"), 1500);
        player.classes = ClassProfile::new(primary, secondary);
        matches.upsert_player(&player).await.unwrap();
    }
}

type Inbox = mpsc::UnboundedReceiver<ServerMessage>;

async fn connect(env: &TestEnv, id: u64) -> Inbox {
    let (transport, mut rx) = ChannelTransport::pair();
    env.router
        .authenticate(id, "token", None, Arc::new(transport))
        .await
        .unwrap();
    // Drain the AUTH_SUCCESS greeting.
    match rx.recv().await {
        Some(ServerMessage::AuthSuccess { .. }) => {}
        other => panic!("expected AUTH_SUCCESS, got {other:?}"),
    }
    rx
}

/// Receive until a message satisfies the predicate, skipping the rest.
async fn recv_until<F, T>(rx: &mut Inbox, mut pred: F) -> T
where
    F: FnMut(ServerMessage) -> Option<T>,
{
    timeout(Duration::from_secs(20), async {
        loop {
            match rx.recv().await {
                Some(message) => {
                    if let Some(value) = pred(message) {
                        return value;
                    }
                }
                None => panic!("transport closed while waiting"),
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

async fn wait_for_no_active_matches(env: &TestEnv) {
    timeout(Duration::from_secs(10), async {
        while env.coordinator.active_matches().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("match actor never finished");
}

/// Join all ten and collect (match_id, per-player team) from MATCH_FOUND.
async fn join_and_find_match(
    env: &TestEnv,
    inboxes: &mut HashMap<u64, Inbox>,
) -> (String, HashMap<u64, TeamSide>) {
    for id in 1..=10u64 {
        env.router
            .handle(PlayerId(id), ClientMessage::QueueJoin { classes: None })
            .await;
    }

    let mut match_id = String::new();
    let mut teams = HashMap::new();
    for id in 1..=10u64 {
        let rx = inboxes.get_mut(&id).unwrap();
        let (found_id, team) = recv_until(rx, |m| match m {
            ServerMessage::MatchFound { match_id, team, .. } => Some((match_id, team)),
            _ => None,
        })
        .await;
        match_id = found_id;
        teams.insert(id, team);
    }
    (match_id, teams)
}

/// Everyone accepts the ready check.
async fn accept_all(env: &TestEnv, match_id: &str) {
    for id in 1..=10u64 {
        env.router
            .handle(
                PlayerId(id),
                ClientMessage::ReadyAccept {
                    match_id: match_id.to_string(),
                },
            )
            .await;
    }
}

/// Drive the veto dance until MAP_SELECTED by having every player attempt
/// each veto; non-leaders and the off-turn team are ignored by the engine.
async fn veto_until_selected(
    env: &TestEnv,
    inboxes: &mut HashMap<u64, Inbox>,
    match_id: &str,
) -> (String, u32) {
    let mut remaining: Vec<String> = MapPool::standard()
        .maps()
        .iter()
        .map(|m| m.map_id.clone())
        .collect();

    loop {
        // Wait for a turn announcement on an observer inbox.
        let observer = inboxes.get_mut(&1).unwrap();
        enum Step {
            Turn,
            Vetoed(Vec<String>),
            Selected(String, u32),
        }
        let step = recv_until(observer, |m| match m {
            ServerMessage::TurnChange { .. } => Some(Step::Turn),
            ServerMessage::VetoUpdate { remaining, .. } => Some(Step::Vetoed(remaining)),
            ServerMessage::MapSelected {
                map_id, map_number, ..
            } => Some(Step::Selected(map_id, map_number)),
            _ => None,
        })
        .await;

        match step {
            Step::Selected(map_id, map_number) => return (map_id, map_number),
            Step::Vetoed(rest) => {
                remaining = rest;
            }
            Step::Turn => {
                let target = remaining[0].clone();
                for id in 1..=10u64 {
                    env.router
                        .handle(
                            PlayerId(id),
                            ClientMessage::MapVeto {
                                match_id: match_id.to_string(),
                                map_id: target.clone(),
                            },
                        )
                        .await;
                }
            }
        }
    }
}

/// Find which player got HOST_SELECTED and return their id with the room
/// credentials.
async fn find_host(inboxes: &mut HashMap<u64, Inbox>) -> (u64, String, u32) {
    for id in 1..=10u64 {
        let rx = inboxes.get_mut(&id).unwrap();
        // Peek this inbox briefly for a HOST_SELECTED.
        let result = timeout(Duration::from_millis(500), async {
            loop {
                match rx.recv().await {
                    Some(ServerMessage::HostSelected {
                        room_id,
                        map_number,
                        ..
                    }) => return Some((room_id, map_number)),
                    Some(ServerMessage::HostWaiting { .. }) => return None,
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await;
        if let Ok(Some((room_id, map_number))) = result {
            return (id, room_id, map_number);
        }
    }
    panic!("no player received HOST_SELECTED");
}

fn log_row(id: u64, map_number: u32, is_win: bool, team_score: u32) -> MatchLogRow {
    MatchLogRow {
        player_id: PlayerId(id),
        game_mode: 5,
        map_number,
        is_win,
        is_valid: true,
        team_score,
        kills: 12,
        deaths: 9,
        assists: 4,
        headshots: 5,
        logged_at: Utc::now(),
    }
}

#[tokio::test]
async fn full_pipeline_happy_path_settles_the_match() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }

    let (match_id, teams) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;

    // Lobby opens for everyone.
    for id in 1..=10u64 {
        let rx = inboxes.get_mut(&id).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::LobbyReady { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    let (_map_id, map_number) = veto_until_selected(&env, &mut inboxes, &match_id).await;
    let (host_id, room_id, host_map) = find_host(&mut inboxes).await;
    assert_eq!(host_map, map_number);

    env.router
        .handle(
            PlayerId(host_id),
            ClientMessage::HostRoomCreated {
                match_id: match_id.clone(),
                room_id: room_id.clone(),
                map_number,
            },
        )
        .await;

    // Everyone sees the confirmation (host included).
    {
        let rx = inboxes.get_mut(&2).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::HostConfirmed { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    // External logs accrue for all ten; alpha takes the match.
    for id in 1..=10u64 {
        let alpha = teams[&id] == TeamSide::Alpha;
        env.logs
            .push(log_row(id, map_number, alpha, if alpha { 13 } else { 9 }))
            .await;
    }

    let rx = inboxes.get_mut(&3).unwrap();
    let (winner, players) = recv_until(rx, |m| match m {
        ServerMessage::MatchEnded {
            winner, players, ..
        } => Some((winner, players)),
        _ => None,
    })
    .await;
    assert_eq!(winner, TeamSide::Alpha);
    assert_eq!(players.len(), 10);
    assert!(players.iter().all(|p| !p.abandoned));
    let alpha_changes: Vec<i32> = players
        .iter()
        .filter(|p| p.team == TeamSide::Alpha)
        .map(|p| p.mmr_change)
        .collect();
    assert!(alpha_changes.iter().all(|c| *c > 0));

    // Relational row settled, coordination keys gone.
    let record = env.matches.load_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchRecordStatus::Completed);
    assert_eq!(record.winner_team, Some(TeamSide::Alpha));
    assert_eq!(env.matches.results_for(&match_id).await.len(), 10);
    assert!(env
        .store
        .scan_keys(&format!("match:{match_id}:*"))
        .await
        .unwrap()
        .is_empty());

    wait_for_no_active_matches(&env).await;
}

#[tokio::test]
async fn ready_decline_requeues_survivors_with_original_priority() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }

    // Player 7 already declined once today.
    env.store
        .incr(&keys::decline_count(PlayerId(7)), None)
        .await
        .unwrap();

    let (match_id, _) = join_and_find_match(&env, &mut inboxes).await;

    // Nine accept, the seventh declines.
    for id in (1..=10u64).filter(|id| *id != 7) {
        env.router
            .handle(
                PlayerId(id),
                ClientMessage::ReadyAccept {
                    match_id: match_id.clone(),
                },
            )
            .await;
    }
    env.router
        .handle(
            PlayerId(7),
            ClientMessage::ReadyDecline {
                match_id: match_id.clone(),
            },
        )
        .await;

    // Second offense: five-minute cooldown, delivered before the failure
    // broadcast.
    {
        let rx = inboxes.get_mut(&7).unwrap();
        let seconds = recv_until(rx, |m| match m {
            ServerMessage::CooldownSet { seconds, .. } => Some(seconds),
            _ => None,
        })
        .await;
        assert_eq!(seconds, 300);
    }

    // Everyone learns who sank the check.
    for id in 1..=10u64 {
        let rx = inboxes.get_mut(&id).unwrap();
        let declined_by = recv_until(rx, |m| match m {
            ServerMessage::ReadyCheckFailed { declined_by, .. } => Some(declined_by),
            _ => None,
        })
        .await;
        assert_eq!(declined_by, Some(PlayerId(7)));
    }

    // Survivors got requeue hints carrying their original queued_at.
    let original_queued_at = {
        let rx = inboxes.get_mut(&1).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::Requeue { queued_at } => Some(queued_at),
            _ => None,
        })
        .await
    };

    wait_for_no_active_matches(&env).await;

    env.router
        .handle(PlayerId(1), ClientMessage::QueueJoin { classes: None })
        .await;
    let rx = inboxes.get_mut(&1).unwrap();
    let queued_at = recv_until(rx, |m| match m {
        ServerMessage::QueueJoined { queued_at, .. } => Some(queued_at),
        _ => None,
    })
    .await;
    assert_eq!(queued_at, original_queued_at);

    // The offender is cooldown-blocked.
    env.router
        .handle(PlayerId(7), ClientMessage::QueueJoin { classes: None })
        .await;
    let rx = inboxes.get_mut(&7).unwrap();
    let reason = recv_until(rx, |m| match m {
        ServerMessage::QueueFailed { reason, .. } => Some(reason),
        _ => None,
    })
    .await;
    assert_eq!(reason, "COOLDOWN_ACTIVE");
}

#[tokio::test]
async fn ready_timeout_excludes_the_silent_player() {
    let mut config = CoordinatorConfig::fast();
    config.ready_timeout = Duration::from_millis(400);
    let env = env_with(config).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, _) = join_and_find_match(&env, &mut inboxes).await;

    // Everyone but player 4 accepts; the check must expire.
    for id in (1..=10u64).filter(|id| *id != 4) {
        env.router
            .handle(
                PlayerId(id),
                ClientMessage::ReadyAccept {
                    match_id: match_id.clone(),
                },
            )
            .await;
    }

    let rx = inboxes.get_mut(&1).unwrap();
    let (declined_by, reason) = recv_until(rx, |m| match m {
        ServerMessage::ReadyCheckFailed {
            declined_by,
            reason,
            ..
        } => Some((declined_by, reason)),
        _ => None,
    })
    .await;
    assert_eq!(reason, "TIMEOUT");
    assert_eq!(declined_by, Some(PlayerId(4)));

    // Survivor gets a hint; the silent player does not.
    let rx = inboxes.get_mut(&1).unwrap();
    recv_until(rx, |m| match m {
        ServerMessage::Requeue { .. } => Some(()),
        _ => None,
    })
    .await;
    assert!(!env
        .store
        .exists(&keys::requeue_hint(PlayerId(4)))
        .await
        .unwrap());
}

#[tokio::test]
async fn host_timeout_cancels_and_requeues_the_other_nine() {
    let mut config = CoordinatorConfig::fast();
    config.host_timeout = Duration::from_millis(600);
    let env = env_with(config).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, _) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;
    let _ = veto_until_selected(&env, &mut inboxes, &match_id).await;
    let (host_id, _room, _map) = find_host(&mut inboxes).await;

    // Host never opens the room.
    let rx = inboxes.get_mut(&host_id).unwrap();
    let reason = recv_until(rx, |m| match m {
        ServerMessage::HostFailed { reason, .. } => Some(reason),
        _ => None,
    })
    .await;
    assert_eq!(reason, "TIMEOUT");

    // The other nine are sent back to queue.
    for id in (1..=10u64).filter(|id| *id != host_id) {
        let rx = inboxes.get_mut(&id).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::Requeue { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    let record = env.matches.load_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchRecordStatus::Cancelled);
    assert_eq!(record.end_reason.as_deref(), Some("TIMEOUT"));
    assert!(env
        .store
        .exists(&keys::host_cooldown(PlayerId(host_id)))
        .await
        .unwrap());
    assert!(!env.store.exists(&keys::requeue_hint(PlayerId(host_id))).await.unwrap());
}

#[tokio::test]
async fn partial_logs_settle_with_abandonments() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, teams) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;
    let (_map_id, map_number) = veto_until_selected(&env, &mut inboxes, &match_id).await;
    let (host_id, room_id, _map) = find_host(&mut inboxes).await;
    env.router
        .handle(
            PlayerId(host_id),
            ClientMessage::HostRoomCreated {
                match_id: match_id.clone(),
                room_id,
                map_number,
            },
        )
        .await;

    // Only four players per team report logs; bravo wins.
    let alpha: Vec<u64> = (1..=10u64)
        .filter(|id| teams[id] == TeamSide::Alpha)
        .collect();
    let bravo: Vec<u64> = (1..=10u64)
        .filter(|id| teams[id] == TeamSide::Bravo)
        .collect();
    for id in alpha.iter().take(4) {
        env.logs.push(log_row(*id, map_number, false, 7)).await;
    }
    for id in bravo.iter().take(4) {
        env.logs.push(log_row(*id, map_number, true, 13)).await;
    }
    let missing = [alpha[4], bravo[4]];

    let rx = inboxes.get_mut(&1).unwrap();
    let (winner, players) = recv_until(rx, |m| match m {
        ServerMessage::MatchEnded {
            winner, players, ..
        } => Some((winner, players)),
        _ => None,
    })
    .await;
    assert_eq!(winner, TeamSide::Bravo);

    let abandoned: Vec<u64> = players
        .iter()
        .filter(|p| p.abandoned)
        .map(|p| p.player_id.0)
        .collect();
    assert_eq!(abandoned.len(), 2);
    assert!(abandoned.contains(&missing[0]));
    assert!(abandoned.contains(&missing[1]));
}

#[tokio::test]
async fn lobby_abandon_penalizes_and_requeues_the_rest() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, _) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;

    // Wait for the lobby, then player 2 walks out.
    {
        let rx = inboxes.get_mut(&2).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::LobbyReady { .. } => Some(()),
            _ => None,
        })
        .await;
    }
    env.router
        .handle(
            PlayerId(2),
            ClientMessage::LobbyAbandon {
                match_id: match_id.clone(),
            },
        )
        .await;

    // First abandon offense: 30 minutes.
    {
        let rx = inboxes.get_mut(&2).unwrap();
        let seconds = recv_until(rx, |m| match m {
            ServerMessage::CooldownSet { seconds, .. } => Some(seconds),
            _ => None,
        })
        .await;
        assert_eq!(seconds, 1800);
    }

    for id in (1..=10u64).filter(|id| *id != 2) {
        let rx = inboxes.get_mut(&id).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::Requeue { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    let record = env.matches.load_match(&match_id).await.unwrap().unwrap();
    assert_eq!(record.status, MatchRecordStatus::Cancelled);
    assert_eq!(record.end_reason.as_deref(), Some("ABANDONED"));
}

#[tokio::test]
async fn general_chat_anonymizes_opponents() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, teams) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;
    {
        let rx = inboxes.get_mut(&1).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::LobbyReady { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    env.router
        .handle(
            PlayerId(1),
            ClientMessage::ChatSend {
                match_id: match_id.clone(),
                channel: ChatChannel::General,
                message: "glhf".to_string(),
            },
        )
        .await;

    let teammate = (2..=10u64).find(|id| teams[id] == teams[&1]).unwrap();
    let opponent = (2..=10u64).find(|id| teams[id] != teams[&1]).unwrap();

    let rx = inboxes.get_mut(&teammate).unwrap();
    let from = recv_until(rx, |m| match m {
        ServerMessage::ChatMessage { from, message, .. } if message == "glhf" => Some(from),
        _ => None,
    })
    .await;
    assert_eq!(from, "player-1");

    let rx = inboxes.get_mut(&opponent).unwrap();
    let from = recv_until(rx, |m| match m {
        ServerMessage::ChatMessage { from, message, .. } if message == "glhf" => Some(from),
        _ => None,
    })
    .await;
    assert!(from.starts_with("Player 0"), "opponent saw {from}");
}

#[tokio::test]
async fn disconnect_during_ready_check_cancels_the_cohort() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (_match_id, _) = join_and_find_match(&env, &mut inboxes).await;

    env.router.disconnected(PlayerId(5)).await;

    let rx = inboxes.get_mut(&1).unwrap();
    let (declined_by, reason) = recv_until(rx, |m| match m {
        ServerMessage::ReadyCheckFailed {
            declined_by,
            reason,
            ..
        } => Some((declined_by, reason)),
        _ => None,
    })
    .await;
    assert_eq!(reason, "DISCONNECTED");
    assert_eq!(declined_by, Some(PlayerId(5)));
    assert!(!env
        .store
        .exists(&keys::requeue_hint(PlayerId(5)))
        .await
        .unwrap());
}

#[tokio::test]
async fn role_swap_completes_within_a_team() {
    let env = env_with(CoordinatorConfig::fast()).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, teams) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;
    {
        let rx = inboxes.get_mut(&1).unwrap();
        recv_until(rx, |m| match m {
            ServerMessage::LobbyReady { .. } => Some(()),
            _ => None,
        })
        .await;
    }

    let teammate = (2..=10u64).find(|id| teams[id] == teams[&1]).unwrap();
    env.router
        .handle(
            PlayerId(1),
            ClientMessage::LobbyRequestSwap {
                match_id: match_id.clone(),
                to: PlayerId(teammate),
            },
        )
        .await;

    let rx = inboxes.get_mut(&teammate).unwrap();
    let request_id = recv_until(rx, |m| match m {
        ServerMessage::LobbySwapRequested { request_id, .. } => Some(request_id),
        _ => None,
    })
    .await;

    env.router
        .handle(
            PlayerId(teammate),
            ClientMessage::LobbyAcceptSwap {
                match_id: match_id.clone(),
                request_id,
            },
        )
        .await;

    let rx = inboxes.get_mut(&1).unwrap();
    let (first, second) = recv_until(rx, |m| match m {
        ServerMessage::LobbySwapCompleted { first, second, .. } => Some((first, second)),
        _ => None,
    })
    .await;
    assert_eq!(first, PlayerId(1));
    assert_eq!(second, PlayerId(teammate));
}

#[tokio::test]
async fn veto_turn_timeout_auto_vetoes_lexicographically() {
    let mut config = CoordinatorConfig::fast();
    config.veto_turn_timeout = Duration::from_millis(300);
    let env = env_with(config).await;
    seed_roster(&env.matches).await;

    let mut inboxes: HashMap<u64, Inbox> = HashMap::new();
    for id in 1..=10u64 {
        inboxes.insert(id, connect(&env, id).await);
    }
    let (match_id, _) = join_and_find_match(&env, &mut inboxes).await;
    accept_all(&env, &match_id).await;

    // Nobody vetoes; the first turn expires and the engine picks for ALPHA.
    let rx = inboxes.get_mut(&1).unwrap();
    let (map_id, reason, by_team) = recv_until(rx, |m| match m {
        ServerMessage::VetoUpdate {
            map_id,
            reason,
            by_team,
            ..
        } => Some((map_id, reason, by_team)),
        _ => None,
    })
    .await;
    assert_eq!(reason, strikeforge::session::messages::VetoReason::Timeout);
    assert_eq!(by_team, TeamSide::Alpha);
    // Lexicographically first of the standard pool.
    assert_eq!(map_id, "canal");
}
