use std::sync::Arc;

use brain_defense_core::{
    Campaign, CatalogError, CoopDescriptor, PlacementError, Point, Role, Side, TowerId, TowerKind,
    TICK_DURATION,
};
use brain_defense_session::{
    Conclusion, LocalProfile, Notice, Progression, Session, SessionError, SessionOptions,
};
use brain_defense_storage::{
    ActiveSession, KeyValueStore, MemoryStore, SnapshotVault, SESSION_KEY, SNAPSHOT_KEY,
};
use brain_defense_system_sync::{Message, VoteState};
use brain_defense_world::query;

const LOADOUT: &[TowerKind] = &[TowerKind::BonecaAmbalabu, TowerKind::Wifirmino];

fn solo(stage_index: usize) -> ActiveSession {
    ActiveSession {
        stage_index,
        multiplayer: None,
    }
}

fn coop(role: Role) -> ActiveSession {
    ActiveSession {
        stage_index: 0,
        multiplayer: Some(CoopDescriptor {
            match_topic: "bd_match_AMY_ZED_1".into(),
            role,
            seed: 42,
            peer: Some("AMY".into()),
        }),
    }
}

fn start(
    store: &Arc<MemoryStore>,
    record: ActiveSession,
) -> Session<Arc<MemoryStore>> {
    Session::start(
        &Campaign::standard(),
        record,
        LOADOUT,
        SnapshotVault::new(Arc::clone(store)),
        SessionOptions::default(),
    )
    .expect("session starts")
}

fn encode(message: &Message) -> String {
    message.encode().expect("encodes")
}

#[test]
fn empty_loadout_is_refused() {
    let error = Session::start(
        &Campaign::standard(),
        solo(0),
        &[],
        SnapshotVault::new(MemoryStore::default()),
        SessionOptions::default(),
    )
    .expect_err("no towers equipped");
    assert!(matches!(error, SessionError::EmptyLoadout));
}

#[test]
fn unknown_stage_is_refused() {
    let error = Session::start(
        &Campaign::standard(),
        solo(99),
        LOADOUT,
        SnapshotVault::new(MemoryStore::default()),
        SessionOptions::default(),
    )
    .expect_err("stage out of range");
    assert!(matches!(
        error,
        SessionError::Catalog(CatalogError::UnknownStage(99))
    ));
}

#[test]
fn start_records_the_active_session() {
    let store = Arc::new(MemoryStore::default());
    let session = start(&store, solo(1));

    assert_eq!(query::coins(session.world()), 150);
    assert_eq!(
        SnapshotVault::new(Arc::clone(&store)).active_session(),
        Some(solo(1))
    );
    assert_eq!(session.selected(), TowerKind::BonecaAmbalabu);
}

#[test]
fn unaffordable_placement_raises_a_notice_and_changes_nothing() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, solo(0));

    for y in [240.0, 300.0, 360.0] {
        assert!(session.place_tower(Point::new(100.0, y)).is_ok());
    }
    assert_eq!(query::coins(session.world()), 10);
    let _ = session.drain_notices();

    let refused = session.place_tower(Point::new(100.0, 420.0));
    assert_eq!(
        refused,
        Err(PlacementError::InsufficientFunds {
            required: 30,
            available: 10,
        })
    );
    assert_eq!(query::towers(session.world()).len(), 3);
    assert_eq!(query::coins(session.world()), 10);
    assert_eq!(
        session.drain_notices(),
        vec![Notice::PlacementRejected(PlacementError::InsufficientFunds {
            required: 30,
            available: 10,
        })]
    );
}

#[test]
fn selection_is_limited_to_the_loadout() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, solo(0));

    assert!(!session.select(TowerKind::Chocolatini));
    assert!(session.select(TowerKind::Wifirmino));
    let tower = session
        .place_tower(Point::new(100.0, 300.0))
        .expect("placed");
    assert_eq!(tower, TowerId::new(Role::Host, 0));
    assert_eq!(query::towers(session.world())[0].kind, TowerKind::Wifirmino);
}

#[test]
fn snapshot_is_written_every_sixty_ticks() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, solo(0));
    assert!(session.start_next_wave());

    for _ in 0..59 {
        let _ = session.frame(TICK_DURATION);
    }
    assert_eq!(store.get(SNAPSHOT_KEY).expect("readable"), None);

    let _ = session.frame(TICK_DURATION);
    let saved = SnapshotVault::new(Arc::clone(&store))
        .load_snapshot()
        .expect("autosaved");
    assert_eq!(saved.tick, 60);
    assert!(saved.wave_active);
}

#[test]
fn resume_needs_the_same_session_record() {
    let store = Arc::new(MemoryStore::default());
    let vault = SnapshotVault::new(Arc::clone(&store));
    let mut snapshot = query::snapshot(start(&store, solo(0)).world());
    snapshot.coins = 777;
    vault.save_snapshot(&snapshot).expect("saved");

    let other = start(&store, solo(1));
    assert_eq!(query::coins(other.world()), 150);

    vault.begin_session(&solo(0)).expect("recorded");
    vault.save_snapshot(&snapshot).expect("saved");
    let resumed = start(&store, solo(0));
    assert_eq!(query::coins(resumed.world()), 777);
}

#[test]
fn interrupted_fresh_start_never_resumes_an_older_match() {
    let store = Arc::new(MemoryStore::default());
    let mut first = start(&store, solo(0));
    assert!(first.start_next_wave());
    for _ in 0..60 {
        let _ = first.frame(TICK_DURATION);
    }
    assert!(store.get(SNAPSHOT_KEY).expect("readable").is_some());
    drop(first);

    let fresh_coins = query::coins(start(&store, solo(3)).world());
    assert_eq!(store.get(SNAPSHOT_KEY).expect("readable"), None);

    let restarted = start(&store, solo(3));
    assert_eq!(query::snapshot(restarted.world()).tick, 0);
    assert_eq!(query::coins(restarted.world()), fresh_coins);
}

#[test]
fn clearing_the_final_wave_wins_and_completes_the_level() {
    let store = Arc::new(MemoryStore::default());
    let vault = SnapshotVault::new(Arc::clone(&store));
    let mut snapshot = query::snapshot(start(&store, solo(2)).world());
    snapshot.wave_index = 2;
    snapshot.wave_active = true;
    snapshot.enemies_spawned_in_wave = 5;
    vault.save_snapshot(&snapshot).expect("saved");

    let mut session = start(&store, solo(2));
    let _ = session.frame(TICK_DURATION);

    let conclusion = session.conclusion().expect("match over");
    assert_eq!(
        conclusion,
        Conclusion::Won {
            bonus: 20,
            completed_level: Some(1),
        }
    );
    assert!(session
        .drain_notices()
        .contains(&Notice::Concluded(conclusion)));
    assert_eq!(store.get(SNAPSHOT_KEY).expect("readable"), None);
    assert_eq!(store.get(SESSION_KEY).expect("readable"), None);

    let mut profile = LocalProfile::new("ZED").with_balance(5);
    conclusion.settle(&mut profile);
    assert_eq!(profile.balance(), 25);
    assert_eq!(profile.completed_levels(), &[1]);

    assert!(session.frame(TICK_DURATION).is_empty());
    assert!(session.place_tower(Point::new(100.0, 300.0)).is_err());
    assert!(!session.spend(1));
}

#[test]
fn losses_and_exits_settle_nothing() {
    let mut profile = LocalProfile::new("ZED").with_balance(5);
    Conclusion::Lost.settle(&mut profile);
    Conclusion::Abandoned.settle(&mut profile);
    assert_eq!(profile.balance(), 5);
    assert!(profile.completed_levels().is_empty());
}

#[test]
fn cooperative_start_requests_a_catch_up() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Client));

    assert_eq!(session.role(), Role::Client);
    assert_eq!(session.match_topic(), Some("bd_match_AMY_ZED_1"));
    let outbound = session.drain_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].topic, "bd_match_AMY_ZED_1");
    assert_eq!(
        outbound[0].message(),
        Some(&Message::SyncRequest { role: Role::Client })
    );
}

#[test]
fn cooperative_placement_is_limited_to_the_own_side() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Client));
    let _ = session.drain_outbound();

    assert_eq!(
        session.place_tower(Point::new(100.0, 300.0)),
        Err(PlacementError::WrongSide {
            assigned: Side::Right,
        })
    );
    assert!(session.drain_outbound().is_empty());

    let tower = session
        .place_tower(Point::new(700.0, 300.0))
        .expect("right side is free");
    assert_eq!(tower.owner, Role::Client);
    let outbound = session.drain_outbound();
    assert_eq!(outbound.len(), 1);
    assert!(matches!(
        outbound[0].message(),
        Some(Message::TowerPlaced {
            role: Role::Client,
            config_id: TowerKind::BonecaAmbalabu,
            ..
        })
    ));
}

#[test]
fn replayed_and_malformed_deliveries_are_ignored() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Client));
    let placement = encode(&Message::TowerPlaced {
        role: Role::Host,
        nx: 0.125,
        ny: 0.5,
        id: TowerId::new(Role::Host, 0),
        config_id: TowerKind::Wifirmino,
    });

    session.receive("d1", &placement);
    session.receive("d1", &placement);
    session.receive("d2", &placement);
    session.receive("d3", "{\"type\":\"NOT_A_MESSAGE\"}");
    session.receive("d4", "not json at all");

    let towers = query::towers(session.world());
    assert_eq!(towers.len(), 1);
    assert_eq!(towers[0].position, Point::new(100.0, 300.0));
    assert_eq!(query::coins(session.world()), 100);
}

#[test]
fn catch_up_request_is_answered_with_the_full_state() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Host));
    let _ = session.drain_outbound();

    session.receive("d1", &encode(&Message::SyncRequest { role: Role::Client }));
    let outbound = session.drain_outbound();
    assert_eq!(outbound.len(), 1);
    assert!(matches!(
        outbound[0].message(),
        Some(Message::SyncData {
            role: Role::Host,
            ..
        })
    ));
}

#[test]
fn host_keeps_advancing_after_a_peer_overwrite() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Host));
    let _ = session.drain_outbound();

    let mut state = query::snapshot(session.world());
    state.wave_index = 1;
    state.wave_active = false;
    session.receive(
        "d1",
        &encode(&Message::SyncData {
            role: Role::Client,
            state: Box::new(state),
        }),
    );
    assert_eq!(query::wave_progress(session.world()).index, 1);

    for _ in 0..110 {
        let _ = session.frame(TICK_DURATION);
    }
    assert!(!query::wave_progress(session.world()).active);

    for _ in 0..20 {
        let _ = session.frame(TICK_DURATION);
    }
    let wave = query::wave_progress(session.world());
    assert_eq!(wave.index, 1);
    assert!(wave.active);
}

#[test]
fn agreeing_to_surrender_ends_the_match() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Client));
    let _ = session.drain_outbound();

    session.receive(
        "d1",
        &encode(&Message::VoteSurrenderRequest { role: Role::Host }),
    );
    assert_eq!(session.drain_notices(), vec![Notice::SurrenderRequested]);
    assert_eq!(
        session.vote_state(),
        VoteState::Requested {
            initiator: Role::Host,
        }
    );

    session.answer_surrender(true);
    assert_eq!(session.conclusion(), Some(Conclusion::Abandoned));
    assert_eq!(
        session.drain_outbound()[0].message(),
        Some(&Message::VoteSurrenderAccept { role: Role::Client })
    );
    assert_eq!(store.get(SESSION_KEY).expect("readable"), None);
}

#[test]
fn denied_surrender_keeps_playing() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, coop(Role::Host));
    let _ = session.drain_outbound();

    assert!(session.request_surrender());
    assert!(!session.request_surrender());
    let _ = session.drain_outbound();

    session.receive(
        "d1",
        &encode(&Message::VoteSurrenderDeny { role: Role::Client }),
    );
    assert_eq!(session.drain_notices(), vec![Notice::SurrenderDenied]);
    assert_eq!(session.vote_state(), VoteState::None);
    assert_eq!(session.conclusion(), None);
}

#[test]
fn single_player_cannot_vote() {
    let store = Arc::new(MemoryStore::default());
    let mut session = start(&store, solo(0));
    assert!(!session.request_surrender());
    assert_eq!(session.vote_state(), VoteState::None);

    session.abandon();
    assert_eq!(session.conclusion(), Some(Conclusion::Abandoned));
}
