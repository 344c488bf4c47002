//! Arena management through a `Minigame`.

use mglib_host::{EventLog, SimHost};
use mglib_player::MemoryPlayerStore;
use mglib_rollback::MemoryRollbackStore;
use mglib_round::{ArenaData, Env, JsonArenaStore, MemoryArenaStore, Minigame, MinigameConfig, RoundError, Stage};
use mglib_tick::TickClock;
use mglib_types::{Location, PlayerId, RoundEvent};

fn host() -> SimHost {
    let mut host = SimHost::new();
    host.add_world("arena").add_world("lobby");
    host
}

fn minigame() -> Minigame {
    Minigame::new(
        "spleef",
        MinigameConfig::default(),
        Box::new(MemoryArenaStore::new()),
        Box::new(MemoryRollbackStore::new()),
    )
}

#[test]
fn test_create_arena_normalises_corners() {
    let host = host();
    let mut mg = minigame();
    mg.create_arena(
        &host,
        "field",
        Location::new("arena", 0.0, 64.0, 0.0),
        Some((
            Location::new("arena", 20.0, 10.0, -5.0),
            Location::new("arena", -20.0, 100.0, 5.0),
        )),
    )
    .unwrap();

    let arena = mg.arena("field").unwrap().unwrap();
    let bounds = arena.bounds.unwrap();
    assert_eq!((bounds.min_x, bounds.max_x), (-20.0, 20.0));
    assert_eq!((bounds.min_y, bounds.max_y), (10.0, 100.0));
    assert_eq!((bounds.min_z, bounds.max_z), (-5.0, 5.0));
    assert_eq!(arena.spawns.len(), 1);
}

#[test]
fn test_create_arena_rejects_bad_geometry() {
    let host = host();
    let mut mg = minigame();

    let err = mg
        .create_arena(&host, "a", Location::new("nether", 0.0, 0.0, 0.0), None)
        .unwrap_err();
    assert!(matches!(err, RoundError::InvalidLocation(_)));

    let err = mg
        .create_arena(
            &host,
            "a",
            Location::new("arena", 0.0, 0.0, 0.0),
            Some((
                Location::new("arena", 1.0, 1.0, 1.0),
                Location::new("lobby", 2.0, 2.0, 2.0),
            )),
        )
        .unwrap_err();
    assert!(matches!(err, RoundError::InvalidLocation(_)));
    assert!(mg.arena_names().unwrap().is_empty());
}

#[test]
fn test_duplicate_arena_is_rejected() {
    let host = host();
    let mut mg = minigame();
    let spawn = Location::new("arena", 0.0, 64.0, 0.0);
    mg.create_arena(&host, "field", spawn.clone(), None).unwrap();
    assert!(matches!(
        mg.create_arena(&host, "field", spawn, None),
        Err(RoundError::ArenaExists(_))
    ));
}

#[test]
fn test_round_needs_an_arena() {
    let mut mg = minigame();
    assert!(matches!(
        mg.create_round("ghost"),
        Err(RoundError::ArenaNotFound(_))
    ));
}

#[test]
fn test_one_round_per_arena() {
    let host = host();
    let mut mg = minigame();
    mg.create_arena(&host, "field", Location::new("arena", 0.0, 64.0, 0.0), None)
        .unwrap();
    mg.create_round_with("field", 0, 30).unwrap();
    assert_eq!(mg.round("field").unwrap().playing_time(), 30);
    assert!(matches!(
        mg.create_round("field"),
        Err(RoundError::InvalidState(_))
    ));
}

#[test]
fn test_spawn_edits_reach_the_live_round() {
    let host = host();
    let mut mg = minigame();
    mg.create_arena(&host, "field", Location::new("arena", 0.0, 64.0, 0.0), None)
        .unwrap();
    mg.create_round("field").unwrap();

    mg.add_spawn("field", Location::new("arena", 8.5, 64.0, 8.5)).unwrap();
    assert_eq!(mg.round("field").unwrap().spawns().len(), 2);
    assert!(matches!(
        mg.add_spawn("field", Location::new("lobby", 0.0, 0.0, 0.0)),
        Err(RoundError::InvalidLocation(_))
    ));

    assert!(mg.delete_spawn("field", 8, 64, 8).unwrap());
    assert!(!mg.delete_spawn("field", 8, 64, 8).unwrap());
    assert_eq!(mg.round("field").unwrap().spawns().len(), 1);
    assert_eq!(mg.arena("field").unwrap().unwrap().spawns.len(), 1);
}

#[test]
fn test_last_spawn_cannot_be_deleted() {
    let host = host();
    let mut mg = minigame();
    mg.create_arena(&host, "field", Location::new("arena", 0.0, 64.0, 0.0), None)
        .unwrap();
    mg.create_round("field").unwrap();

    assert!(matches!(
        mg.delete_spawn("field", 0, 64, 0),
        Err(RoundError::InvalidState(_))
    ));
    assert_eq!(mg.arena("field").unwrap().unwrap().spawns.len(), 1);
    assert_eq!(mg.round("field").unwrap().spawns().len(), 1);
}

#[test]
fn test_round_on_spawnless_arena_is_rejected() {
    let arenas = MemoryArenaStore::new().with_arena(
        "bare",
        ArenaData {
            world: "arena".into(),
            spawns: Vec::new(),
            bounds: None,
        },
    );
    let mut mg = Minigame::new(
        "spleef",
        MinigameConfig::default(),
        Box::new(arenas),
        Box::new(MemoryRollbackStore::new()),
    );
    assert!(matches!(
        mg.create_round("bare"),
        Err(RoundError::InvalidState(_))
    ));
    assert!(mg.round("bare").is_none());
}

#[test]
fn test_create_arena_rejects_nan_corners() {
    let host = host();
    let mut mg = minigame();
    let err = mg
        .create_arena(
            &host,
            "field",
            Location::new("arena", 0.0, 64.0, 0.0),
            Some((
                Location::new("arena", f64::NAN, 0.0, 0.0),
                Location::new("arena", 10.0, 100.0, 10.0),
            )),
        )
        .unwrap_err();
    assert!(matches!(err, RoundError::InvalidLocation(_)));
}

#[test]
fn test_delete_arena_ends_its_round() {
    let mut host = host();
    let mut clock = TickClock::new();
    let mut events = EventLog::new();
    let mut players = MemoryPlayerStore::new();
    let mut mg = minigame();
    mg.set_exit_location(Some(Location::new("lobby", 0.0, 64.0, 0.0)));
    mg.create_arena(&host, "field", Location::new("arena", 0.0, 64.0, 0.0), None)
        .unwrap();
    mg.create_round("field").unwrap();
    host.connect(PlayerId(1), "alice", Location::new("lobby", 0.0, 64.0, 0.0));

    let mut env = Env::new(&mut host, &mut clock, &mut events, &mut players);
    mg.add_player(&mut env, "field", PlayerId(1), None).unwrap();
    mg.start_round(&mut env, "field").unwrap();
    assert_eq!(mg.round("field").unwrap().stage(), Stage::Preparing);

    mg.delete_arena(&mut env, "field").unwrap();
    assert!(mg.round("field").is_none());
    assert!(mg.arena("field").unwrap().is_none());
    assert!(!mg.is_participant(PlayerId(1)));
    assert!(matches!(
        mg.delete_arena(&mut env, "field"),
        Err(RoundError::ArenaNotFound(_))
    ));
    drop(env);
    assert_eq!(events.count(|e| matches!(e, RoundEvent::RoundEnded { .. })), 1);
}

#[test]
fn test_arenas_persist_in_json_store() {
    let dir = std::env::temp_dir().join(format!("mglib-round-arenas-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let path = dir.join("arenas.json");
    let host = host();
    {
        let mut mg = Minigame::new(
            "spleef",
            MinigameConfig::default(),
            Box::new(JsonArenaStore::open(&path).unwrap()),
            Box::new(MemoryRollbackStore::new()),
        );
        mg.create_arena(&host, "field", Location::new("arena", 0.0, 64.0, 0.0), None)
            .unwrap();
    }
    let mut mg = Minigame::new(
        "spleef",
        MinigameConfig::default(),
        Box::new(JsonArenaStore::open(&path).unwrap()),
        Box::new(MemoryRollbackStore::new()),
    );
    assert!(mg.has_arena_in("arena").unwrap());
    assert!(!mg.has_arena_in("lobby").unwrap());
    mg.create_round("field").unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}
