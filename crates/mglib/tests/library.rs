//! Integration tests for the library context: registration, routing
//! of joins and leaves across minigames, the game tick and host event
//! handling.

use mglib::{Decision, Library, MgError};
use mglib_host::{ChannelSink, Host, NullSink, SimHost};
use mglib_player::{JsonPlayerStore, MemoryPlayerStore, Participant};
use mglib_rollback::{Change, ChangeRecord, MemoryRollbackStore, RollbackStore};
use mglib_round::{ArenaData, BlockAction, MemoryArenaStore, MinigameConfig, RoundError, Stage};
use mglib_types::{
    BlockPos, BlockState, Bounds, GameMode, Inventory, ItemStack, Location, PlayerId, RoundEvent,
};
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Harness
// =========================================================================

fn lobby() -> Location {
    Location::new("lobby", 0.5, 64.0, 0.5)
}

fn field() -> ArenaData {
    ArenaData {
        world: "arena".into(),
        spawns: vec![Location::new("arena", 0.0, 65.0, 0.0)],
        bounds: Some(Bounds::from_corners((-10.0, 0.0, -10.0), (10.0, 128.0, 10.0))),
    }
}

fn config(playing_time: u32, min_players: usize) -> MinigameConfig {
    MinigameConfig {
        preparation_time: 0,
        playing_time,
        min_players,
        default_exit: Some(lobby()),
        ..Default::default()
    }
}

fn library() -> (Library<SimHost>, UnboundedReceiver<RoundEvent>) {
    let mut host = SimHost::new();
    host.add_world("lobby").add_world("arena");
    let (sink, rx) = ChannelSink::new();
    (Library::new(host, sink, MemoryPlayerStore::new()), rx)
}

fn register(lib: &mut Library<SimHost>, owner: &str, config: MinigameConfig) {
    let arenas = MemoryArenaStore::new().with_arena("field", field());
    let mg = lib
        .register(owner, config, Box::new(arenas), Box::new(MemoryRollbackStore::new()))
        .unwrap();
    mg.create_round("field").unwrap();
}

fn connect(lib: &mut Library<SimHost>, id: u64) -> PlayerId {
    let id = PlayerId(id);
    lib.host_mut().connect(id, format!("player{}", id.0), lobby());
    id
}

fn drain(rx: &mut UnboundedReceiver<RoundEvent>) -> Vec<RoundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn stage(lib: &Library<SimHost>, owner: &str) -> Stage {
    lib.minigame(owner).unwrap().round("field").unwrap().stage()
}

// =========================================================================
// Registration
// =========================================================================

#[test]
fn test_register_and_unregister() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    assert!(lib.minigame("spleef").is_some());
    assert_eq!(lib.minigames().count(), 1);

    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();
    assert!(lib.is_participant(p));

    let mg = lib.unregister("spleef").unwrap();
    assert_eq!(mg.owner(), "spleef");
    assert!(lib.minigame("spleef").is_none());
    assert!(!lib.is_participant(p));
    assert_eq!(lib.host().player(p).unwrap().location, lobby());
}

#[test]
fn test_duplicate_owner_is_rejected() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let err = lib
        .register(
            "spleef",
            config(60, 0),
            Box::new(MemoryArenaStore::new()),
            Box::new(MemoryRollbackStore::new()),
        )
        .unwrap_err();
    assert!(matches!(err, MgError::MinigameExists(owner) if owner == "spleef"));
}

#[test]
fn test_unknown_minigame() {
    let (mut lib, _rx) = library();
    let p = connect(&mut lib, 1);
    assert!(matches!(
        lib.join("nope", "field", p, None),
        Err(MgError::MinigameNotFound(_))
    ));
    assert!(matches!(lib.unregister("nope"), Err(MgError::MinigameNotFound(_))));
}

#[test]
fn test_registration_replays_unfinished_logs() {
    let (mut lib, mut rx) = library();
    let pos = BlockPos::new(2, 64, 2);
    let mut store = MemoryRollbackStore::new();
    store
        .append(
            "field",
            &ChangeRecord {
                seq: 0,
                world: "arena".into(),
                pos,
                change: Change::Block {
                    previous: BlockState::new("snow"),
                },
            },
        )
        .unwrap();

    lib.register(
        "spleef",
        config(60, 0),
        Box::new(MemoryArenaStore::new().with_arena("field", field())),
        Box::new(store),
    )
    .unwrap();

    assert_eq!(lib.host().block("arena", pos).unwrap(), BlockState::new("snow"));
    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [RoundEvent::RoundRolledBack { records: 1, .. }]
    ));
}

// =========================================================================
// Joining across minigames
// =========================================================================

#[test]
fn test_player_is_in_at_most_one_round() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    register(&mut lib, "tntrun", config(60, 0));
    let p = connect(&mut lib, 1);

    lib.join("spleef", "field", p, None).unwrap();
    let err = lib.join("tntrun", "field", p, None).unwrap_err();
    assert!(matches!(
        err,
        MgError::Round(RoundError::AlreadyInRound { player, .. }) if player == p
    ));
    assert_eq!(lib.minigame_of(p).unwrap().owner(), "spleef");
}

#[test]
fn test_leave_returns_participant() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();

    let participant = lib.leave(p, None).unwrap();
    assert_eq!(participant.id(), p);
    assert!(!participant.is_in_round());
    assert!(matches!(
        lib.leave(p, None),
        Err(MgError::Round(RoundError::NotPresent(_)))
    ));
}

#[test]
fn test_start_and_end_round() {
    let (mut lib, mut rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    lib.start_round("spleef", "field").unwrap();
    assert_eq!(stage(&lib, "spleef"), Stage::Playing);
    assert!(lib.end_round("spleef", "field").unwrap());
    assert!(!lib.end_round("spleef", "field").unwrap());
    let ended = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RoundEvent::RoundEnded { timed_out: false, .. }))
        .count();
    assert_eq!(ended, 1);
}

// =========================================================================
// Game tick
// =========================================================================

#[test]
fn test_ten_second_round_over_game_ticks() {
    let (mut lib, mut rx) = library();
    register(&mut lib, "spleef", config(10, 1));
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();
    assert_eq!(stage(&lib, "spleef"), Stage::Playing);

    // Timer fires on ticks 1, 21, 41, ... 181: ten invocations.
    let mut ticked = 0;
    for _ in 0..200 {
        ticked += lib.advance_tick();
    }
    assert_eq!(ticked, 10);
    let round = lib.minigame("spleef").unwrap().round("field").unwrap();
    assert_eq!(round.elapsed(), 10);
    assert_eq!(round.stage(), Stage::Playing);

    assert_eq!(lib.advance_tick(), 1);
    assert_eq!(stage(&lib, "spleef"), Stage::Waiting);
    assert!(!lib.is_participant(p));
    assert!(lib.clock().is_empty());
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, RoundEvent::RoundEnded { timed_out: true, .. }))
    );

    for _ in 0..40 {
        assert_eq!(lib.advance_tick(), 0);
    }
}

#[test]
fn test_rounds_of_different_minigames_tick_independently() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    register(&mut lib, "tntrun", config(60, 0));
    lib.start_round("spleef", "field").unwrap();
    for _ in 0..20 {
        lib.advance_tick();
    }
    lib.start_round("tntrun", "field").unwrap();
    for _ in 0..21 {
        lib.advance_tick();
    }
    let elapsed = |owner: &str| lib.minigame(owner).unwrap().round("field").unwrap().elapsed();
    assert_eq!(elapsed("spleef"), 3);
    assert_eq!(elapsed("tntrun"), 2);
}

// =========================================================================
// Disconnects
// =========================================================================

#[test]
fn test_quit_mid_round_restores_on_next_join() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let p = connect(&mut lib, 1);
    let mut loot = Inventory::with_size(36);
    loot.contents[0] = Some(ItemStack::new("diamond", 3));
    {
        let player = lib.host_mut().player_mut(p).unwrap();
        player.inventory = loot.clone();
        player.game_mode = GameMode::Creative;
    }
    lib.join("spleef", "field", p, None).unwrap();

    lib.host_mut().disconnect(p);
    lib.on_quit(p).unwrap();
    assert!(!lib.is_participant(p));
    assert_eq!(lib.players().pending_restore(p).unwrap(), Some(lobby()));

    // Reconnect somewhere else entirely.
    lib.host_mut()
        .connect(p, "player1", Location::new("arena", 3.0, 65.0, 3.0));
    assert!(lib.on_join(p).unwrap());

    let player = lib.host().player(p).unwrap();
    assert_eq!(player.location, lobby());
    assert_eq!(player.inventory, loot);
    assert_eq!(player.game_mode, GameMode::Creative);
    assert_eq!(lib.players().pending_restore(p).unwrap(), None);
    assert_eq!(lib.players().load_snapshot(p).unwrap(), None);

    assert!(!lib.on_join(p).unwrap());
}

/// A library whose player records live in `dir`, with one player
/// online in the arena the way a crash would have left them: cleared
/// inventory and the round's game mode.
fn library_after_crash(dir: &std::path::Path, player: PlayerId) -> Library<SimHost> {
    let mut host = SimHost::new();
    host.add_world("lobby").add_world("arena");
    host.connect(player, "player1", Location::new("arena", 0.0, 65.0, 0.0));
    host.set_game_mode(player, GameMode::Adventure).unwrap();
    let mut lib = Library::new(host, NullSink, JsonPlayerStore::open(dir).unwrap());
    register(&mut lib, "spleef", config(60, 0));
    lib
}

fn crash_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("mglib-library-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn join_with_loot_then_crash(dir: &std::path::Path, player: PlayerId) -> Inventory {
    let mut loot = Inventory::with_size(36);
    loot.contents[0] = Some(ItemStack::new("diamond", 3));
    let mut host = SimHost::new();
    host.add_world("lobby").add_world("arena");
    host.connect(player, "player1", lobby());
    host.set_inventory(player, loot.clone()).unwrap();
    host.set_game_mode(player, GameMode::Creative).unwrap();

    let mut lib = Library::new(host, NullSink, JsonPlayerStore::open(dir).unwrap());
    register(&mut lib, "spleef", config(60, 0));
    lib.join("spleef", "field", player, None).unwrap();
    assert!(lib.host().player(player).unwrap().inventory.is_empty());
    drop(lib);
    loot
}

#[test]
fn test_snapshot_from_crashed_round_is_restored_on_connect() {
    let dir = crash_dir("connect");
    let p = PlayerId(1);
    let loot = join_with_loot_then_crash(&dir, p);

    let mut lib = library_after_crash(&dir, p);
    assert!(lib.on_join(p).unwrap());
    let player = lib.host().player(p).unwrap();
    assert_eq!(player.inventory, loot);
    assert_eq!(player.game_mode, GameMode::Creative);
    assert_eq!(player.location, lobby());
    assert_eq!(lib.players().load_snapshot(p).unwrap(), None);

    // Playing again afterwards still hands the loot back.
    lib.join("spleef", "field", p, None).unwrap();
    lib.leave(p, None).unwrap();
    assert_eq!(lib.host().player(p).unwrap().inventory, loot);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_snapshot_from_crashed_round_is_restored_on_rejoin() {
    let dir = crash_dir("rejoin");
    let p = PlayerId(1);
    let loot = join_with_loot_then_crash(&dir, p);

    let mut lib = library_after_crash(&dir, p);
    lib.join("spleef", "field", p, None).unwrap();
    assert_eq!(
        lib.players().load_snapshot(p).unwrap().unwrap().inventory,
        loot
    );
    lib.leave(p, None).unwrap();
    let player = lib.host().player(p).unwrap();
    assert_eq!(player.inventory, loot);
    assert_eq!(player.game_mode, GameMode::Creative);
    assert_eq!(lib.players().load_snapshot(p).unwrap(), None);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_quit_outside_any_round_is_ignored() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let p = connect(&mut lib, 1);
    lib.on_quit(p).unwrap();
    assert_eq!(lib.players().pending_restore(p).unwrap(), None);
}

// =========================================================================
// Listener decisions
// =========================================================================

fn running_with_rollback() -> (Library<SimHost>, PlayerId) {
    let (mut lib, _rx) = library();
    register(
        &mut lib,
        "spleef",
        MinigameConfig {
            rollback: true,
            ..config(60, 0)
        },
    );
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();
    lib.start_round("spleef", "field").unwrap();
    (lib, p)
}

#[test]
fn test_block_break_is_logged_and_rolled_back() {
    let (mut lib, p) = running_with_rollback();
    let pos = BlockPos::new(1, 64, 1);
    lib.host_mut().set_block("arena", pos, &BlockState::new("snow")).unwrap();

    let decision = lib.on_block_break(p, "arena", pos, BlockState::new("snow"));
    assert_eq!(decision, Decision::Allow);
    lib.host_mut().set_block("arena", pos, &BlockState::air()).unwrap();
    assert_eq!(lib.minigame("spleef").unwrap().pending_changes("field").unwrap(), 1);

    lib.end_round("spleef", "field").unwrap();
    assert_eq!(lib.host().block("arena", pos).unwrap(), BlockState::new("snow"));
}

#[test]
fn test_block_changes_need_a_running_round() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 5));
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();
    assert_eq!(stage(&lib, "spleef"), Stage::Waiting);

    let pos = BlockPos::new(0, 64, 0);
    assert!(lib.on_block_break(p, "arena", pos, BlockState::air()).is_cancelled());
    assert!(lib.on_block_place(p, "arena", pos, BlockState::air()).is_cancelled());
}

#[test]
fn test_block_rules_apply_to_participants_only() {
    let (mut lib, _rx) = library();
    let mut cfg = config(60, 0);
    cfg.blocks.place = false;
    register(&mut lib, "spleef", cfg);
    let p = connect(&mut lib, 1);
    let outsider = connect(&mut lib, 2);
    lib.join("spleef", "field", p, None).unwrap();
    lib.start_round("spleef", "field").unwrap();

    let pos = BlockPos::new(0, 64, 0);
    assert!(lib.on_block_place(p, "arena", pos, BlockState::air()).is_cancelled());
    assert_eq!(lib.on_block_break(p, "arena", pos, BlockState::air()), Decision::Allow);
    assert_eq!(
        lib.on_block_place(outsider, "arena", pos, BlockState::air()),
        Decision::Allow
    );
}

#[test]
fn test_spectators_are_ghosts() {
    let (mut lib, _rx) = library();
    register(
        &mut lib,
        "spleef",
        MinigameConfig {
            allow_join_in_progress: true,
            ..config(60, 0)
        },
    );
    let player = connect(&mut lib, 1);
    let spectator = connect(&mut lib, 2);
    lib.join("spleef", "field", player, None).unwrap();
    lib.start_round("spleef", "field").unwrap();
    lib.join("spleef", "field", spectator, None).unwrap();
    assert!(lib.participant(spectator).unwrap().is_spectating());
    assert_eq!(
        lib.host().player(spectator).unwrap().game_mode,
        GameMode::Spectator
    );

    let pos = BlockPos::new(0, 64, 0);
    assert!(lib.on_block_break(spectator, "arena", pos, BlockState::air()).is_cancelled());
    assert!(lib.on_interact(spectator).is_cancelled());
    assert!(lib.on_damage(Some(spectator), Some(player)).is_cancelled());
    assert!(lib.on_damage(None, Some(spectator)).is_cancelled());
    assert!(lib.on_container_access(spectator, "arena", pos).is_cancelled());
    assert_eq!(lib.on_interact(player), Decision::Allow);
}

#[test]
fn test_damage_follows_round_settings() {
    let (mut lib, _rx) = library();
    register(
        &mut lib,
        "spleef",
        MinigameConfig {
            pvp: false,
            ..config(60, 0)
        },
    );
    let a = connect(&mut lib, 1);
    let b = connect(&mut lib, 2);
    let outsider = connect(&mut lib, 3);
    lib.join("spleef", "field", a, None).unwrap();
    lib.join("spleef", "field", b, None).unwrap();

    assert!(lib.on_damage(Some(a), Some(b)).is_cancelled());
    assert_eq!(lib.on_damage(None, Some(b)), Decision::Allow);
    assert_eq!(lib.on_damage(Some(outsider), None), Decision::Allow);

    lib.minigame_mut("spleef")
        .unwrap()
        .round_mut("field")
        .unwrap()
        .set_damage_allowed(false);
    assert!(lib.on_damage(None, Some(b)).is_cancelled());
}

#[test]
fn test_container_contents_are_restored() {
    let (mut lib, p) = running_with_rollback();
    let pos = BlockPos::new(5, 64, 5);
    lib.host_mut().place_container("arena", pos, 27);
    let mut chest = Inventory::with_size(27);
    chest.contents[3] = Some(ItemStack::new("snowball", 16));
    lib.host_mut().set_container("arena", pos, &chest).unwrap();

    assert_eq!(lib.on_container_access(p, "arena", pos), Decision::Allow);
    lib.host_mut()
        .set_container("arena", pos, &Inventory::with_size(27))
        .unwrap();

    lib.end_round("spleef", "field").unwrap();
    assert_eq!(lib.host().container("arena", pos).unwrap(), chest);
}

#[test]
fn test_environment_changes_follow_block_rules() {
    let (mut lib, _rx) = library();
    let mut cfg = MinigameConfig {
        rollback: true,
        ..config(60, 0)
    };
    cfg.blocks.flow = true;
    register(&mut lib, "spleef", cfg);
    lib.start_round("spleef", "field").unwrap();

    let inside = BlockPos::new(0, 64, 0);
    let outside = BlockPos::new(50, 64, 50);
    assert!(
        lib.on_environment_block("arena", inside, BlockAction::Burn, BlockState::new("wool"))
            .is_cancelled()
    );
    assert_eq!(
        lib.on_environment_block("arena", inside, BlockAction::Flow, BlockState::air()),
        Decision::Allow
    );
    assert_eq!(
        lib.on_environment_block("arena", outside, BlockAction::Flow, BlockState::air()),
        Decision::Allow
    );
    assert_eq!(lib.minigame("spleef").unwrap().pending_changes("field").unwrap(), 1);

    // Worlds without arenas are left alone.
    assert_eq!(
        lib.on_environment_block("lobby", inside, BlockAction::Burn, BlockState::air()),
        Decision::Allow
    );
}

#[test]
fn test_teleport_out_of_arena_leaves_round() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();

    let inside = Location::new("arena", 2.0, 65.0, 2.0);
    assert_eq!(lib.on_teleport(p, &inside), Decision::Allow);
    assert!(lib.is_participant(p));

    let elsewhere = Location::new("arena", 40.0, 65.0, 0.0);
    assert_eq!(lib.on_teleport(p, &elsewhere), Decision::Allow);
    assert!(!lib.is_participant(p));
    assert_eq!(lib.host().player(p).unwrap().location, elsewhere);
}

#[test]
fn test_teleport_to_other_world_leaves_round() {
    let (mut lib, _rx) = library();
    register(&mut lib, "spleef", config(60, 0));
    let p = connect(&mut lib, 1);
    lib.join("spleef", "field", p, None).unwrap();

    let dest = Location::new("lobby", 9.0, 64.0, 9.0);
    lib.on_teleport(p, &dest);
    assert!(!lib.is_participant(p));
    let participant: Option<&dyn Participant> = lib.participant(p);
    assert!(participant.is_none());
}
