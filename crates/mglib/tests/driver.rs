//! The async tick driver, run against paused Tokio time.

use std::time::Duration;

use mglib::Library;
use mglib::driver::{self, share};
use mglib_host::{NullSink, SimHost};
use mglib_player::MemoryPlayerStore;
use mglib_rollback::MemoryRollbackStore;
use mglib_round::{ArenaData, MemoryArenaStore, MinigameConfig, Stage};
use mglib_tick::{TICKS_PER_SECOND, TickConfig};
use mglib_types::{Location, PlayerId};
use tokio::sync::oneshot;

fn library(playing_time: u32) -> Library<SimHost> {
    let mut host = SimHost::new();
    host.add_world("arena");
    host.connect(PlayerId(1), "alice", Location::new("arena", 0.0, 65.0, 0.0));
    let mut lib = Library::new(host, NullSink, MemoryPlayerStore::new());
    let arenas = MemoryArenaStore::new().with_arena(
        "field",
        ArenaData {
            world: "arena".into(),
            spawns: vec![Location::new("arena", 0.0, 65.0, 0.0)],
            bounds: None,
        },
    );
    let mg = lib
        .register(
            "spleef",
            MinigameConfig {
                preparation_time: 0,
                playing_time,
                ..Default::default()
            },
            Box::new(arenas),
            Box::new(MemoryRollbackStore::new()),
        )
        .unwrap();
    mg.create_round("field").unwrap();
    lib
}

#[tokio::test(start_paused = true)]
async fn test_driver_runs_round_to_completion() {
    let lib = share(library(10));
    lib.lock().await.start_round("spleef", "field").unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = driver::spawn(lib.clone(), TickConfig::default(), async move {
        let _ = stopped.await;
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    {
        let lib = lib.lock().await;
        let round = lib.minigame("spleef").unwrap().round("field").unwrap();
        assert_eq!(round.stage(), Stage::Playing);
        assert!(round.elapsed() >= 4);
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    {
        let lib = lib.lock().await;
        let round = lib.minigame("spleef").unwrap().round("field").unwrap();
        assert_eq!(round.stage(), Stage::Waiting);
    }

    stop.send(()).unwrap();
    let ticks = handle.await.unwrap();
    assert!(ticks >= u64::from(TICKS_PER_SECOND) * 10);
}

#[tokio::test(start_paused = true)]
async fn test_driver_stops_on_shutdown() {
    let lib = share(library(60));
    let ticks = driver::run_until(
        lib.clone(),
        TickConfig::default(),
        tokio::time::sleep(Duration::from_secs(1)),
    )
    .await;
    assert!(ticks >= u64::from(TICKS_PER_SECOND) - 1);
    assert!(ticks <= u64::from(TICKS_PER_SECOND));
    assert_eq!(lib.lock().await.clock().now(), ticks);
}

#[tokio::test(start_paused = true)]
async fn test_events_interleave_with_ticks() {
    let lib = share(library(60));
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = driver::spawn(lib.clone(), TickConfig::default(), async move {
        let _ = stopped.await;
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    lib.lock()
        .await
        .join("spleef", "field", PlayerId(1), None)
        .unwrap();
    lib.lock().await.start_round("spleef", "field").unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    {
        let lib = lib.lock().await;
        assert!(lib.is_participant(PlayerId(1)));
        let round = lib.minigame("spleef").unwrap().round("field").unwrap();
        assert_eq!(round.elapsed(), 3);
    }

    stop.send(()).unwrap();
    handle.await.unwrap();
}
