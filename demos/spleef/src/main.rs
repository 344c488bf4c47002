//! Spleef on the simulated host: four players join, dig the snow floor
//! out from under each other for fifteen seconds, then the arena is
//! rolled back.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use mglib::driver;
use mglib::prelude::*;
use tokio::sync::{mpsc::UnboundedReceiver, oneshot};
use tracing::info;

const OWNER: &str = "spleef";
const ARENA: &str = "field";
const FLOOR_Y: i32 = 64;
const FLOOR_RADIUS: i32 = 4;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Spleefer {
    state: ParticipantState,
    dug: u32,
}

impl Participant for Spleefer {
    fn state(&self) -> &ParticipantState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut ParticipantState {
        &mut self.state
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn lobby() -> Location {
    Location::new("lobby", 0.5, 64.0, 0.5)
}

fn floor() -> impl Iterator<Item = BlockPos> + Clone {
    (-FLOOR_RADIUS..=FLOOR_RADIUS).flat_map(|x| {
        (-FLOOR_RADIUS..=FLOOR_RADIUS).map(move |z| BlockPos::new(x, FLOOR_Y, z))
    })
}

fn build_library() -> Result<(Library<SimHost>, UnboundedReceiver<RoundEvent>), MgError> {
    let mut host = SimHost::new();
    host.add_world("lobby").add_world("arena");
    for pos in floor() {
        host.set_block("arena", pos, &BlockState::new("snow_block"))?;
    }
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        host.connect(PlayerId(id), name, lobby());
    }

    let (sink, events) = ChannelSink::new();
    let mut library = Library::new(host, sink, MemoryPlayerStore::new());

    let y = f64::from(FLOOR_Y + 1);
    let arenas = MemoryArenaStore::new().with_arena(
        ARENA,
        ArenaData {
            world: "arena".into(),
            spawns: vec![
                Location::new("arena", -3.0, y, -3.0),
                Location::new("arena", 3.0, y, -3.0),
                Location::new("arena", 3.0, y, 3.0),
                Location::new("arena", -3.0, y, 3.0),
            ],
            bounds: Some(Bounds::from_corners((-6.0, 0.0, -6.0), (6.0, 100.0, 6.0))),
        },
    );
    let config = MinigameConfig {
        preparation_time: 3,
        playing_time: 15,
        min_players: 4,
        max_players: 4,
        default_exit: Some(lobby()),
        pvp: false,
        rollback: true,
        spawn_policy: SpawnPolicy::Sequential,
        ..Default::default()
    };
    let factory: ParticipantFactory = Arc::new(|id, name| {
        Box::new(Spleefer {
            state: ParticipantState::new(id, name),
            dug: 0,
        })
    });
    let minigame = Minigame::new(
        OWNER,
        config,
        Box::new(arenas),
        Box::new(MemoryRollbackStore::new()),
    )
    .with_factory(factory);

    library.register_minigame(minigame)?.create_round(ARENA)?;
    Ok((library, events))
}

// ---------------------------------------------------------------------------
// Play
// ---------------------------------------------------------------------------

/// Every half second, each player still standing digs the next snow
/// block of the floor. Returns blocks dug per player once the round is
/// over.
async fn play(library: SharedLibrary<SimHost>) -> Result<Vec<(String, u32)>, MgError> {
    {
        let mut lib = library.lock().await;
        for id in 1..=4 {
            lib.join(OWNER, ARENA, PlayerId(id), None)?;
        }
    }

    let mut targets = floor().cycle();
    let mut tally = Vec::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        ticker.tick().await;
        let mut lib = library.lock().await;
        let Some(round) = lib.minigame(OWNER).and_then(|mg| mg.round(ARENA)) else {
            break;
        };
        if round.stage() == Stage::Waiting {
            break;
        }
        if round.stage() != Stage::Playing {
            continue;
        }

        let diggers: Vec<PlayerId> = round.alive_participants().map(|p| p.id()).collect();
        for player in diggers {
            let Some(pos) = targets.next() else { break };
            let previous = lib.host().block("arena", pos)?;
            if previous.is_air() {
                continue;
            }
            if lib
                .on_block_break(player, "arena", pos, previous)
                .is_cancelled()
            {
                continue;
            }
            lib.host_mut().set_block("arena", pos, &BlockState::air())?;

            let spleefer = lib
                .minigame_mut(OWNER)
                .and_then(|mg| mg.round_mut(ARENA))
                .and_then(|round| round.participant_mut(player))
                .and_then(|p| p.downcast_mut::<Spleefer>());
            if let Some(spleefer) = spleefer {
                spleefer.dug += 1;
                let name = spleefer.name().to_string();
                match tally.iter_mut().find(|(n, _)| *n == name) {
                    Some((_, count)) => *count += 1,
                    None => tally.push((name, 1)),
                }
            }
        }
    }
    Ok(tally)
}

async fn log_events(mut events: UnboundedReceiver<RoundEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RoundEvent::RoundTicked { .. } => {}
            event => info!(?event, "round event"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), MgError> {
    init_logging("spleef=info,mglib=info");

    let (library, events) = build_library()?;
    let library = share(library);
    tokio::spawn(log_events(events));

    let (stop, stopped) = oneshot::channel::<()>();
    let driver = driver::spawn(library.clone(), TickConfig::default(), async move {
        let _ = stopped.await;
    });

    let tally = play(library.clone()).await?;
    for (name, dug) in &tally {
        info!(%name, dug, "final score");
    }

    let _ = stop.send(());
    let _ = driver.await;
    let floor_left = library.lock().await.host().solid_blocks("arena");
    info!(floor_left, "arena restored");
    Ok(())
}
