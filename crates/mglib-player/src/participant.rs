//! The participant capability trait and its default implementation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use mglib_types::{GameMode, Inventory, Location, PlayerId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlayerSnapshot
// ---------------------------------------------------------------------------

/// A player's state captured right before joining a round.
///
/// Restoring it on leave gives the player back exactly what they had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub inventory: Inventory,
    pub game_mode: GameMode,
    /// Where the player stood when they joined. Informational; leaving
    /// a round always sends the player to an exit location instead.
    #[serde(default)]
    pub location: Option<Location>,
}

// ---------------------------------------------------------------------------
// ParticipantState
// ---------------------------------------------------------------------------

/// The fields every participant carries, whatever its concrete type.
///
/// Invariant maintained by the round layer: `arena` is `Some(name)`
/// exactly when the round on `name` has this id in its roster.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantState {
    pub id: PlayerId,
    /// Display name at the time the participant was created.
    pub name: String,
    /// Arena of the round this participant belongs to, if any.
    pub arena: Option<String>,
    pub spectating: bool,
    /// Team label within the round. Cleared when the participant leaves.
    pub team: Option<String>,
    /// Game mode to restore on leave.
    pub previous_game_mode: Option<GameMode>,
    /// Pre-round snapshot, held until it is restored.
    pub snapshot: Option<PlayerSnapshot>,
}

impl ParticipantState {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            arena: None,
            spectating: false,
            team: None,
            previous_game_mode: None,
            snapshot: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Participant trait
// ---------------------------------------------------------------------------

/// A player's round-scoped state.
///
/// Minigames that need extra per-player data (kills, lives)
/// define their own type, embed a [`ParticipantState`], implement the
/// two accessor methods and hand the library a
/// [`ParticipantFactory`] that builds it. The core only ever touches
/// the shared fields through the provided methods; game code gets its
/// own type back with `downcast_ref`.
///
/// ```
/// use std::any::Any;
/// use mglib_player::{Participant, ParticipantState};
///
/// #[derive(Debug)]
/// struct Runner {
///     state: ParticipantState,
///     laps: u32,
/// }
///
/// impl Participant for Runner {
///     fn state(&self) -> &ParticipantState { &self.state }
///     fn state_mut(&mut self) -> &mut ParticipantState { &mut self.state }
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait Participant: Send + fmt::Debug + 'static {
    fn state(&self) -> &ParticipantState;

    fn state_mut(&mut self) -> &mut ParticipantState;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn id(&self) -> PlayerId {
        self.state().id
    }

    fn name(&self) -> &str {
        &self.state().name
    }

    /// Arena of the participant's round. The round itself is looked up
    /// by this name.
    fn arena(&self) -> Option<&str> {
        self.state().arena.as_deref()
    }

    fn is_in_round(&self) -> bool {
        self.state().arena.is_some()
    }

    fn is_spectating(&self) -> bool {
        self.state().spectating
    }

    fn set_spectating(&mut self, spectating: bool) {
        self.state_mut().spectating = spectating;
    }

    fn team(&self) -> Option<&str> {
        self.state().team.as_deref()
    }

    fn set_team(&mut self, team: Option<String>) {
        self.state_mut().team = team;
    }

    fn previous_game_mode(&self) -> Option<GameMode> {
        self.state().previous_game_mode
    }
}

impl<'a> dyn Participant + 'a {
    pub fn downcast_ref<T: Participant>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Participant>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

// ---------------------------------------------------------------------------
// MgPlayer
// ---------------------------------------------------------------------------

/// The participant type used when a minigame brings none of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct MgPlayer {
    state: ParticipantState,
}

impl MgPlayer {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            state: ParticipantState::new(id, name),
        }
    }
}

impl Participant for MgPlayer {
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
// Factory
// ---------------------------------------------------------------------------

/// Builds a fresh participant for a player joining a round.
///
/// Arguments are the player's stable id and current display name.
pub type ParticipantFactory = Arc<dyn Fn(PlayerId, &str) -> Box<dyn Participant> + Send + Sync>;

/// Factory producing plain [`MgPlayer`]s.
pub fn default_factory() -> ParticipantFactory {
    Arc::new(|id, name| Box::new(MgPlayer::new(id, name)))
}
