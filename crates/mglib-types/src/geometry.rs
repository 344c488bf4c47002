//! Positions, cells and axis-aligned bounds.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A point an actor can stand at: world name, coordinates and facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
}

impl Location {
    /// Creates a location with zero pitch and yaw.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    /// Returns the same location with the given facing.
    pub fn facing(mut self, pitch: f32, yaw: f32) -> Self {
        self.pitch = pitch;
        self.yaw = yaw;
        self
    }

    /// The integer cell this location falls in.
    pub fn block_pos(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }

    /// Returns `true` if both locations are in the same world.
    pub fn same_world(&self, other: &Location) -> bool {
        self.world == other.world
    }
}

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// A cell of the world grid. Rollback records are keyed by these.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned box an arena keeps its players inside.
///
/// Normalised when built through [`Bounds::from_corners`] or deserialized:
/// `min_* <= max_*` on every axis, whatever order the corners were given
/// in. Deserializing rejects NaN and infinite coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundsRepr")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
}

impl Bounds {
    /// Builds bounds from two opposite corners in any order.
    pub fn from_corners(a: (f64, f64, f64), b: (f64, f64, f64)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            min_z: a.2.min(b.2),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
            max_z: a.2.max(b.2),
        }
    }

    /// Reorders each axis so that `min_* <= max_*`.
    pub fn normalized(self) -> Self {
        Self::from_corners(
            (self.min_x, self.min_y, self.min_z),
            (self.max_x, self.max_y, self.max_z),
        )
    }

    /// Returns `true` if no coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        [
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Returns `true` if the point lies inside or on the box.
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
            && z >= self.min_z
            && z <= self.max_z
    }

    /// Returns `true` if the location's coordinates lie inside the box.
    /// The world is not compared; callers check that separately.
    pub fn contains_location(&self, loc: &Location) -> bool {
        self.contains(loc.x, loc.y, loc.z)
    }

    /// Pulls a location back onto the nearest face of the box.
    ///
    /// Returns `None` when the location is already inside. Otherwise every
    /// out-of-range axis is clamped to its bound; world and facing are kept.
    pub fn clamp(&self, loc: &Location) -> Option<Location> {
        if self.contains_location(loc) {
            return None;
        }
        let mut clamped = loc.clone();
        clamped.x = loc.x.max(self.min_x).min(self.max_x);
        clamped.y = loc.y.max(self.min_y).min(self.max_y);
        clamped.z = loc.z.max(self.min_z).min(self.max_z);
        Some(clamped)
    }
}

#[derive(Deserialize)]
struct BoundsRepr {
    min_x: f64,
    min_y: f64,
    min_z: f64,
    max_x: f64,
    max_y: f64,
    max_z: f64,
}

impl TryFrom<BoundsRepr> for Bounds {
    type Error = String;

    fn try_from(r: BoundsRepr) -> Result<Self, Self::Error> {
        let raw = Bounds {
            min_x: r.min_x,
            min_y: r.min_y,
            min_z: r.min_z,
            max_x: r.max_x,
            max_y: r.max_y,
            max_z: r.max_z,
        };
        if !raw.is_finite() {
            return Err(format!("bounds coordinates must be finite: {raw:?}"));
        }
        Ok(raw.normalized())
    }
}
