//! Shared components, resources, events, and states for Purrloft.
//!
//! This is the type contract. Every domain plugin imports from here.
//! No domain imports from any other domain directly.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE — top-level state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    /// Restore the save file and reconcile offline time before anything ticks.
    #[default]
    Loading,
    Playing,
    Paused,
}

// ═══════════════════════════════════════════════════════════════════════
// HAPPINESS
// ═══════════════════════════════════════════════════════════════════════

/// Bounded decaying happiness meter. Decays continuously while the sim runs,
/// is drained in one step by offline reconciliation, and is restored by
/// feeding chur.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct Happiness {
    pub value: f32,
    pub max: f32,
    pub decay_per_hour: f32,
    pub gain_per_chur: f32,
}

impl Default for Happiness {
    fn default() -> Self {
        Self {
            value: 100.0,
            max: 100.0,
            decay_per_hour: 10.0,
            gain_per_chur: 10.0,
        }
    }
}

impl Happiness {
    /// Advance decay by `delta_seconds` of simulated time.
    pub fn tick(&mut self, delta_seconds: f32) {
        self.value =
            (self.value - self.decay_per_hour / 3600.0 * delta_seconds).clamp(0.0, self.max);
    }

    /// Feed `units` chur. Non-positive units are a precondition violation and
    /// leave the meter untouched; the caller sees `false`, never a panic.
    pub fn feed(&mut self, units: i32) -> bool {
        if units <= 0 {
            return false;
        }
        self.value = (self.value + units as f32 * self.gain_per_chur).clamp(0.0, self.max);
        true
    }

    pub fn percentage(&self) -> f32 {
        self.value / self.max * 100.0
    }

    /// Qualitative band for presentation. Band edges sit at 80/60/40/20
    /// percent of max, exclusive.
    pub fn status_label(&self) -> &'static str {
        let pct = self.percentage();
        if pct > 80.0 {
            "very happy"
        } else if pct > 60.0 {
            "happy"
        } else if pct > 40.0 {
            "neutral"
        } else if pct > 20.0 {
            "unhappy"
        } else {
            "very unhappy"
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TOWER
// ═══════════════════════════════════════════════════════════════════════

/// The chur tower: produces chur on a fixed cycle, can be upgraded twice.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct Tower {
    /// 1..=MAX_TOWER_LEVEL.
    pub level: u32,
    pub chur_count: u32,
    /// Sub-cycle progress in seconds, always in [0, PRODUCTION_INTERVAL_SECS).
    pub production_timer: f32,
}

impl Default for Tower {
    fn default() -> Self {
        Self {
            level: 1,
            chur_count: 0,
            production_timer: 0.0,
        }
    }
}

impl Tower {
    /// Chur produced per completed cycle.
    pub fn production_amount(&self) -> u32 {
        self.level + 1
    }

    /// Cost to upgrade FROM the current level. `None` at the terminal level.
    pub fn upgrade_cost(&self) -> Option<u32> {
        match self.level {
            1 => Some(6),
            2 => Some(8),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub fn can_upgrade(&self) -> bool {
        match self.upgrade_cost() {
            Some(cost) => self.chur_count >= cost,
            None => false,
        }
    }

    /// Deducts the upgrade cost and bumps the level. `false` and no mutation
    /// when the upgrade is not possible.
    pub fn upgrade(&mut self) -> bool {
        let Some(cost) = self.upgrade_cost() else {
            return false;
        };
        if !self.spend(cost) {
            return false;
        }
        self.level += 1;
        true
    }

    /// The sole withdrawal primitive. `false` and no mutation on insufficient
    /// funds.
    pub fn spend(&mut self, amount: u32) -> bool {
        if self.chur_count < amount {
            return false;
        }
        self.chur_count -= amount;
        true
    }

    /// Advance production by `delta_seconds`. Loops so that a long delta
    /// (e.g. after a suspend, when driven directly rather than through the
    /// bounded offline path) yields every completed cycle, carrying the
    /// remainder in `production_timer`. Returns the chur produced this call.
    pub fn tick(&mut self, delta_seconds: f32) -> u32 {
        self.production_timer += delta_seconds;
        let mut produced = 0;
        while self.production_timer >= PRODUCTION_INTERVAL_SECS {
            produced += self.production_amount();
            self.production_timer -= PRODUCTION_INTERVAL_SECS;
        }
        self.chur_count = self.chur_count.saturating_add(produced);
        produced
    }

    #[allow(dead_code)]
    pub fn time_until_next_production(&self) -> f32 {
        PRODUCTION_INTERVAL_SECS - self.production_timer
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CAT
// ═══════════════════════════════════════════════════════════════════════

/// Marker for the single pet entity.
#[derive(Component, Debug, Clone, Default)]
pub struct Cat;

/// World-space position, decoupled from any render transform. Rendering
/// collaborators mirror this into whatever transform they use.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LogicalPosition(pub Vec2);

/// The cat's movement/idle/sleep state. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    Walking,
    Idle,
    Sleeping,
}

/// Horizontal facing, derived from movement with hysteresis so negligible
/// jitter does not flip the sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Default for Facing {
    fn default() -> Self {
        Facing::Right
    }
}

/// Rectangle the cat is allowed to roam. Collaborators that own the window
/// recompute this from the viewport; the default covers the reference screen
/// inset by a small border.
#[derive(Resource, Debug, Clone, Copy)]
pub struct MovementArea {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for MovementArea {
    fn default() -> Self {
        Self {
            min: Vec2::splat(AREA_INSET),
            max: Vec2::new(SCREEN_WIDTH - AREA_INSET, SCREEN_HEIGHT - AREA_INSET),
        }
    }
}

impl MovementArea {
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Within EDGE_STEER_MARGIN of any of the four edges.
    pub fn near_edge(&self, p: Vec2) -> bool {
        p.x - self.min.x <= EDGE_STEER_MARGIN
            || self.max.x - p.x <= EDGE_STEER_MARGIN
            || p.y - self.min.y <= EDGE_STEER_MARGIN
            || self.max.y - p.y <= EDGE_STEER_MARGIN
    }
}

/// Cat position recovered from the save file, consumed once by the spawn
/// system. `None` means no prior save: spawn at a random spot in the area.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct RestoredCatPosition(pub Option<Vec2>);

// ═══════════════════════════════════════════════════════════════════════
// RANDOMNESS
// ═══════════════════════════════════════════════════════════════════════

/// The single shared random source. Every randomized branch in the sim draws
/// from here so a fixed seed reproduces the whole session.
#[derive(Resource)]
pub struct SimRng(pub StdRng);

impl Default for SimRng {
    fn default() -> Self {
        Self(StdRng::seed_from_u64(DEFAULT_RNG_SEED))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — commands from UI/input collaborators
// ═══════════════════════════════════════════════════════════════════════

/// Feed `units` chur to the cat. Non-positive units are a no-op.
#[derive(Event, Debug, Clone)]
pub struct FeedEvent {
    pub units: i32,
}

/// Request a tower upgrade. Denied with a toast when not affordable or at the
/// terminal level.
#[derive(Event, Debug, Clone)]
pub struct UpgradeRequestEvent;

/// Force the cat into a behavior state (debug/UI command). Runs the normal
/// state-entry effects.
#[derive(Event, Debug, Clone)]
pub struct ForceBehaviorEvent {
    pub state: BehaviorState,
}

/// Manual save request.
#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent;

/// Manual load request (re-reads the save file mid-session).
#[derive(Event, Debug, Clone)]
pub struct LoadRequestEvent;

/// Delete the save file and restore every entity to factory defaults.
#[derive(Event, Debug, Clone)]
pub struct ResetDataEvent;

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — outbound notifications
// ═══════════════════════════════════════════════════════════════════════

/// Fires on every cat behavior transition, including forced ones.
#[derive(Event, Debug, Clone)]
pub struct BehaviorChangedEvent {
    pub from: BehaviorState,
    pub to: BehaviorState,
}

/// Fires only when the derived facing actually flips, never every tick.
#[derive(Event, Debug, Clone)]
pub struct FacingChangedEvent {
    pub facing: Facing,
}

/// Fires whenever production completes one or more cycles in a tick.
#[derive(Event, Debug, Clone)]
pub struct ChurProducedEvent {
    pub amount: u32,
}

/// Sent after a save completes (success or failure).
#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent after a load completes, carrying what offline reconciliation applied
/// so collaborators can show an away-recap.
#[derive(Event, Debug, Clone)]
pub struct LoadCompleteEvent {
    pub success: bool,
    pub summary: ReconcileSummary,
}

/// Human-readable feedback for UI collaborators.
#[derive(Event, Debug, Clone)]
pub struct ToastEvent {
    pub message: String,
    pub duration_secs: f32,
}

/// What offline reconciliation applied on load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReconcileSummary {
    pub offline_seconds: u64,
    pub chur_credited: u32,
    pub happiness_lost: f32,
}

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

pub const SCREEN_WIDTH: f32 = 960.0;
pub const SCREEN_HEIGHT: f32 = 540.0;
/// Default movement-area border inside the reference screen.
pub const AREA_INSET: f32 = 16.0;

/// Seconds per live production cycle.
pub const PRODUCTION_INTERVAL_SECS: f32 = 10.0;
pub const MAX_TOWER_LEVEL: u32 = 3;

/// Offline credit is granted per 10 elapsed minutes, capped at one hour's
/// worth of cycles.
pub const OFFLINE_CYCLE_MINUTES: f64 = 10.0;
pub const MAX_OFFLINE_CYCLES: u32 = 6;

/// Cat walk speed in world units per second.
pub const CAT_SPEED: f32 = 40.0;
/// Distance from an area edge inside which new directions steer to center.
pub const EDGE_STEER_MARGIN: f32 = 1.0;
/// Horizontal displacement below this never flips facing.
pub const FACING_EPSILON: f32 = 0.001;

pub const AUTOSAVE_INTERVAL_SECS: f32 = 30.0;
pub const SAVE_VERSION: u32 = 1;
pub const DEFAULT_RNG_SEED: u64 = 0xCA7_F00D;
