use bevy::prelude::*;
use rand::Rng;

use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Sub-modules
// ─────────────────────────────────────────────────────────────────────────────
mod behavior;

pub use behavior::*;

// ─────────────────────────────────────────────────────────────────────────────
// Components (internal to the cat domain)
// ─────────────────────────────────────────────────────────────────────────────

/// The behavior state machine for the cat entity.
///
/// Exactly one of Walking/Idle/Sleeping is active. `move_direction` is a unit
/// vector while Walking and `(0, 0)` otherwise — the systems in `behavior`
/// maintain that invariant on every transition.
#[derive(Component, Debug, Clone)]
pub struct CatBehavior {
    pub state: BehaviorState,
    pub move_direction: Vec2,
    /// Elapsed time in the current state. Only Sleeping reads it.
    pub state_timer: f32,
    /// Time walked since the last direction decision.
    pub direction_timer: f32,
    /// Time idled since entering or re-rolling Idle.
    pub pause_timer: f32,
    /// Current walking dwell threshold, redrawn from [1.5, 3.0] s.
    pub change_direction_time: f32,
    /// Current idle dwell threshold, drawn from [4, 8] s on entry and
    /// [3, 7] s on an idle re-roll.
    pub pause_time: f32,
    pub facing: Facing,
}

impl Default for CatBehavior {
    fn default() -> Self {
        Self {
            state: BehaviorState::Idle,
            move_direction: Vec2::ZERO,
            state_timer: 0.0,
            direction_timer: 0.0,
            pause_timer: 0.0,
            change_direction_time: 2.25,
            pause_time: 6.0,
            facing: Facing::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Spawning
// ─────────────────────────────────────────────────────────────────────────────

/// Spawns the single cat entity when entering Playing. Guarded so that a
/// Paused → Playing transition does not spawn a second cat. Uses the restored
/// position when a save existed; otherwise a random spot inside the area.
pub fn spawn_cat(
    mut commands: Commands,
    existing: Query<(), With<Cat>>,
    restored: Res<RestoredCatPosition>,
    area: Res<MovementArea>,
    mut rng: ResMut<SimRng>,
) {
    if !existing.is_empty() {
        return;
    }

    let position = match restored.0 {
        Some(saved) => area.clamp(saved),
        None => Vec2::new(
            rng.0.gen_range(area.min.x..=area.max.x),
            rng.0.gen_range(area.min.y..=area.max.y),
        ),
    };

    let mut behavior = CatBehavior::default();
    // Spawning enters Idle, so draw the entry dwell like any Idle entry.
    behavior.pause_time = rng.0.gen_range(4.0..=8.0);

    commands.spawn((Cat, LogicalPosition(position), behavior));
    info!("[Cat] Spawned at ({:.1}, {:.1}).", position.x, position.y);
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct CatPlugin;

impl Plugin for CatPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Playing), spawn_cat).add_systems(
            Update,
            (tick_cat_behavior, handle_force_behavior).run_if(in_state(GameState::Playing)),
        );
    }
}
