//! Happiness domain — continuous decay and the feed command.
//!
//! Feeding only restores the meter. Paying for the chur is the caller's
//! composition: UI collaborators withdraw through `Tower::spend` first, so
//! this domain never reaches into the tower.

use bevy::prelude::*;

use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Systems
// ─────────────────────────────────────────────────────────────────────────────

/// Applies continuous decay every frame.
pub fn tick_decay(time: Res<Time>, mut happiness: ResMut<Happiness>) {
    happiness.tick(time.delta_secs());
}

/// Listens to [`FeedEvent`]. Non-positive units are a precondition violation
/// and leave the meter untouched.
pub fn handle_feed(mut events: EventReader<FeedEvent>, mut happiness: ResMut<Happiness>) {
    for ev in events.read() {
        if happiness.feed(ev.units) {
            info!(
                "[Happiness] Fed {} chur: {:.1}/{:.1} ({}).",
                ev.units,
                happiness.value,
                happiness.max,
                happiness.status_label()
            );
        } else {
            warn!("[Happiness] Ignored feed of {} units.", ev.units);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct HappinessPlugin;

impl Plugin for HappinessPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (tick_decay, handle_feed).run_if(in_state(GameState::Playing)),
        );
    }
}
