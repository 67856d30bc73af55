//! Tower domain — chur production and the upgrade economy.
//!
//! All cross-domain communication goes through `crate::shared::*` events and
//! resources. No other domain module is imported here.

use bevy::prelude::*;

use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Systems
// ─────────────────────────────────────────────────────────────────────────────

/// Advances the production timer every frame and announces completed cycles.
pub fn tick_production(
    time: Res<Time>,
    mut tower: ResMut<Tower>,
    mut produced_writer: EventWriter<ChurProducedEvent>,
) {
    let produced = tower.tick(time.delta_secs());
    if produced > 0 {
        produced_writer.send(ChurProducedEvent { amount: produced });
        info!(
            "[Tower] Produced {} chur (level {}, {} total).",
            produced, tower.level, tower.chur_count
        );
    }
}

/// Listens to [`UpgradeRequestEvent`] and validates the request.
///
/// On success: deducts the cost through `spend` and bumps the level. The
/// tower's visual regeneration is the rendering collaborator's business.
///
/// On failure: no mutation, and a toast explains the denial.
pub fn handle_upgrade_request(
    mut events: EventReader<UpgradeRequestEvent>,
    mut tower: ResMut<Tower>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for _ev in events.read() {
        let Some(cost) = tower.upgrade_cost() else {
            toast_writer.send(ToastEvent {
                message: "The tower is already fully upgraded.".to_string(),
                duration_secs: 3.0,
            });
            continue;
        };

        if tower.upgrade() {
            info!(
                "[Tower] Upgraded to level {} for {} chur. {} chur left.",
                tower.level, cost, tower.chur_count
            );
            toast_writer.send(ToastEvent {
                message: format!("Tower upgraded to level {}!", tower.level),
                duration_secs: 3.5,
            });
        } else {
            toast_writer.send(ToastEvent {
                message: format!("Not enough chur! Need {}, have {}.", cost, tower.chur_count),
                duration_secs: 3.0,
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct TowerPlugin;

impl Plugin for TowerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (tick_production, handle_upgrade_request).run_if(in_state(GameState::Playing)),
        );
    }
}
