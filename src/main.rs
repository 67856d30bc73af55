mod shared;
mod cat;
mod tower;
mod happiness;
mod save;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use shared::*;

fn main() {
    App::new()
        // Headless core: rendering/windowing collaborators bring their own
        // plugins and drive the same resources and events.
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            Duration::from_secs_f64(1.0 / 60.0),
        )))
        .add_plugins(LogPlugin::default())
        .add_plugins(StatesPlugin)
        // Game state
        .init_state::<GameState>()
        // Shared resources
        .init_resource::<Happiness>()
        .init_resource::<Tower>()
        .init_resource::<MovementArea>()
        .init_resource::<SimRng>()
        // Command events
        .add_event::<FeedEvent>()
        .add_event::<UpgradeRequestEvent>()
        .add_event::<ForceBehaviorEvent>()
        .add_event::<SaveRequestEvent>()
        .add_event::<LoadRequestEvent>()
        .add_event::<ResetDataEvent>()
        // Notification events
        .add_event::<BehaviorChangedEvent>()
        .add_event::<FacingChangedEvent>()
        .add_event::<ChurProducedEvent>()
        .add_event::<SaveCompleteEvent>()
        .add_event::<LoadCompleteEvent>()
        .add_event::<ToastEvent>()
        // Domain plugins
        .add_plugins(cat::CatPlugin)
        .add_plugins(tower::TowerPlugin)
        .add_plugins(happiness::HappinessPlugin)
        .add_plugins(save::SavePlugin)
        .run();
}
