use bevy::app::AppExit;
use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::*;

pub mod reconcile;

use reconcile::reconcile_offline;

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

/// Where the save file lives. Collaborators (or tests) may point this
/// elsewhere before startup.
#[derive(Resource, Debug, Clone)]
pub struct SaveLocation {
    pub path: PathBuf,
}

impl Default for SaveLocation {
    fn default() -> Self {
        Self {
            path: saves_directory().join("purrloft.json"),
        }
    }
}

/// Fixed-interval autosave.
#[derive(Resource, Debug)]
pub struct AutosaveTimer {
    pub timer: Timer,
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(AUTOSAVE_INTERVAL_SECS, TimerMode::Repeating),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════

/// The durable key/value contract. Every field is optional on read so a
/// partial or hand-edited save degrades field-by-field to defaults instead of
/// failing the whole load. A save without `towerLevel` counts as no prior
/// save at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveFile {
    #[serde(rename = "saveVersion")]
    pub save_version: Option<u32>,
    #[serde(rename = "towerLevel")]
    pub tower_level: Option<u32>,
    #[serde(rename = "churCount")]
    pub chur_count: Option<u32>,
    #[serde(rename = "productionTimer")]
    pub production_timer: Option<f32>,
    #[serde(rename = "happiness")]
    pub happiness: Option<f32>,
    #[serde(rename = "catPositionX")]
    pub cat_position_x: Option<f32>,
    #[serde(rename = "catPositionY")]
    pub cat_position_y: Option<f32>,
    #[serde(rename = "lastSaveTime")]
    pub last_save_time: Option<u64>,
}

impl SaveFile {
    pub fn has_prior_save(&self) -> bool {
        self.tower_level.is_some()
    }

    /// Apply the stored fields, falling back to each field's initial value
    /// where the key is absent. Returns the stored cat position, if any.
    pub fn restore(&self, tower: &mut Tower, happiness: &mut Happiness) -> Option<Vec2> {
        let tower_defaults = Tower::default();
        let happiness_defaults = Happiness::default();

        tower.level = self
            .tower_level
            .unwrap_or(tower_defaults.level)
            .clamp(1, MAX_TOWER_LEVEL);
        tower.chur_count = self.chur_count.unwrap_or(tower_defaults.chur_count);
        tower.production_timer = self
            .production_timer
            .unwrap_or(tower_defaults.production_timer)
            .max(0.0);
        happiness.value = self
            .happiness
            .unwrap_or(happiness_defaults.value)
            .clamp(0.0, happiness.max);

        match (self.cat_position_x, self.cat_position_y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        }
    }
}

/// Capture the in-memory state in one synchronous pass; nothing ticks while
/// the snapshot is taken in a single-threaded schedule.
fn snapshot(tower: &Tower, happiness: &Happiness, cat_position: Option<Vec2>) -> SaveFile {
    SaveFile {
        save_version: Some(SAVE_VERSION),
        tower_level: Some(tower.level),
        chur_count: Some(tower.chur_count),
        production_timer: Some(tower.production_timer),
        happiness: Some(happiness.value),
        cat_position_x: cat_position.map(|p| p.x),
        cat_position_y: cat_position.map(|p| p.y),
        last_save_time: Some(current_timestamp()),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn write_save(path: &Path, save: &SaveFile) -> Result<(), String> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Could not create saves directory: {}", e))?;
        }
    }

    let json =
        serde_json::to_string_pretty(save).map_err(|e| format!("Serialization failed: {}", e))?;

    // Write to a temp file first, then rename for atomicity.
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json)
        .map_err(|e| format!("Write failed for {}: {}", tmp_path.display(), e))?;
    fs::rename(&tmp_path, path).map_err(|e| format!("Rename failed: {}", e))?;

    Ok(())
}

pub fn read_save(path: &Path) -> Result<SaveFile, String> {
    if !path.exists() {
        return Err(format!("Save file {} does not exist", path.display()));
    }
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Read failed for {}: {}", path.display(), e))?;
    let file: SaveFile =
        serde_json::from_str(&json).map_err(|e| format!("Deserialization failed: {}", e))?;

    if let Some(version) = file.save_version {
        if version != SAVE_VERSION {
            warn!(
                "Save has version {} but current version is {}. Attempting to load anyway.",
                version, SAVE_VERSION
            );
        }
    }

    Ok(file)
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// Boot sequence, strictly ordered: read durable state → reconcile the
/// offline gap once → hand control to live ticking by entering Playing.
pub fn boot_restore_and_reconcile(
    location: Res<SaveLocation>,
    mut tower: ResMut<Tower>,
    mut happiness: ResMut<Happiness>,
    mut restored: ResMut<RestoredCatPosition>,
    mut next_state: ResMut<NextState<GameState>>,
    mut complete_writer: EventWriter<LoadCompleteEvent>,
) {
    let summary = match read_save(&location.path) {
        Ok(file) if file.has_prior_save() => {
            restored.0 = file.restore(&mut tower, &mut happiness);
            let summary = match file.last_save_time {
                Some(last_save) => {
                    let elapsed = current_timestamp().saturating_sub(last_save);
                    reconcile_offline(&mut tower, &mut happiness, elapsed)
                }
                None => {
                    warn!("[Save] Save has no timestamp; skipping offline reconciliation.");
                    ReconcileSummary::default()
                }
            };
            info!(
                "[Save] Restored save: level {}, {} chur, happiness {:.1}. Away {} s: +{} chur, -{:.1} happiness.",
                tower.level,
                tower.chur_count,
                happiness.value,
                summary.offline_seconds,
                summary.chur_credited,
                summary.happiness_lost
            );
            summary
        }
        Ok(_) => {
            info!("[Save] Save file has no prior data; starting fresh.");
            ReconcileSummary::default()
        }
        Err(e) => {
            // A missing or unreadable save is not fatal: fresh defaults.
            info!("[Save] No usable save ({}); starting fresh.", e);
            ReconcileSummary::default()
        }
    };

    complete_writer.send(LoadCompleteEvent {
        success: true,
        summary,
    });
    next_state.set(GameState::Playing);
}

/// Processes [`SaveRequestEvent`] from any source: autosave timer, pause
/// entry, or a manual request.
pub fn handle_save_request(
    mut save_events: EventReader<SaveRequestEvent>,
    location: Res<SaveLocation>,
    tower: Res<Tower>,
    happiness: Res<Happiness>,
    cat_query: Query<&LogicalPosition, With<Cat>>,
    mut complete_writer: EventWriter<SaveCompleteEvent>,
) {
    for _ev in save_events.read() {
        let cat_position = cat_query.get_single().ok().map(|p| p.0);
        let save = snapshot(&tower, &happiness, cat_position);

        match write_save(&location.path, &save) {
            Ok(()) => {
                info!("[Save] Saved to {}.", location.path.display());
                complete_writer.send(SaveCompleteEvent {
                    success: true,
                    error_message: None,
                });
            }
            Err(e) => {
                // Never fatal: log, report, keep playing.
                warn!("[Save] Save FAILED: {}", e);
                complete_writer.send(SaveCompleteEvent {
                    success: false,
                    error_message: Some(e),
                });
            }
        }
    }
}

/// Processes [`LoadRequestEvent`] mid-session: re-reads the file, restores,
/// and reconciles whatever wall-clock gap exists since that save was written.
pub fn handle_load_request(
    mut load_events: EventReader<LoadRequestEvent>,
    location: Res<SaveLocation>,
    mut tower: ResMut<Tower>,
    mut happiness: ResMut<Happiness>,
    mut restored: ResMut<RestoredCatPosition>,
    mut cat_query: Query<&mut LogicalPosition, With<Cat>>,
    area: Res<MovementArea>,
    mut complete_writer: EventWriter<LoadCompleteEvent>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for _ev in load_events.read() {
        match read_save(&location.path) {
            Ok(file) if file.has_prior_save() => {
                let saved_position = file.restore(&mut tower, &mut happiness);
                restored.0 = saved_position;

                if let (Some(saved), Ok(mut pos)) = (saved_position, cat_query.get_single_mut()) {
                    pos.0 = area.clamp(saved);
                }

                let summary = match file.last_save_time {
                    Some(last_save) => {
                        let elapsed = current_timestamp().saturating_sub(last_save);
                        reconcile_offline(&mut tower, &mut happiness, elapsed)
                    }
                    None => {
                        warn!("[Save] Save has no timestamp; skipping offline reconciliation.");
                        ReconcileSummary::default()
                    }
                };

                info!("[Save] Reloaded from {}.", location.path.display());
                complete_writer.send(LoadCompleteEvent {
                    success: true,
                    summary,
                });
            }
            Ok(_) | Err(_) => {
                // Treated as "no prior save": fresh defaults, session continues.
                *tower = Tower::default();
                *happiness = Happiness::default();
                restored.0 = None;
                warn!("[Save] Load found no usable save; restored defaults.");
                toast_writer.send(ToastEvent {
                    message: "No save data found — starting fresh.".to_string(),
                    duration_secs: 3.0,
                });
                complete_writer.send(LoadCompleteEvent {
                    success: false,
                    summary: ReconcileSummary::default(),
                });
            }
        }
    }
}

/// Processes [`ResetDataEvent`]: deletes every durable key and restores
/// factory defaults, including a fresh random cat position.
pub fn handle_reset_request(
    mut reset_events: EventReader<ResetDataEvent>,
    location: Res<SaveLocation>,
    mut tower: ResMut<Tower>,
    mut happiness: ResMut<Happiness>,
    mut restored: ResMut<RestoredCatPosition>,
    mut cat_query: Query<&mut LogicalPosition, With<Cat>>,
    area: Res<MovementArea>,
    mut rng: ResMut<SimRng>,
    mut toast_writer: EventWriter<ToastEvent>,
) {
    for _ev in reset_events.read() {
        if location.path.exists() {
            if let Err(e) = fs::remove_file(&location.path) {
                warn!("[Save] Could not delete save file: {}", e);
            }
        }

        *tower = Tower::default();
        *happiness = Happiness::default();
        restored.0 = None;
        if let Ok(mut pos) = cat_query.get_single_mut() {
            pos.0 = Vec2::new(
                rng.0.gen_range(area.min.x..=area.max.x),
                rng.0.gen_range(area.min.y..=area.max.y),
            );
        }

        info!("[Save] All data reset.");
        toast_writer.send(ToastEvent {
            message: "All data has been reset.".to_string(),
            duration_secs: 3.0,
        });
    }
}

/// Fixed-interval autosave while playing.
pub fn tick_autosave(
    time: Res<Time>,
    mut autosave: ResMut<AutosaveTimer>,
    mut save_writer: EventWriter<SaveRequestEvent>,
) {
    autosave.timer.tick(time.delta());
    if autosave.timer.just_finished() {
        save_writer.send(SaveRequestEvent);
    }
}

/// Lifecycle trigger: save whenever the game pauses.
pub fn save_on_pause(mut save_writer: EventWriter<SaveRequestEvent>) {
    info!("[Save] Paused — saving.");
    save_writer.send(SaveRequestEvent);
}

/// Lifecycle trigger: save synchronously on shutdown. Runs in `Last` so the
/// exit event is seen in the frame it is sent.
pub fn save_on_exit(
    mut exit_events: EventReader<AppExit>,
    location: Res<SaveLocation>,
    tower: Res<Tower>,
    happiness: Res<Happiness>,
    cat_query: Query<&LogicalPosition, With<Cat>>,
) {
    if exit_events.read().next().is_none() {
        return;
    }

    let cat_position = cat_query.get_single().ok().map(|p| p.0);
    let save = snapshot(&tower, &happiness, cat_position);
    match write_save(&location.path, &save) {
        Ok(()) => info!("[Save] Saved on exit."),
        Err(e) => warn!("[Save] Save on exit FAILED: {}", e),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SaveLocation>()
            .init_resource::<AutosaveTimer>()
            .init_resource::<RestoredCatPosition>()
            // Boot: restore + reconcile exactly once, then enter Playing.
            .add_systems(OnEnter(GameState::Loading), boot_restore_and_reconcile)
            // Periodic autosave only while the sim is actually ticking.
            .add_systems(
                Update,
                tick_autosave.run_if(in_state(GameState::Playing)),
            )
            // Save/load/reset requests are honored while playing or paused.
            .add_systems(
                Update,
                (handle_save_request, handle_load_request, handle_reset_request)
                    .run_if(in_state(GameState::Playing).or(in_state(GameState::Paused))),
            )
            // Lifecycle saves.
            .add_systems(OnEnter(GameState::Paused), save_on_pause)
            .add_systems(Last, save_on_exit);
    }
}
