use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

use super::CatBehavior;
use crate::shared::*;

// ─────────────────────────────────────────────────────────────────────────────
// Behavior state machine
//
// The cat wanders inside the movement area, reflecting off edges, and drifts
// between Walking, Idle, and Sleeping on randomized dwell times. Every random
// branch is a single uniform draw against ordered intervals so the whole
// machine replays identically under a fixed seed.
// ─────────────────────────────────────────────────────────────────────────────

/// Chance to drop into Idle at the end of a walking dwell.
const IDLE_CHANCE: f32 = 0.7;
/// Of the walks that don't idle, this share falls asleep instead.
const SLEEP_SHARE: f32 = 0.2;
/// Chance to stop walking right after bouncing off an edge.
const BOUNCE_IDLE_CHANCE: f32 = 0.3;

const IDLE_TO_WALK: f32 = 0.4;
const IDLE_STAY: f32 = 0.7;

/// Sleep is uninterruptible for this long.
const WAKE_DELAY_SECS: f32 = 10.0;
/// Wake pressure ramps up over this window past the delay.
const WAKE_RAMP_SECS: f32 = 30.0;
/// Per-tick scale on the ramped wake chance.
const WAKE_TICK_SCALE: f32 = 0.01;
/// A waking cat usually sits up before it starts moving again.
const WAKE_TO_IDLE: f32 = 0.8;

/// Advance the state machine by one tick of `dt` seconds.
pub fn step_behavior(
    behavior: &mut CatBehavior,
    position: &mut Vec2,
    area: &MovementArea,
    rng: &mut StdRng,
    dt: f32,
) {
    match behavior.state {
        BehaviorState::Walking => step_walking(behavior, position, area, rng, dt),
        BehaviorState::Idle => step_idle(behavior, *position, area, rng, dt),
        BehaviorState::Sleeping => step_sleeping(behavior, *position, area, rng, dt),
    }
}

fn step_walking(
    behavior: &mut CatBehavior,
    position: &mut Vec2,
    area: &MovementArea,
    rng: &mut StdRng,
    dt: f32,
) {
    let prospective = *position + behavior.move_direction * CAT_SPEED * dt;

    // Each axis reflects independently; a corner hit reflects both.
    let mut reflected = false;
    if prospective.x < area.min.x || prospective.x > area.max.x {
        behavior.move_direction.x = -behavior.move_direction.x;
        position.x = prospective.x.clamp(area.min.x, area.max.x);
        reflected = true;
    } else {
        position.x = prospective.x;
    }
    if prospective.y < area.min.y || prospective.y > area.max.y {
        behavior.move_direction.y = -behavior.move_direction.y;
        position.y = prospective.y.clamp(area.min.y, area.max.y);
        reflected = true;
    } else {
        position.y = prospective.y;
    }

    if reflected && rng.gen_range(0.0f32..1.0) < BOUNCE_IDLE_CHANCE {
        // Early exit: the bounce decision pre-empts dwell accounting this tick.
        transition_to(behavior, BehaviorState::Idle, *position, area, rng);
        return;
    }

    behavior.direction_timer += dt;
    if behavior.direction_timer >= behavior.change_direction_time {
        behavior.direction_timer = 0.0;
        let roll = rng.gen_range(0.0f32..1.0);
        if roll < IDLE_CHANCE {
            transition_to(behavior, BehaviorState::Idle, *position, area, rng);
        } else if roll < IDLE_CHANCE + (1.0 - IDLE_CHANCE) * SLEEP_SHARE {
            transition_to(behavior, BehaviorState::Sleeping, *position, area, rng);
        } else {
            behavior.move_direction = pick_direction(*position, area, rng);
            behavior.change_direction_time = rng.gen_range(1.5f32..=3.0);
        }
    }
}

fn step_idle(
    behavior: &mut CatBehavior,
    position: Vec2,
    area: &MovementArea,
    rng: &mut StdRng,
    dt: f32,
) {
    behavior.pause_timer += dt;
    if behavior.pause_timer >= behavior.pause_time {
        let roll = rng.gen_range(0.0f32..1.0);
        if roll < IDLE_TO_WALK {
            transition_to(behavior, BehaviorState::Walking, position, area, rng);
        } else if roll < IDLE_STAY {
            behavior.pause_timer = 0.0;
            behavior.pause_time = rng.gen_range(3.0f32..=7.0);
        } else {
            transition_to(behavior, BehaviorState::Sleeping, position, area, rng);
        }
    }
}

fn step_sleeping(
    behavior: &mut CatBehavior,
    position: Vec2,
    area: &MovementArea,
    rng: &mut StdRng,
    dt: f32,
) {
    behavior.state_timer += dt;
    if behavior.state_timer > WAKE_DELAY_SECS {
        let wake_chance = (behavior.state_timer - WAKE_DELAY_SECS) / WAKE_RAMP_SECS;
        if rng.gen_range(0.0f32..1.0) < wake_chance * WAKE_TICK_SCALE {
            if rng.gen_range(0.0f32..1.0) < WAKE_TO_IDLE {
                transition_to(behavior, BehaviorState::Idle, position, area, rng);
            } else {
                transition_to(behavior, BehaviorState::Walking, position, area, rng);
            }
        }
    }
}

/// Switch states, resetting every timer of the previous state and running the
/// entry effects of the new one.
pub fn transition_to(
    behavior: &mut CatBehavior,
    to: BehaviorState,
    position: Vec2,
    area: &MovementArea,
    rng: &mut StdRng,
) {
    behavior.state_timer = 0.0;
    behavior.direction_timer = 0.0;
    behavior.pause_timer = 0.0;
    behavior.state = to;

    match to {
        BehaviorState::Walking => {
            behavior.move_direction = pick_direction(position, area, rng);
            behavior.change_direction_time = rng.gen_range(1.5f32..=3.0);
        }
        BehaviorState::Idle => {
            behavior.move_direction = Vec2::ZERO;
            behavior.pause_time = rng.gen_range(4.0f32..=8.0);
        }
        BehaviorState::Sleeping => {
            behavior.move_direction = Vec2::ZERO;
        }
    }
}

/// New walking direction. Near an edge the cat is steered back toward the
/// center of the area instead of rolling fully random, so it doesn't stick to
/// the border.
pub(crate) fn pick_direction(position: Vec2, area: &MovementArea, rng: &mut StdRng) -> Vec2 {
    if area.near_edge(position) {
        let to_center = area.center() - position;
        if to_center.length_squared() > f32::EPSILON {
            return to_center.normalize();
        }
    }
    let angle = rng.gen_range(0.0f32..std::f32::consts::TAU);
    Vec2::new(angle.cos(), angle.sin())
}

/// `Some(new_facing)` only when the horizontal displacement beats the
/// hysteresis epsilon AND the facing actually changes.
pub(crate) fn derive_facing(prev_x: f32, new_x: f32, current: Facing) -> Option<Facing> {
    let dx = new_x - prev_x;
    if dx.abs() <= FACING_EPSILON {
        return None;
    }
    let next = if dx < 0.0 { Facing::Left } else { Facing::Right };
    (next != current).then_some(next)
}

// ─────────────────────────────────────────────────────────────────────────────
// Systems
// ─────────────────────────────────────────────────────────────────────────────

pub fn tick_cat_behavior(
    time: Res<Time>,
    area: Res<MovementArea>,
    mut rng: ResMut<SimRng>,
    mut query: Query<(&mut CatBehavior, &mut LogicalPosition), With<Cat>>,
    mut behavior_writer: EventWriter<BehaviorChangedEvent>,
    mut facing_writer: EventWriter<FacingChangedEvent>,
) {
    let dt = time.delta_secs();
    for (mut behavior, mut pos) in query.iter_mut() {
        let before = behavior.state;
        let prev_x = pos.0.x;

        step_behavior(&mut behavior, &mut pos.0, &area, &mut rng.0, dt);

        if behavior.state != before {
            behavior_writer.send(BehaviorChangedEvent {
                from: before,
                to: behavior.state,
            });
        }
        if let Some(facing) = derive_facing(prev_x, pos.0.x, behavior.facing) {
            behavior.facing = facing;
            facing_writer.send(FacingChangedEvent { facing });
        }
    }
}

/// Debug/UI command: force the cat into a state through the normal entry
/// effects.
pub fn handle_force_behavior(
    mut events: EventReader<ForceBehaviorEvent>,
    area: Res<MovementArea>,
    mut rng: ResMut<SimRng>,
    mut query: Query<(&mut CatBehavior, &LogicalPosition), With<Cat>>,
    mut behavior_writer: EventWriter<BehaviorChangedEvent>,
) {
    for ev in events.read() {
        for (mut behavior, pos) in query.iter_mut() {
            let from = behavior.state;
            transition_to(&mut behavior, ev.state, pos.0, &area, &mut rng.0);
            behavior_writer.send(BehaviorChangedEvent {
                from,
                to: ev.state,
            });
            info!("[Cat] Behavior forced: {:?} → {:?}.", from, ev.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_area() -> MovementArea {
        MovementArea {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(100.0, 100.0),
        }
    }

    /// Smallest seed whose fresh StdRng satisfies the predicate. Lets a test
    /// pin down which branch the first draw takes without faking the RNG.
    fn seed_where(pred: impl Fn(&mut StdRng) -> bool) -> u64 {
        (0..50_000u64)
            .find(|&s| pred(&mut StdRng::seed_from_u64(s)))
            .expect("no seed in range satisfies predicate")
    }

    fn walking_cat(direction: Vec2) -> CatBehavior {
        CatBehavior {
            state: BehaviorState::Walking,
            move_direction: direction,
            // Far enough away that dwell never triggers mid-test.
            change_direction_time: 1_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_walking_advances_position() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) >= BOUNCE_IDLE_CHANCE);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(1.0, 0.0));
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.5);

        assert_eq!(behavior.state, BehaviorState::Walking);
        assert!((pos.x - (50.0 + CAT_SPEED * 0.5)).abs() < 1e-4);
        assert_eq!(pos.y, 50.0);
    }

    #[test]
    fn test_boundary_reflects_and_clamps() {
        let area = test_area();
        // First draw must dodge the bounce-idle branch so we stay Walking.
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) >= BOUNCE_IDLE_CHANCE);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(1.0, 0.0));
        let mut pos = Vec2::new(99.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.0);

        assert_eq!(behavior.state, BehaviorState::Walking);
        assert!(behavior.move_direction.x < 0.0, "x direction should invert");
        assert_eq!(pos.x, area.max.x, "position clamps to the bound");
    }

    #[test]
    fn test_corner_reflects_both_axes() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) >= BOUNCE_IDLE_CHANCE);
        let mut rng = StdRng::seed_from_u64(seed);
        let dir = Vec2::new(1.0, 1.0).normalize();
        let mut behavior = walking_cat(dir);
        let mut pos = Vec2::new(99.5, 99.5);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.0);

        assert!(behavior.move_direction.x < 0.0);
        assert!(behavior.move_direction.y < 0.0);
        assert_eq!(pos, Vec2::new(area.max.x, area.max.y));
    }

    #[test]
    fn test_bounce_can_drop_to_idle_immediately() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) < BOUNCE_IDLE_CHANCE);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(1.0, 0.0));
        behavior.direction_timer = 0.4;
        let mut pos = Vec2::new(99.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.0);

        assert_eq!(behavior.state, BehaviorState::Idle);
        assert_eq!(behavior.move_direction, Vec2::ZERO);
        assert_eq!(
            behavior.direction_timer, 0.0,
            "early exit still resets the walk timer via the transition"
        );
        assert!(behavior.pause_time >= 4.0 && behavior.pause_time <= 8.0);
    }

    #[test]
    fn test_walk_dwell_idle_branch() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) < IDLE_CHANCE);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(0.0, 1.0));
        behavior.change_direction_time = 0.5;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.6);

        assert_eq!(behavior.state, BehaviorState::Idle);
        assert_eq!(behavior.move_direction, Vec2::ZERO);
        assert!(behavior.pause_time >= 4.0 && behavior.pause_time <= 8.0);
    }

    #[test]
    fn test_walk_dwell_sleep_branch() {
        let area = test_area();
        let lo = IDLE_CHANCE;
        let hi = IDLE_CHANCE + (1.0 - IDLE_CHANCE) * SLEEP_SHARE;
        let seed = seed_where(|r| {
            let roll = r.gen_range(0.0f32..1.0);
            roll >= lo && roll < hi
        });
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(0.0, 1.0));
        behavior.change_direction_time = 0.5;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.6);

        assert_eq!(behavior.state, BehaviorState::Sleeping);
        assert_eq!(behavior.move_direction, Vec2::ZERO);
        assert_eq!(behavior.state_timer, 0.0);
    }

    #[test]
    fn test_walk_dwell_rewalk_branch() {
        let area = test_area();
        let hi = IDLE_CHANCE + (1.0 - IDLE_CHANCE) * SLEEP_SHARE;
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) >= hi);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = walking_cat(Vec2::new(0.0, 1.0));
        behavior.change_direction_time = 0.5;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.6);

        assert_eq!(behavior.state, BehaviorState::Walking);
        assert!(behavior.change_direction_time >= 1.5 && behavior.change_direction_time <= 3.0);
        assert!(
            (behavior.move_direction.length() - 1.0).abs() < 1e-4,
            "fresh direction is a unit vector"
        );
        assert_eq!(behavior.direction_timer, 0.0);
    }

    #[test]
    fn test_idle_dwell_walk_branch() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) < IDLE_TO_WALK);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = CatBehavior::default();
        behavior.pause_time = 1.0;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.5);

        assert_eq!(behavior.state, BehaviorState::Walking);
        assert!((behavior.move_direction.length() - 1.0).abs() < 1e-4);
        assert!(behavior.change_direction_time >= 1.5 && behavior.change_direction_time <= 3.0);
    }

    #[test]
    fn test_idle_dwell_stay_branch_redraws_pause() {
        let area = test_area();
        let seed = seed_where(|r| {
            let roll = r.gen_range(0.0f32..1.0);
            roll >= IDLE_TO_WALK && roll < IDLE_STAY
        });
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = CatBehavior::default();
        behavior.pause_time = 1.0;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.5);

        assert_eq!(behavior.state, BehaviorState::Idle);
        assert_eq!(behavior.pause_timer, 0.0);
        assert!(
            behavior.pause_time >= 3.0 && behavior.pause_time <= 7.0,
            "stay-idle re-roll uses the [3, 7] range"
        );
    }

    #[test]
    fn test_idle_dwell_sleep_branch() {
        let area = test_area();
        let seed = seed_where(|r| r.gen_range(0.0f32..1.0) >= IDLE_STAY);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut behavior = CatBehavior::default();
        behavior.pause_time = 1.0;
        let mut pos = Vec2::new(50.0, 50.0);

        step_behavior(&mut behavior, &mut pos, &area, &mut rng, 1.5);

        assert_eq!(behavior.state, BehaviorState::Sleeping);
        assert_eq!(behavior.move_direction, Vec2::ZERO);
    }

    #[test]
    fn test_sleep_is_uninterruptible_before_delay() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(7);
        let mut behavior = CatBehavior::default();
        let mut pos = Vec2::new(50.0, 50.0);
        transition_to(&mut behavior, BehaviorState::Sleeping, pos, &area, &mut rng);

        // 20 × 0.5 s = exactly the wake delay; the check only starts beyond it.
        for _ in 0..20 {
            step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.5);
            assert_eq!(behavior.state, BehaviorState::Sleeping);
        }
    }

    #[test]
    fn test_sleeping_cat_eventually_wakes() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(99);
        let mut behavior = CatBehavior::default();
        let mut pos = Vec2::new(50.0, 50.0);
        transition_to(&mut behavior, BehaviorState::Sleeping, pos, &area, &mut rng);

        let mut woke = false;
        // Wake chance ramps toward certainty, so this bound is generous.
        for _ in 0..200_000 {
            step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.1);
            if behavior.state != BehaviorState::Sleeping {
                woke = true;
                break;
            }
        }
        assert!(woke, "cat slept through the whole test window");
        assert!(matches!(
            behavior.state,
            BehaviorState::Idle | BehaviorState::Walking
        ));
    }

    #[test]
    fn test_move_direction_zero_whenever_not_walking() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(0xCA7);
        let mut behavior = CatBehavior::default();
        let mut pos = Vec2::new(50.0, 50.0);

        for _ in 0..20_000 {
            step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.25);
            if behavior.state != BehaviorState::Walking {
                assert_eq!(behavior.move_direction, Vec2::ZERO);
            }
            assert!(pos.x >= area.min.x && pos.x <= area.max.x);
            assert!(pos.y >= area.min.y && pos.y <= area.max.y);
        }
    }

    #[test]
    fn test_pick_direction_steers_to_center_near_edge() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(3);
        let pos = Vec2::new(0.5, 50.0); // within the 1-unit steer margin
        let dir = pick_direction(pos, &area, &mut rng);

        let expected = (area.center() - pos).normalize();
        assert!((dir - expected).length() < 1e-4);
    }

    #[test]
    fn test_pick_direction_is_unit_length_away_from_edges() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            let dir = pick_direction(Vec2::new(50.0, 50.0), &area, &mut rng);
            assert!((dir.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let area = test_area();
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut behavior = CatBehavior::default();
            let mut pos = Vec2::new(50.0, 50.0);
            let mut trace = Vec::new();
            for _ in 0..5_000 {
                step_behavior(&mut behavior, &mut pos, &area, &mut rng, 0.25);
                trace.push((behavior.state, pos));
            }
            trace
        };

        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_transition_resets_previous_timers() {
        let area = test_area();
        let mut rng = StdRng::seed_from_u64(5);
        let mut behavior = CatBehavior::default();
        behavior.state = BehaviorState::Walking;
        behavior.direction_timer = 1.2;
        behavior.pause_timer = 3.4;
        behavior.state_timer = 5.6;

        transition_to(
            &mut behavior,
            BehaviorState::Sleeping,
            Vec2::new(50.0, 50.0),
            &area,
            &mut rng,
        );

        assert_eq!(behavior.state_timer, 0.0);
        assert_eq!(behavior.direction_timer, 0.0);
        assert_eq!(behavior.pause_timer, 0.0);
        assert_eq!(behavior.move_direction, Vec2::ZERO);
    }

    #[test]
    fn test_facing_hysteresis() {
        // Sub-epsilon movement never flips.
        assert_eq!(derive_facing(10.0, 10.0005, Facing::Left), None);
        // Real movement flips only on change.
        assert_eq!(derive_facing(10.0, 9.0, Facing::Right), Some(Facing::Left));
        assert_eq!(derive_facing(10.0, 9.0, Facing::Left), None);
        assert_eq!(derive_facing(9.0, 10.0, Facing::Left), Some(Facing::Right));
    }
}
