//! Offline reconciliation — compresses the wall-clock gap since the last save
//! into one bounded adjustment, using the same per-unit rates as the live sim.
//!
//! Production credit is granted per whole 10-minute offline cycle and capped
//! at one hour's worth; decay is uncapped and can legitimately drain
//! happiness to zero after a long absence.

use crate::shared::*;

/// Replay `elapsed_seconds` of away time into the tower and the happiness
/// meter. Runs exactly once per load, before live ticking resumes.
pub fn reconcile_offline(
    tower: &mut Tower,
    happiness: &mut Happiness,
    elapsed_seconds: u64,
) -> ReconcileSummary {
    let elapsed_minutes = elapsed_seconds as f64 / 60.0;

    let chur_credited = offline_production(tower.production_amount(), elapsed_minutes);
    tower.chur_count = tower.chur_count.saturating_add(chur_credited);

    let before = happiness.value;
    let decay = (elapsed_minutes / 60.0) as f32 * happiness.decay_per_hour;
    happiness.value = (happiness.value - decay).clamp(0.0, happiness.max);

    ReconcileSummary {
        offline_seconds: elapsed_seconds,
        chur_credited,
        happiness_lost: before - happiness.value,
    }
}

/// Whole offline cycles only: below one cycle nothing is credited. The
/// fractional cycle in progress at save time lives on in `productionTimer`
/// and is not re-credited here, so a quick save/load round-trip changes
/// nothing.
pub fn offline_production(production_amount: u32, elapsed_minutes: f64) -> u32 {
    let cycles = elapsed_minutes / OFFLINE_CYCLE_MINUTES;
    if cycles < 1.0 {
        return 0;
    }
    let raw = (cycles * production_amount as f64).floor() as u64;
    let cap = (production_amount * MAX_OFFLINE_CYCLES) as u64;
    raw.min(cap) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_65_minutes_at_level_1_hits_the_cap_exactly() {
        let mut tower = Tower::default();
        let mut happiness = Happiness::default();
        let summary = reconcile_offline(&mut tower, &mut happiness, 65 * 60);

        // 6.5 cycles × 2/cycle floors to 13, capped at one hour's 12.
        assert_eq!(summary.chur_credited, 12);
        assert_eq!(tower.chur_count, 12);
    }

    #[test]
    fn test_below_one_cycle_credits_nothing() {
        let mut tower = Tower::default();
        let mut happiness = Happiness::default();
        let summary = reconcile_offline(&mut tower, &mut happiness, 5 * 60);

        assert_eq!(summary.chur_credited, 0);
        assert_eq!(tower.chur_count, 0);
    }

    #[test]
    fn test_exactly_one_cycle_credits_one_batch() {
        assert_eq!(offline_production(2, 10.0), 2);
        assert_eq!(offline_production(2, 9.999), 0);
    }

    #[test]
    fn test_cap_scales_with_production_amount() {
        // Level 3 produces 4 per cycle; a day away still caps at an hour.
        assert_eq!(offline_production(4, 24.0 * 60.0), 4 * MAX_OFFLINE_CYCLES);
    }

    #[test]
    fn test_decay_is_uncapped_and_clamps_at_zero() {
        let mut tower = Tower::default();
        let mut happiness = Happiness::default();
        // Three days away at 10/hour wants 720 happiness; the meter floors.
        let summary = reconcile_offline(&mut tower, &mut happiness, 3 * 24 * 3_600);

        assert_eq!(happiness.value, 0.0);
        assert_eq!(summary.happiness_lost, 100.0);
        // Production still capped at one hour's worth.
        assert_eq!(summary.chur_credited, 12);
    }

    #[test]
    fn test_one_hour_decays_the_hourly_rate() {
        let mut tower = Tower::default();
        let mut happiness = Happiness::default();
        reconcile_offline(&mut tower, &mut happiness, 3_600);

        assert!((happiness.value - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_elapsed_changes_nothing() {
        let mut tower = Tower {
            level: 2,
            chur_count: 7,
            production_timer: 4.2,
        };
        let mut happiness = Happiness {
            value: 61.5,
            ..Default::default()
        };
        let summary = reconcile_offline(&mut tower, &mut happiness, 0);

        assert_eq!(summary, ReconcileSummary::default());
        assert_eq!(tower.chur_count, 7);
        assert!((tower.production_timer - 4.2).abs() < 1e-6);
        assert!((happiness.value - 61.5).abs() < 1e-6);
    }

    #[test]
    fn test_credit_follows_the_current_level() {
        let mut tower = Tower {
            level: 2,
            chur_count: 0,
            production_timer: 0.0,
        };
        let mut happiness = Happiness::default();
        // 30 minutes = 3 cycles × 3/cycle at level 2.
        let summary = reconcile_offline(&mut tower, &mut happiness, 30 * 60);

        assert_eq!(summary.chur_credited, 9);
    }
}
