pub type SlotId = usize;

pub const PLAYER_SLOT: SlotId = 0;

pub fn pursuer_slot(pursuer_idx: usize) -> SlotId {
    pursuer_idx + 1
}

#[derive(Clone, Copy, Debug)]
struct CadenceSlot {
    cadence_ms: u64,
    since_last_step_ms: u64,
}

/// Turns wall-clock deltas into discrete steps, one accumulator per agent.
///
/// A due step subtracts one cadence from the accumulator instead of clearing
/// it, so the remainder carries into the next tick and an agent's long-run
/// step rate matches its cadence whatever the tick jitter.
#[derive(Clone, Debug, Default)]
pub struct MovementScheduler {
    slots: Vec<CadenceSlot>,
}

impl MovementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slot(&mut self, cadence_ms: u64) -> SlotId {
        self.slots.push(CadenceSlot {
            cadence_ms: cadence_ms.max(1),
            since_last_step_ms: 0,
        });
        self.slots.len() - 1
    }

    /// Changing cadence keeps the accumulated time.
    pub fn set_cadence(&mut self, slot: SlotId, cadence_ms: u64) {
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.cadence_ms = cadence_ms.max(1);
        }
    }

    pub fn cadence_ms(&self, slot: SlotId) -> Option<u64> {
        self.slots.get(slot).map(|entry| entry.cadence_ms)
    }

    pub fn pending_ms(&self, slot: SlotId) -> Option<u64> {
        self.slots.get(slot).map(|entry| entry.since_last_step_ms)
    }

    pub fn advance(&mut self, dt_ms: u64) {
        for entry in &mut self.slots {
            entry.since_last_step_ms = entry.since_last_step_ms.saturating_add(dt_ms);
        }
    }

    /// Pays out one owed step for `slot`, if any. Callers loop until every
    /// slot is settled, so a long delta becomes several interleaved steps and
    /// nothing owed is ever dropped.
    pub fn take_step(&mut self, slot: SlotId) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };
        if entry.since_last_step_ms < entry.cadence_ms {
            return false;
        }
        entry.since_last_step_ms -= entry.cadence_ms;
        true
    }

    pub fn reset(&mut self, slot: SlotId) {
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.since_last_step_ms = 0;
        }
    }

    pub fn reset_all(&mut self) {
        for entry in &mut self.slots {
            entry.since_last_step_ms = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut MovementScheduler, slot: SlotId) -> u32 {
        let mut steps = 0;
        while scheduler.take_step(slot) {
            steps += 1;
        }
        steps
    }

    #[test]
    fn remainder_carries_over_between_ticks() {
        let mut scheduler = MovementScheduler::new();
        let slot = scheduler.add_slot(150);

        scheduler.advance(100);
        assert!(!scheduler.take_step(slot));
        scheduler.advance(100);
        assert!(scheduler.take_step(slot));
        assert!(!scheduler.take_step(slot));
        assert_eq!(scheduler.pending_ms(slot), Some(50));
        scheduler.advance(100);
        assert!(scheduler.take_step(slot));
        assert_eq!(scheduler.pending_ms(slot), Some(0));
    }

    #[test]
    fn step_rate_is_exact_under_jittery_ticks() {
        let mut scheduler = MovementScheduler::new();
        let slot = scheduler.add_slot(150);
        let deltas = [17u64, 33, 16, 50, 49, 1, 34, 100, 16, 17];
        let mut total_ms = 0;
        let mut steps = 0;
        for _ in 0..30 {
            for dt in deltas {
                scheduler.advance(dt);
                total_ms += dt;
                steps += drain(&mut scheduler, slot);
            }
        }
        assert_eq!(steps as u64, total_ms / 150);
        assert_eq!(scheduler.pending_ms(slot), Some(total_ms % 150));
    }

    #[test]
    fn agents_keep_independent_cadences() {
        let mut scheduler = MovementScheduler::new();
        let fast = scheduler.add_slot(150);
        let slow = scheduler.add_slot(250);
        let mut fast_steps = 0;
        let mut slow_steps = 0;
        for _ in 0..60 {
            scheduler.advance(50);
            fast_steps += drain(&mut scheduler, fast);
            slow_steps += drain(&mut scheduler, slow);
        }
        assert_eq!(fast_steps, 20);
        assert_eq!(slow_steps, 12);
    }

    #[test]
    fn cadence_change_keeps_accumulated_time() {
        let mut scheduler = MovementScheduler::new();
        let slot = scheduler.add_slot(180);
        scheduler.advance(120);
        scheduler.set_cadence(slot, 100);
        assert_eq!(drain(&mut scheduler, slot), 1);
        assert_eq!(scheduler.pending_ms(slot), Some(20));
    }

    #[test]
    fn huge_delta_is_paid_out_in_full() {
        let mut scheduler = MovementScheduler::new();
        let player = scheduler.add_slot(150);
        scheduler.advance(1_000);
        assert_eq!(drain(&mut scheduler, player), 6);
        assert_eq!(scheduler.pending_ms(player), Some(100));

        let slot = scheduler.add_slot(100);
        scheduler.advance(10_050);
        assert_eq!(drain(&mut scheduler, slot), 100);
        assert_eq!(scheduler.pending_ms(slot), Some(50));
    }

    #[test]
    fn reset_clears_accumulators() {
        let mut scheduler = MovementScheduler::new();
        let a = scheduler.add_slot(100);
        let b = scheduler.add_slot(100);
        scheduler.advance(90);
        scheduler.reset(a);
        assert_eq!(scheduler.pending_ms(a), Some(0));
        assert_eq!(scheduler.pending_ms(b), Some(90));
        scheduler.reset_all();
        assert_eq!(scheduler.pending_ms(b), Some(0));
        assert!(!scheduler.take_step(99));
    }

    #[test]
    fn slot_ids_follow_roster_order() {
        let mut scheduler = MovementScheduler::new();
        assert_eq!(scheduler.add_slot(150), PLAYER_SLOT);
        assert_eq!(scheduler.add_slot(180), pursuer_slot(0));
        assert_eq!(scheduler.cadence_ms(pursuer_slot(0)), Some(180));
    }
}
