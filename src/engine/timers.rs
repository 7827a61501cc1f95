/// Countdown advanced explicitly by logic ticks. Nothing fires on its own, so
/// a paused session (no ticks) freezes every countdown exactly where it was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining_ms: u64,
    armed: bool,
}

impl Countdown {
    pub fn start(&mut self, duration_ms: u64) {
        self.remaining_ms = duration_ms;
        self.armed = true;
    }

    pub fn cancel(&mut self) {
        self.remaining_ms = 0;
        self.armed = false;
    }

    pub fn is_active(&self) -> bool {
        self.armed
    }

    pub fn remaining_ms(&self) -> u64 {
        if self.armed {
            self.remaining_ms
        } else {
            0
        }
    }

    /// Returns true on the tick the countdown runs out.
    pub fn tick(&mut self, dt_ms: u64) -> bool {
        if !self.armed {
            return false;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(dt_ms);
        if self.remaining_ms == 0 {
            self.armed = false;
            return true;
        }
        false
    }
}

/// The single frightened-mode countdown shared by every pursuer.
#[derive(Clone, Copy, Debug, Default)]
pub struct PowerModeTimer {
    countdown: Countdown,
}

impl PowerModeTimer {
    /// Arms the countdown, replacing whatever was left of a previous one.
    pub fn start(&mut self, duration_ms: u64) {
        self.countdown.start(duration_ms);
    }

    pub fn cancel(&mut self) {
        self.countdown.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.countdown.is_active()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.countdown.remaining_ms()
    }

    pub fn tick(&mut self, dt_ms: u64) -> bool {
        self.countdown.tick(dt_ms)
    }
}
