use std::time::Duration;

use hjul::{Runner, Timer};
use spin::Mutex;

use super::constants::*;
use super::types::{Deferred, Scheduler};

/// Scheduler backed by a hashed timer-wheel,
/// all expirations are dispatched from the wheel's own thread.
pub struct Wheel {
    runner: Mutex<Runner>,
}

impl Wheel {
    pub fn new() -> Wheel {
        Wheel {
            runner: Mutex::new(Runner::new(TIMERS_TICK, TIMERS_SLOTS, TIMERS_CAPACITY)),
        }
    }
}

impl Default for Wheel {
    fn default() -> Self {
        Self::new()
    }
}

impl Deferred for Timer {
    fn reset(&self, duration: Duration) {
        Timer::reset(self, duration);
    }

    fn cancel(&self) {
        self.stop();
    }
}

impl Scheduler for Wheel {
    fn schedule_once(
        &self,
        duration: Duration,
        callback: Box<dyn Fn() + Send + Sync>,
    ) -> Box<dyn Deferred> {
        let timer = self.runner.lock().timer(move || callback());
        timer.reset(duration);
        Box::new(timer)
    }
}
