use std::time::Duration;

pub const REJECT_AFTER_TIME: Duration = Duration::from_secs(180);
pub const REKEY_ATTEMPT_TIME: Duration = Duration::from_secs(90);
pub const REKEY_TIMEOUT: Duration = Duration::from_secs(5);
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

// Semantics:
// Upper bound (exclusive) on the random delay added to handshake retransmissions
pub const REKEY_TIMEOUT_JITTER_MAX_MS: u64 = 334;

pub const MAX_TIMER_HANDSHAKES: usize =
    (REKEY_ATTEMPT_TIME.as_secs() / REKEY_TIMEOUT.as_secs()) as usize;

// Semantics:
// Delay after which an idle session with no fresh handshake has its keys erased
pub const ZERO_KEY_MATERIAL_TIMEOUT: Duration = Duration::from_secs(REJECT_AFTER_TIME.as_secs() * 3);

// Semantics:
// Largest persistent keepalive interval accepted by the configuration interface
pub const MAX_PERSISTENT_KEEPALIVE_INTERVAL: u64 = u16::MAX as u64;

// Semantics:
// Longest possible duration of any WireGuard timer
pub const TIMER_MAX_DURATION: Duration = ZERO_KEY_MATERIAL_TIMEOUT;

// Semantics:
// Resolution of the timer-wheel
pub const TIMERS_TICK: Duration = Duration::from_millis(100);

// Semantics:
// Resulting number of slots in the wheel
pub const TIMERS_SLOTS: usize = (TIMER_MAX_DURATION.as_micros() / TIMERS_TICK.as_micros()) as usize;

// Performance:
// Initial capacity of timer-wheel (grows to accommodate more timers).
pub const TIMERS_CAPACITY: usize = 16;
