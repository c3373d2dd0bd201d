use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Monotonic-time and wall-clock source, injected so tests can substitute a
/// fixed or steppable clock instead of `Instant`/`SystemTime` directly.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> std::time::Instant;
    fn unix_now(&self) -> Duration;
}

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn unix_now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Current wall-clock time as Unix seconds. Convenience wrapper around
/// `SystemClock` for call sites that don't carry a clock handle.
pub fn unix_now_secs() -> u64 {
    SystemClock.unix_now().as_secs()
}
