use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How long remote calls stay suppressed after the breaker opens.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct CircuitState {
    is_open: bool,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Counts consecutive failed fetches and stops remote calls for a cooldown
/// once the retry ceiling is hit. Only the refresh path touches it.
#[derive(Debug)]
pub struct CircuitBreaker {
    cooldown: Duration,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: Mutex::new(CircuitState::default()),
        }
    }

    /// Whether a remote call may go out now. An open breaker whose cooldown
    /// has elapsed closes again with a zeroed failure count.
    pub fn allow_request(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_open {
            return true;
        }
        let cooled_down = state
            .last_failure
            .map_or(true, |at| at.elapsed() >= self.cooldown);
        if cooled_down {
            state.is_open = false;
            state.failure_count = 0;
        }
        cooled_down
    }

    /// Counts a failure and returns `true` if it opened the breaker.
    pub fn record_failure(&self, max_failures: u32) -> bool {
        let mut state = self.state.lock();
        state.failure_count += 1;
        if state.failure_count >= max_failures {
            state.is_open = true;
            state.last_failure = Some(Instant::now());
            return true;
        }
        false
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.is_open = false;
        state.failure_count = 0;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
