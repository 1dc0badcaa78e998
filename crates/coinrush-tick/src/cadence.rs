//! A cancellable repeating timer driven by simulated time.

use std::time::Duration;

/// Fires every `interval` of advanced time while running.
///
/// `Cadence` never looks at the wall clock. The owner feeds it the same
/// fixed `dt` it uses for the rest of the simulation, so a paused or
/// overloaded server never produces a burst of firings on resume.
///
/// ```
/// use std::time::Duration;
/// use coinrush_tick::Cadence;
///
/// let mut cadence = Cadence::new(Duration::from_secs(1));
/// assert_eq!(cadence.start(), 1); // fires immediately
/// assert_eq!(cadence.advance(Duration::from_millis(2500)), 2);
/// cadence.cancel();
/// assert_eq!(cadence.advance(Duration::from_secs(10)), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    elapsed: Duration,
    running: bool,
}

impl Cadence {
    /// Creates a stopped cadence.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Starts (or restarts) the cadence and returns the number of firings
    /// due right now, which is always one: the first firing has no delay.
    pub fn start(&mut self) -> u32 {
        self.running = true;
        self.elapsed = Duration::ZERO;
        1
    }

    /// Advances by `dt` and returns how many intervals completed.
    ///
    /// Returns 0 when stopped or when the interval is zero.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if !self.running || self.interval.is_zero() {
            return 0;
        }
        self.elapsed += dt;
        let mut fired = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            fired += 1;
        }
        fired
    }

    /// Stops the cadence. Further calls to [`advance`](Self::advance)
    /// return 0 until it is started again. Idempotent.
    pub fn cancel(&mut self) {
        self.running = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
