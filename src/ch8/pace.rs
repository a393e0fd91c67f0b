use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

pub const FRAME_RATE: u32 = 60;
pub const FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / FRAME_RATE as u64);

// lagging further than this many frames drops the backlog instead of catching up
const MAX_FRAME_LAG: u32 = 4;

const FRAME_TOLERANCE_DIVISOR: u32 = 16;

// targets at or above this are throttled to what the host can actually keep up with
pub const ADAPTIVE_THROTTLE_THRESHOLD: u32 = 1_000_000;
pub const DEFAULT_THROTTLE_DIVISOR: f64 = 4.0;

pub trait Clock {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    fn park(&self, duration: Duration);
}

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn park(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}

/// Synthetic clock for tests and headless runs. Parking advances time instantly.
#[derive(Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    fn park(&self, duration: Duration) {
        self.advance(duration);
    }
}

pub struct FrameLimiter<C: Clock> {
    clock: C,
    frame_duration: Duration,
    next_frame: Duration,
}

impl<C: Clock> FrameLimiter<C> {
    pub fn new(clock: C, frame_duration: Duration) -> Self {
        let next_frame = clock.now();
        FrameLimiter {
            clock,
            frame_duration,
            next_frame,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// True when a frame is due. The deadline advances by exactly one frame so early or late
    /// arrivals carry into the next deadline. Arrivals up to a sixteenth of a frame early count.
    pub fn is_valid_frame(&mut self) -> bool {
        let now = self.clock.now();
        if now + self.frame_duration / FRAME_TOLERANCE_DIVISOR < self.next_frame {
            return false;
        }

        let lag = now.saturating_sub(self.next_frame);
        if lag >= self.frame_duration * MAX_FRAME_LAG {
            log::warn!(
                "Fell {} us behind, resynchronizing frame deadline",
                lag.as_micros()
            );
            self.next_frame = now + self.frame_duration;
        } else {
            self.next_frame += self.frame_duration;
        }

        true
    }

    /// Time left until the next frame is due
    pub fn remaining(&self) -> Duration {
        self.next_frame.saturating_sub(self.clock.now())
    }

    /// Parks until a frame is due and consumes it
    pub fn wait_for_frame(&mut self) {
        loop {
            if self.is_valid_frame() {
                return;
            }
            self.clock.park(self.remaining());
        }
    }
}

/// Scales the per frame instruction budget down when the host overruns its frame budget
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Throttle {
    target: u32,
    effective: u32,
    divisor: f64,
}

impl Throttle {
    pub fn new(target: u32, divisor: f64) -> Self {
        let target = target.max(1);
        Throttle {
            target,
            effective: target,
            divisor: if divisor > 0.0 {
                divisor
            } else {
                DEFAULT_THROTTLE_DIVISOR
            },
        }
    }

    pub fn is_adaptive(&self) -> bool {
        self.target >= ADAPTIVE_THROTTLE_THRESHOLD
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn effective(&self) -> u32 {
        self.effective
    }

    /// `elapsed` is how long the last frame's work took against a budget of `frame_duration`
    pub fn update(&mut self, elapsed: Duration, frame_duration: Duration) {
        if !self.is_adaptive() {
            return;
        }

        let overrun = elapsed.as_secs_f64() - frame_duration.as_secs_f64();
        let correction = overrun / frame_duration.as_secs_f64() * self.target as f64 / self.divisor;
        let effective = (self.effective as f64 - correction).clamp(1.0, self.target as f64);

        if overrun > 0.0 {
            log::trace!(
                "Overran frame by {} us, throttling to {} instructions",
                (overrun * 1e6) as u64,
                effective as u32
            );
        }

        self.effective = effective as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_clock_yields_one_frame_per_period() {
        let clock = ManualClock::default();
        let mut limiter = FrameLimiter::new(clock.clone(), FRAME_DURATION);

        assert!(limiter.is_valid_frame());
        for _ in 0..600 {
            assert!(!limiter.is_valid_frame());
            clock.advance(FRAME_DURATION);
            assert!(limiter.is_valid_frame());
        }

        assert_eq!(clock.now(), FRAME_DURATION * 600);
        assert_eq!(limiter.remaining(), FRAME_DURATION);
    }

    #[test]
    fn rounded_down_period_never_skips_a_frame() {
        let clock = ManualClock::default();
        let mut limiter = FrameLimiter::new(clock.clone(), FRAME_DURATION);

        // 16.666 ms falls a little short of the 16.666666 ms period every frame
        assert!(limiter.is_valid_frame());
        for _ in 0..600 {
            clock.advance(Duration::from_micros(16_666));
            assert!(limiter.is_valid_frame());
            assert!(!limiter.is_valid_frame());
        }
    }

    #[test]
    fn late_arrival_carries_into_next_deadline() {
        let clock = ManualClock::default();
        let mut limiter = FrameLimiter::new(clock.clone(), Duration::from_millis(10));
        assert!(limiter.is_valid_frame());

        clock.advance(Duration::from_millis(13));
        assert!(limiter.is_valid_frame());
        assert_eq!(limiter.remaining(), Duration::from_millis(7));
    }

    #[test]
    fn large_lag_resynchronizes() {
        let clock = ManualClock::default();
        let mut limiter = FrameLimiter::new(clock.clone(), Duration::from_millis(10));
        assert!(limiter.is_valid_frame());

        clock.advance(Duration::from_millis(500));
        assert!(limiter.is_valid_frame());
        assert!(!limiter.is_valid_frame());
        assert_eq!(limiter.remaining(), Duration::from_millis(10));
    }

    #[test]
    fn waiting_parks_until_due() {
        let clock = ManualClock::default();
        let mut limiter = FrameLimiter::new(clock.clone(), FRAME_DURATION);
        limiter.wait_for_frame();
        limiter.wait_for_frame();
        limiter.wait_for_frame();
        assert_eq!(clock.now(), FRAME_DURATION * 2);
    }

    #[test]
    fn throttle_only_applies_to_huge_targets() {
        let mut throttle = Throttle::new(1000, 4.0);
        throttle.update(FRAME_DURATION * 3, FRAME_DURATION);
        assert_eq!(throttle.effective(), 1000);
    }

    #[test]
    fn throttle_backs_off_and_recovers() {
        let mut throttle = Throttle::new(2_000_000, 4.0);

        // one full frame of overrun removes a quarter of the target
        throttle.update(FRAME_DURATION * 2, FRAME_DURATION);
        assert!((throttle.effective() as i64 - 1_500_000).abs() <= 1);

        // idle frames grow the budget back, never past the target
        for _ in 0..10 {
            throttle.update(Duration::ZERO, FRAME_DURATION);
        }
        assert_eq!(throttle.effective(), 2_000_000);

        for _ in 0..100 {
            throttle.update(FRAME_DURATION * 100, FRAME_DURATION);
        }
        assert_eq!(throttle.effective(), 1);
    }
}
