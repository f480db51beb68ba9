//! Push rate limiting for the audio tap.

/// Selects which tap callbacks turn into pipeline pushes.
///
/// The counter increments on every call and fires, resetting to zero, once
/// it reaches `callback_rate / push_frequency`. The effective stride is
/// therefore `max(1, ceil(callback_rate / push_frequency))` calls.
#[derive(Debug, Clone)]
pub struct PushRateLimiter {
    threshold: f32,
    counter: f32,
    calls: u64,
    accepted: u64,
}

impl PushRateLimiter {
    pub fn new(push_frequency: f32, callback_rate: f32) -> Self {
        let threshold = if push_frequency > 0.0 {
            callback_rate / push_frequency
        } else {
            f32::INFINITY
        };
        Self {
            threshold,
            counter: 0.0,
            calls: 0,
            accepted: 0,
        }
    }

    /// Register a tap call; `true` when this call should push.
    pub fn tick(&mut self) -> bool {
        self.calls += 1;
        self.counter += 1.0;
        if self.counter < self.threshold {
            return false;
        }
        self.counter = 0.0;
        self.accepted += 1;
        true
    }

    /// Calls between two accepted pushes.
    pub fn stride(&self) -> u64 {
        if !self.threshold.is_finite() {
            return u64::MAX;
        }
        (self.threshold.ceil() as u64).max(1)
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn reset(&mut self) {
        self.counter = 0.0;
        self.calls = 0;
        self.accepted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted_over(limiter: &mut PushRateLimiter, calls: usize) -> usize {
        (0..calls).filter(|_| limiter.tick()).count()
    }

    #[test]
    fn test_faster_target_than_callbacks_pushes_every_call() {
        // 44 callbacks/s can never reach 50 pushes/s: every call pushes.
        let mut limiter = PushRateLimiter::new(50.0, 44.0);
        assert_eq!(limiter.stride(), 1);
        assert_eq!(accepted_over(&mut limiter, 100), 100);
    }

    #[test]
    fn test_integer_ratio() {
        let mut limiter = PushRateLimiter::new(11.0, 44.0);
        assert_eq!(limiter.stride(), 4);
        assert_eq!(accepted_over(&mut limiter, 100), 25);
        assert_eq!(limiter.calls(), 100);
        assert_eq!(limiter.accepted(), 25);
    }

    #[test]
    fn test_fractional_ratio_rounds_up() {
        // 44 / 20 = 2.2 calls per push: every third call fires.
        let mut limiter = PushRateLimiter::new(20.0, 44.0);
        assert_eq!(limiter.stride(), 3);
        assert_eq!(accepted_over(&mut limiter, 99), 33);
    }

    #[test]
    fn test_zero_frequency_never_pushes() {
        let mut limiter = PushRateLimiter::new(0.0, 44.0);
        assert_eq!(accepted_over(&mut limiter, 10), 0);
    }
}
