use core::time::Duration;
use web_time::Instant;

/// Clock that accumulates one side's active thinking time, in whole seconds.
pub trait Timer {
    fn counter(&self) -> u32;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Back to zero; a running timer keeps running.
    fn reset(&mut self);

    fn is_active(&self) -> bool;
}

/// Wall-clock [`Timer`].
#[derive(Clone, Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

impl Timer for Stopwatch {
    fn counter(&self) -> u32 {
        self.elapsed().as_secs().try_into().unwrap_or(u32::MAX)
    }

    fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }

    fn is_active(&self) -> bool {
        self.running_since.is_some()
    }
}

/// Counter advanced by an external one-second interval; ticks only count while active.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickCounter {
    counter: u32,
    active: bool,
}

impl TickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        if self.active {
            self.counter = self.counter.saturating_add(1);
        }
    }

    pub fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

impl Timer for TickCounter {
    fn counter(&self) -> u32 {
        self.counter
    }

    fn pause(&mut self) {
        self.active = false;
    }

    fn resume(&mut self) {
        self.active = true;
    }

    fn reset(&mut self) {
        self.counter = 0;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_count_while_active() {
        let mut timer = TickCounter::new();

        timer.advance(3);
        assert_eq!(timer.counter(), 0);

        timer.resume();
        timer.advance(4);
        timer.pause();
        timer.advance(10);
        timer.resume();
        timer.tick();

        assert_eq!(timer.counter(), 5);
        timer.reset();
        assert_eq!(timer.counter(), 0);
        assert!(timer.is_active());
    }

    #[test]
    fn stopwatch_holds_still_while_paused() {
        let mut watch = Stopwatch::new();
        assert!(!watch.is_active());
        assert_eq!(watch.elapsed(), Duration::ZERO);

        watch.resume();
        assert!(watch.is_active());
        watch.pause();
        let frozen = watch.elapsed();

        assert_eq!(watch.elapsed(), frozen);
        assert_eq!(watch.counter(), 0);
        watch.reset();
        assert_eq!(watch.elapsed(), Duration::ZERO);
    }
}
