//! # Frame Timer
//!
//! Running per-system totals, reported as a moving average over the frames
//! counted since the last reset.

use std::time::Duration;

use parking_lot::Mutex;

/// Name of the aggregate bucket that sums every worker-thread run.
///
/// It lives among the single-threaded reports.
pub const MULTITHREADED: &str = "multithreaded";

/// Average time per frame of one system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemTime {
    /// System name.
    pub name: String,
    /// Total time divided by the number of frames.
    pub average: Duration,
}

#[derive(Debug, Default)]
struct Totals {
    frames: u32,
    single: Vec<(String, Duration)>,
    multi: Vec<(String, Duration)>,
}

fn accumulate(bucket: &mut Vec<(String, Duration)>, name: &str, elapsed: Duration) {
    match bucket.iter_mut().find(|(n, _)| n == name) {
        Some((_, total)) => *total += elapsed,
        None => bucket.push((name.to_owned(), elapsed)),
    }
}

/// Per-system timing table.
///
/// # Thread Safety
///
/// Workers record concurrently; a single mutex guards the totals.
#[derive(Debug, Default)]
pub struct FrameTimer {
    totals: Mutex<Totals>,
}

impl FrameTimer {
    /// Creates an empty timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more frame.
    pub fn start_frame(&self) {
        self.totals.lock().frames += 1;
    }

    /// Zeroes every total and the frame counter.
    pub fn reset(&self) {
        *self.totals.lock() = Totals::default();
    }

    /// Frames counted since the last reset.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.totals.lock().frames
    }

    /// Adds one run of `name`.
    ///
    /// # Arguments
    ///
    /// * `name` - System name
    /// * `elapsed` - Wall time of the run
    /// * `threaded` - Whether the run happened on a worker thread; such runs
    ///   also count toward [`MULTITHREADED`]
    pub fn record(&self, name: &str, elapsed: Duration, threaded: bool) {
        let mut totals = self.totals.lock();
        if threaded {
            accumulate(&mut totals.multi, name, elapsed);
            accumulate(&mut totals.single, MULTITHREADED, elapsed);
        } else {
            accumulate(&mut totals.single, name, elapsed);
        }
    }

    /// Averages of systems that ran inline, in first-run order.
    #[must_use]
    pub fn single_threaded(&self) -> Vec<SystemTime> {
        let totals = self.totals.lock();
        Self::report(&totals.single, totals.frames)
    }

    /// Averages of systems that ran on worker threads, in first-run order.
    #[must_use]
    pub fn multi_threaded(&self) -> Vec<SystemTime> {
        let totals = self.totals.lock();
        Self::report(&totals.multi, totals.frames)
    }

    fn report(bucket: &[(String, Duration)], frames: u32) -> Vec<SystemTime> {
        let frames = frames.max(1);
        bucket
            .iter()
            .map(|(name, total)| SystemTime {
                name: name.clone(),
                average: *total / frames,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let timer = FrameTimer::new();
        for _ in 0..4 {
            timer.start_frame();
            timer.record("physics", Duration::from_millis(10), false);
        }
        assert_eq!(timer.frames(), 4);
        assert_eq!(
            timer.single_threaded(),
            vec![SystemTime {
                name: "physics".into(),
                average: Duration::from_millis(10)
            }]
        );
        assert!(timer.multi_threaded().is_empty());
    }

    #[test]
    fn test_threaded_runs_feed_aggregate() {
        let timer = FrameTimer::new();
        timer.start_frame();
        timer.start_frame();
        timer.record("ai", Duration::from_millis(6), true);
        timer.record("path", Duration::from_millis(2), true);

        let multi = timer.multi_threaded();
        assert_eq!(multi.len(), 2);
        assert_eq!(multi[0].average, Duration::from_millis(3));

        let single = timer.single_threaded();
        assert_eq!(single[0].name, MULTITHREADED);
        assert_eq!(single[0].average, Duration::from_millis(4));
    }

    #[test]
    fn test_reset_and_zero_frames() {
        let timer = FrameTimer::new();
        timer.record("x", Duration::from_millis(5), false);
        // no frame started yet
        assert_eq!(timer.single_threaded()[0].average, Duration::from_millis(5));

        timer.start_frame();
        timer.reset();
        assert_eq!(timer.frames(), 0);
        assert!(timer.single_threaded().is_empty());
    }
}
