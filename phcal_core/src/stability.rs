//! Stability detection strategies.
//!
//! Both strategies consume one reading per `update` and report a `Verdict`.
//! `Verdict::Stable` is emitted exactly once per stable run, on the update
//! where the fire condition becomes true; later updates that keep the run
//! alive report `Counting`. Breaking the run resets the counter to 0 and
//! re-arms the detector.

use crate::stats::StatsWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// The latest update broke the run; the counter is 0.
    Unstable,
    /// Still counting towards the target.
    Counting { count: u32, required: u32 },
    /// Fire: the target was reached on this update.
    Stable,
}

/// Statistics of the most recently completed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub stddev: f64,
    pub stable: bool,
}

pub trait StabilityStrategy {
    fn update(&mut self, ph: f64) -> Verdict;
    /// Forget all readings and counters.
    fn reset(&mut self);
    /// Current consecutive count (matches or stable windows).
    fn count(&self) -> u32;
    /// Count at which the detector fires.
    fn required(&self) -> u32;
    /// Last evaluated window, if the strategy works on windows.
    fn last_window(&self) -> Option<WindowStats> {
        None
    }
    fn name(&self) -> &'static str;
}

/// Fires when `repeat_count` consecutive readings are bit-identical.
///
/// The counter holds consecutive matches with the previous reading, so it
/// fires at `repeat_count - 1` matches.
#[derive(Debug, Clone)]
pub struct ExactRepeat {
    repeat_count: u32,
    last_bits: Option<u64>,
    matches: u32,
    fired: bool,
}

impl ExactRepeat {
    pub fn new(repeat_count: u32) -> Self {
        Self {
            repeat_count: repeat_count.max(2),
            last_bits: None,
            matches: 0,
            fired: false,
        }
    }
}

impl StabilityStrategy for ExactRepeat {
    fn update(&mut self, ph: f64) -> Verdict {
        let bits = ph.to_bits();
        if self.last_bits == Some(bits) {
            self.matches = self.matches.saturating_add(1);
        } else {
            self.last_bits = Some(bits);
            self.matches = 0;
            self.fired = false;
            return Verdict::Unstable;
        }
        let required = self.required();
        if self.matches >= required && !self.fired {
            self.fired = true;
            return Verdict::Stable;
        }
        Verdict::Counting {
            count: self.matches,
            required,
        }
    }

    fn reset(&mut self) {
        self.last_bits = None;
        self.matches = 0;
        self.fired = false;
    }

    fn count(&self) -> u32 {
        self.matches
    }

    fn required(&self) -> u32 {
        self.repeat_count - 1
    }

    fn name(&self) -> &'static str {
        "exact-repeat"
    }
}

/// Evaluates every full, non-overlapping window of W readings and fires after
/// `required_windows` consecutive windows with stddev below the threshold.
#[derive(Debug, Clone)]
pub struct Windowed {
    window: StatsWindow,
    since_boundary: usize,
    threshold_ph: f64,
    required_windows: u32,
    stable_windows: u32,
    fired: bool,
    last: Option<WindowStats>,
}

impl Windowed {
    pub fn new(window: usize, threshold_ph: f64, required_windows: u32) -> Self {
        Self {
            window: StatsWindow::new(window),
            since_boundary: 0,
            threshold_ph,
            required_windows: required_windows.max(1),
            stable_windows: 0,
            fired: false,
            last: None,
        }
    }

    pub fn threshold_ph(&self) -> f64 {
        self.threshold_ph
    }

    fn counting(&self) -> Verdict {
        Verdict::Counting {
            count: self.stable_windows,
            required: self.required_windows,
        }
    }
}

impl StabilityStrategy for Windowed {
    fn update(&mut self, ph: f64) -> Verdict {
        self.window.push(ph);
        self.since_boundary += 1;
        if self.since_boundary < self.window.capacity() {
            return self.counting();
        }
        self.since_boundary = 0;

        let (Some(mean), Some(stddev)) = (self.window.mean(), self.window.stddev()) else {
            return self.counting();
        };
        let stable = stddev < self.threshold_ph;
        self.last = Some(WindowStats {
            mean,
            stddev,
            stable,
        });
        tracing::debug!(mean, stddev, stable, "window evaluated");

        if !stable {
            self.stable_windows = 0;
            self.fired = false;
            return Verdict::Unstable;
        }
        self.stable_windows = self.stable_windows.saturating_add(1);
        if self.stable_windows >= self.required_windows && !self.fired {
            self.fired = true;
            return Verdict::Stable;
        }
        self.counting()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.since_boundary = 0;
        self.stable_windows = 0;
        self.fired = false;
        self.last = None;
    }

    fn count(&self) -> u32 {
        self.stable_windows
    }

    fn required(&self) -> u32 {
        self.required_windows
    }

    fn last_window(&self) -> Option<WindowStats> {
        self.last
    }

    fn name(&self) -> &'static str {
        "windowed"
    }
}
