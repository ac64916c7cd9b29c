use std::path::PathBuf;
use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames should animate continuously,
/// be evaluated at a fixed timestamp, or be exported to disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Show a single frame evaluated at a fixed timestamp.
    Still {
        /// Timeline timestamp to evaluate, in seconds.
        time: f64,
    },
    /// Render one frame at a timestamp and write it to disk as PNG.
    Export {
        /// Timeline timestamp to evaluate, in seconds.
        time: f64,
        /// Destination path for the exported file.
        path: PathBuf,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Snapshot of the time state supplied to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f64,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f64, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f64(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f64,
}

impl FixedTimeSource {
    /// Constructs a fixed time source that always returns the provided time.
    pub fn new(time: f64) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } | RenderPolicy::Export { time, .. } => {
            Box::new(FixedTimeSource::new(*time))
        }
    }
}

/// Paces continuous redraws to an optional frames-per-second cap.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    /// Creates a pacer; `None` or a non-positive cap means uncapped.
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            next_deadline: None,
        }
    }

    /// True when the next frame may be rendered at `now`.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.next_deadline) {
            (None, _) | (_, None) => true,
            (Some(_), Some(deadline)) => now >= deadline,
        }
    }

    /// Records a rendered frame and schedules the next deadline.
    pub fn mark_rendered(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_deadline = Some(now + interval);
        }
    }

    /// Instant the event loop should wake at, when a cap is active.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }
}
