//! Progress tracking and cancellation support.
//!
//! An extraction job publishes its progress through a [`ProgressHandle`]:
//! a cheaply clonable, shared view of the current and total frame counters
//! and the [`JobState`]. The worker writes, everyone else reads.
//! [`ProgressReporter`](crate::ProgressReporter) turns the handle into
//! periodic [`ProgressInfo`] snapshots delivered to a [`ProgressCallback`].
//!
//! # Example
//!
//! ```
//! use aac_extract::{JobState, ProgressHandle, percentage};
//!
//! let progress = ProgressHandle::new();
//! assert_eq!(progress.state(), JobState::NotStarted);
//! assert_eq!(progress.percentage(), -1);
//! assert_eq!(percentage(1, 3), 33);
//! ```

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

/// Lifecycle of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The job has not started extracting (or is between retry attempts).
    NotStarted,
    /// Frames are being decoded and written.
    Extracting,
    /// The job finished and produced a report.
    Succeeded,
    /// The job finished with an error.
    Failed,
}

impl JobState {
    fn to_u8(self) -> u8 {
        match self {
            JobState::NotStarted => 0,
            JobState::Extracting => 1,
            JobState::Succeeded => 2,
            JobState::Failed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => JobState::Extracting,
            2 => JobState::Succeeded,
            3 => JobState::Failed,
            _ => JobState::NotStarted,
        }
    }

    /// Returns `true` once the job has reached `Succeeded` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Completion percentage for `current` out of `total` frames, rounded to
/// the nearest integer.
///
/// Returns `-1` while `total` is zero (the total has not been computed).
pub fn percentage(current: u64, total: u64) -> i32 {
    if total == 0 {
        return -1;
    }
    ((current as f64 / total as f64) * 100.0).round() as i32
}

/// A snapshot of extraction progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames decoded and written so far, across all selected tracks.
    pub current_frame: u64,
    /// Frames expected across all selected tracks; `0` until counted.
    pub total_frames: u64,
    /// Rounded completion percentage, `-1` while the total is unknown.
    pub percentage: i32,
    /// Job state at the time of the snapshot.
    pub state: JobState,
    /// Time since extraction started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress snapshots.
///
/// Implementations must be [`Send`] and [`Sync`]; the reporter may run on
/// any thread.
pub trait ProgressCallback: Send + Sync {
    /// Called once per report interval while the job is extracting.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

#[derive(Debug)]
struct ProgressState {
    current_frame: AtomicU64,
    total_frames: AtomicU64,
    state: AtomicU8,
    started_at: Mutex<Option<Instant>>,
}

/// Shared, clonable view of a job's progress.
///
/// Every accessor is individually atomic; there is no cross-field
/// transaction. Both counters only grow during an attempt, and the current
/// frame never exceeds a non-zero total.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    inner: Arc<ProgressState>,
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandle {
    /// Create a handle with zeroed counters in [`JobState::NotStarted`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ProgressState {
                current_frame: AtomicU64::new(0),
                total_frames: AtomicU64::new(0),
                state: AtomicU8::new(JobState::NotStarted.to_u8()),
                started_at: Mutex::new(None),
            }),
        }
    }

    /// Frames written so far.
    pub fn current_frame(&self) -> u64 {
        self.inner.current_frame.load(Ordering::Acquire)
    }

    /// Total frames expected; `0` means "not yet computed".
    pub fn total_frames(&self) -> u64 {
        self.inner.total_frames.load(Ordering::Acquire)
    }

    /// Rounded completion percentage, `-1` while the total is unknown.
    pub fn percentage(&self) -> i32 {
        percentage(self.current_frame(), self.total_frames())
    }

    /// Current job state.
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns `true` while frames are being extracted.
    pub fn is_extracting(&self) -> bool {
        self.state() == JobState::Extracting
    }

    /// Take a consistent-enough snapshot for reporting.
    pub fn snapshot(&self) -> ProgressInfo {
        let current_frame = self.current_frame();
        let total_frames = self.total_frames();
        let elapsed = self
            .inner
            .started_at
            .lock()
            .ok()
            .and_then(|started| started.map(|instant| instant.elapsed()))
            .unwrap_or(Duration::ZERO);

        let estimated_remaining = if current_frame > 0 && total_frames > 0 {
            let remaining = total_frames.saturating_sub(current_frame);
            let per_frame = elapsed.as_secs_f64() / current_frame as f64;
            Some(Duration::from_secs_f64(per_frame * remaining as f64))
        } else {
            None
        };

        ProgressInfo {
            current_frame,
            total_frames,
            percentage: percentage(current_frame, total_frames),
            state: self.state(),
            elapsed,
            estimated_remaining,
        }
    }

    // ── Worker-side writers ────────────────────────────────────────────

    pub(crate) fn set_total_frames(&self, total: u64) {
        self.inner.total_frames.store(total, Ordering::Release);
    }

    /// Record one written frame.
    ///
    /// If the total was underestimated (container metadata), it is raised
    /// before the current frame so no reader sees more than 100 %.
    pub(crate) fn advance(&self) {
        let next = self.current_frame() + 1;
        let total = self.total_frames();
        if total > 0 && next > total {
            self.inner.total_frames.fetch_max(next, Ordering::AcqRel);
        }
        self.inner.current_frame.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_state(&self, state: JobState) {
        if state == JobState::Extracting
            && let Ok(mut started) = self.inner.started_at.lock()
            && started.is_none()
        {
            *started = Some(Instant::now());
        }
        self.inner.state.store(state.to_u8(), Ordering::Release);
    }

    /// Zero both counters and return to [`JobState::NotStarted`] before a
    /// retry attempt.
    pub(crate) fn reset(&self) {
        self.inner.state.store(JobState::NotStarted.to_u8(), Ordering::Release);
        self.inner.current_frame.store(0, Ordering::Release);
        self.inner.total_frames.store(0, Ordering::Release);
        if let Ok(mut started) = self.inner.started_at.lock() {
            *started = None;
        }
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. The track extractor checks the token before each
/// frame and the job checks it between tracks.
///
/// ```
/// use aac_extract::CancellationToken;
///
/// let token = CancellationToken::new();
/// let clone = token.clone();
/// token.cancel();
/// assert!(clone.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
