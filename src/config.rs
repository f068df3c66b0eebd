//! Extraction options.
//!
//! [`ExtractOptions`] threads progress callbacks, cancellation and tuning
//! settings through the job without widening every signature.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use aac_extract::{CancellationToken, ExtractOptions, FrameCountMode, ProgressCallback, ProgressInfo};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}%", info.percentage);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_report_interval(Duration::from_millis(500))
//!     .with_frame_count_mode(FrameCountMode::Metadata);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default time between progress reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// How the progress denominator is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCountMode {
    /// Read every frame of the selected tracks once, then rewind.
    #[default]
    Scan,
    /// Use the frame counts recorded in the container, scanning only
    /// tracks that do not record one.
    Metadata,
}

/// Options for an extraction job.
///
/// A default-constructed value reports nothing, never cancels, scans for
/// frame counts and retries for as long as the operator agrees.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) report_interval: Duration,
    pub(crate) frame_count_mode: FrameCountMode,
    pub(crate) max_attempts: Option<NonZeroU32>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("report_interval", &self.report_interval)
            .field("frame_count_mode", &self.frame_count_mode)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
            frame_count_mode: FrameCountMode::Scan,
            max_attempts: None,
        }
    }

    /// Attach a progress callback, invoked by the reporter once per
    /// report interval.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the time between progress reports. Clamped to at least 10 ms.
    #[must_use]
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval.max(Duration::from_millis(10));
        self
    }

    /// Choose how the total frame count is established.
    #[must_use]
    pub fn with_frame_count_mode(mut self, mode: FrameCountMode) -> Self {
        self.frame_count_mode = mode;
        self
    }

    /// Cap the number of attempts, regardless of the operator's answer.
    ///
    /// `0` is treated as 1.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = NonZeroU32::new(attempts.max(1));
        self
    }

    /// Report interval used by [`ProgressReporter`](crate::ProgressReporter).
    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Returns `true` if another attempt may follow attempt number `attempt`.
    pub(crate) fn allows_attempt_after(&self, attempt: u32) -> bool {
        self.max_attempts
            .is_none_or(|limit| attempt < limit.get())
    }
}
