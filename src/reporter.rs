//! Periodic progress reporting.
//!
//! [`ProgressReporter::watch`] runs on the thread waiting for a job. It
//! blocks on the job's outcome channel with the report interval as timeout;
//! every timeout while the job is extracting produces one
//! [`ProgressInfo`](crate::ProgressInfo) for the callback. Reporting stops
//! at 100 %, and the call returns as soon as the outcome arrives.

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::{
    config::DEFAULT_REPORT_INTERVAL,
    progress::{ProgressCallback, ProgressHandle},
};

/// Polls a [`ProgressHandle`] at a fixed interval.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Arc<dyn ProgressCallback>,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter with the default one-second interval.
    pub fn new(callback: Arc<dyn ProgressCallback>) -> Self {
        Self {
            callback,
            interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Set the time between reports.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Time between reports.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Report `progress` until a value arrives on `outcome`.
    ///
    /// Returns `None` if the sending side is dropped without a value.
    pub fn watch<T>(&self, progress: &ProgressHandle, outcome: &Receiver<T>) -> Option<T> {
        loop {
            match outcome.recv_timeout(self.interval) {
                Ok(value) => return Some(value),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {
                    if !progress.is_extracting() {
                        continue;
                    }

                    let info = progress.snapshot();
                    self.callback.on_progress(&info);

                    if info.percentage >= 100 {
                        log::debug!("Progress reached 100%, waiting for the job to finish");
                        return outcome.recv().ok();
                    }
                }
            }
        }
    }
}
