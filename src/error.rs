//! Error types for the `aac-extract` crate.
//!
//! [`ExtractError`] is returned by every fallible operation. Variants fall
//! into three groups:
//!
//! - **configuration** ([`ExtractError::NoAacTracks`],
//!   [`ExtractError::InvalidPcmSpec`]): fatal, never retried.
//! - **I/O class** (open, read, seek, FFmpeg and OS errors): recoverable at
//!   the job level by an operator-confirmed retry, see
//!   [`ExtractError::is_retryable`].
//! - **track level** (decode, write): caught by the track extractor and
//!   reported as a partial [`TrackOutcome`](crate::TrackOutcome).

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `aac-extract` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The source container could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path of the source container.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source container has no AAC audio track.
    #[error("Video doesn't contain any AAC tracks: {path}")]
    NoAacTracks {
        /// Path of the source container.
        path: PathBuf,
    },

    /// An encoded frame could not be read from a track.
    #[error("Failed to read frame from track {track_number}: {reason}")]
    FrameRead {
        /// 1-based track number.
        track_number: usize,
        /// Underlying reason.
        reason: String,
    },

    /// A track could not be rewound to its first frame.
    #[error("Failed to seek track {track_number} to start: {reason}")]
    Seek {
        /// 1-based track number.
        track_number: usize,
        /// Underlying reason.
        reason: String,
    },

    /// An encoded frame could not be decoded, or no decoder could be built.
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// Decoded samples could not be written to the output file.
    #[error("Failed to write audio to {path}: {reason}")]
    AudioWriteError {
        /// Output file being written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The requested output sample format is not usable.
    #[error("Invalid output format: {0}")]
    InvalidPcmSpec(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files or the console.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The job was cancelled through a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// The extraction worker thread stopped without delivering an outcome.
    #[error("Extraction worker stopped unexpectedly")]
    WorkerPanicked,
}

impl ExtractError {
    /// Returns `true` for the I/O class of errors that the extraction job
    /// offers to retry from container open.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::FileOpen { .. }
                | ExtractError::FrameRead { .. }
                | ExtractError::Seek { .. }
                | ExtractError::FfmpegError(_)
                | ExtractError::IoError(_)
        )
    }
}

impl From<FfmpegError> for ExtractError {
    fn from(error: FfmpegError) -> Self {
        ExtractError::FfmpegError(error.to_string())
    }
}
