//! # aac-extract
//!
//! Extract the AAC audio tracks of an MP4 file into WAV files.
//!
//! `aac-extract` opens a container, lets the operator pick a range of its
//! AAC tracks, counts their frames so progress can be reported as a
//! percentage, and decodes each selected track into
//! `<destination>_track_<n>.wav` in the requested PCM format. Decoding and
//! muxing are powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aac_extract::{
//!     ExtractionJob, ExtractionRequest, FfmpegBackend, PcmSpec, StdConsole, TrackSelection,
//! };
//!
//! let pcm = PcmSpec::new(44_100, 2, 16)?;
//! let request = ExtractionRequest::new("concert.mp4", "concert", pcm)
//!     .with_tracks(TrackSelection::Range { from: 0, to: 1 });
//!
//! let report = ExtractionJob::new(FfmpegBackend::new()?, StdConsole::new(), request).run()?;
//! for output in report.outputs() {
//!     println!("{}", output.display());
//! }
//! # Ok::<(), aac_extract::ExtractError>(())
//! ```
//!
//! ## Features
//!
//! - **Track ranges**: one track or an inclusive `from/to` range, preset or
//!   asked for interactively
//! - **Frame counting**: by scanning every selected track, or from container
//!   metadata where available
//! - **Progress**: lock-free [`ProgressHandle`] plus a [`ProgressReporter`]
//!   that reports once per interval while extraction runs
//! - **Retry**: I/O failures offer the operator a retry of the whole job
//! - **Cancellation**: cooperative [`CancellationToken`], checked per frame
//! - **Pluggable media**: the extraction core only sees the traits in
//!   [`media`]; [`FfmpegBackend`] is the production implementation
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod console;
mod decode;
mod demux;
pub mod error;
pub mod ffmpeg;
pub mod frame_count;
pub mod job;
pub mod media;
pub mod progress;
pub mod reporter;
pub mod request;
pub mod selection;
pub mod track;
mod wav;

pub use config::{DEFAULT_REPORT_INTERVAL, ExtractOptions, FrameCountMode};
pub use console::{Console, StdConsole, confirm_retry, is_explicit_no};
pub use decode::AacDecoder;
pub use demux::{FfmpegTrack, Mp4Container};
pub use error::ExtractError;
pub use ffmpeg::{FfmpegBackend, FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame_count::count_frames;
pub use job::{ExtractionJob, ExtractionReport, JobHandle};
pub use media::{
    AudioCodec, AudioTrack, EncodedFrame, FrameDecoder, MediaBackend, MediaContainer,
    SampleBuffer, SampleWriter,
};
pub use progress::{
    CancellationToken, JobState, ProgressCallback, ProgressHandle, ProgressInfo, percentage,
};
pub use reporter::ProgressReporter;
pub use request::{
    ExtractionRequest, OUTPUT_EXTENSION, PcmSpec, clean_path_input, resolve_destination,
    track_output_path,
};
pub use selection::{
    RANGE_DELIMITER, RangeError, TrackSelection, parse_track_range, prompt_track_selection,
};
pub use track::{TrackOutcome, TrackStatus, extract_track};
pub use wav::WavWriter;
