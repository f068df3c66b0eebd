//! Single-track extraction.
//!
//! [`extract_track`] decodes one track end to end into its own WAV file.
//! Extraction of a track is best effort: a decoder, decode or write failure
//! stops that track and is reported as [`TrackStatus::Partial`], leaving the
//! frames already written in place. Read failures and cancellation are
//! container-level and are returned as errors for the job to handle.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use crate::{
    config::ExtractOptions,
    error::ExtractError,
    media::{AudioTrack, FrameDecoder, MediaBackend, SampleBuffer, SampleWriter},
    progress::ProgressHandle,
    request::PcmSpec,
};

/// How far extraction of a track got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    /// Every frame was decoded and written.
    Complete,
    /// Extraction stopped early; the output holds the frames written so far.
    Partial {
        /// Why the track stopped.
        reason: String,
    },
}

/// Result of extracting one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    /// 1-based track number, as used in the output file name.
    pub track_number: usize,
    /// Output file.
    pub output: PathBuf,
    /// Frames decoded and written.
    pub frames_written: u64,
    /// Completion status.
    pub status: TrackStatus,
}

impl TrackOutcome {
    /// Returns `true` if the track was extracted completely.
    pub fn is_complete(&self) -> bool {
        self.status == TrackStatus::Complete
    }
}

impl Display for TrackOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.status {
            TrackStatus::Complete => write!(
                f,
                "track {}: {} frames -> {}",
                self.track_number,
                self.frames_written,
                self.output.display()
            ),
            TrackStatus::Partial { reason } => write!(
                f,
                "track {}: stopped after {} frames ({reason}) -> {}",
                self.track_number,
                self.frames_written,
                self.output.display()
            ),
        }
    }
}

/// Guidance printed when a track fails.
pub const TRACK_FAILURE_GUIDANCE: &str = "Error extracting audio, please ensure the following:\n\
     \t- The given file paths are valid.\n\
     \t- If over-writing a file, the file location is accessible.";

/// Decode `track` and write its samples to `output`.
///
/// Every written frame advances `progress` by one. Once the last frame is
/// decoded, the samples the decoder still holds are drained into the
/// output. The writer is finished on every path once it has been created.
///
/// # Errors
///
/// [`ExtractError::FrameRead`] if the container fails mid-track and
/// [`ExtractError::Cancelled`] if the options' token is cancelled. Other
/// failures are folded into the returned [`TrackOutcome`].
pub fn extract_track<B, T>(
    backend: &B,
    track: &mut T,
    track_index: usize,
    output: &Path,
    pcm: &PcmSpec,
    progress: &ProgressHandle,
    options: &ExtractOptions,
) -> Result<TrackOutcome, ExtractError>
where
    B: MediaBackend,
    T: AudioTrack,
{
    let track_number = track_index + 1;
    log::info!("Extracting audio track {track_number} to {}", output.display());

    let outcome = |frames_written: u64, status: TrackStatus| TrackOutcome {
        track_number,
        output: output.to_path_buf(),
        frames_written,
        status,
    };
    let partial = |frames_written: u64, error: ExtractError| {
        log::error!("Track {track_number} stopped after {frames_written} frames: {error}");
        outcome(
            frames_written,
            TrackStatus::Partial {
                reason: error.to_string(),
            },
        )
    };

    let mut decoder = match backend.decoder(track.decoder_specific_info(), pcm) {
        Ok(decoder) => decoder,
        Err(error) => return Ok(partial(0, error)),
    };
    let mut writer = match backend.writer(output, pcm) {
        Ok(writer) => writer,
        Err(error) => return Ok(partial(0, error)),
    };

    let mut buffer = SampleBuffer::new();
    let mut frames_written = 0_u64;
    let loop_result = decode_loop(
        track,
        &mut decoder,
        &mut writer,
        &mut buffer,
        progress,
        options,
        &mut frames_written,
    )
    .and_then(|()| drain_decoder(&mut decoder, &mut writer, &mut buffer));
    let finish_result = writer.finish();

    match (loop_result, finish_result) {
        (Err(error), finish_result) if escalates(&error) => {
            if let Err(finish_error) = finish_result {
                log::warn!("Failed to finalise track {track_number} output: {finish_error}");
            }
            Err(error)
        }
        (Err(error), _) | (Ok(()), Err(error)) => Ok(partial(frames_written, error)),
        (Ok(()), Ok(())) => {
            log::info!("Track {track_number} complete: {frames_written} frames");
            Ok(outcome(frames_written, TrackStatus::Complete))
        }
    }
}

fn escalates(error: &ExtractError) -> bool {
    matches!(
        error,
        ExtractError::FrameRead { .. } | ExtractError::Cancelled
    )
}

fn decode_loop<T, D, W>(
    track: &mut T,
    decoder: &mut D,
    writer: &mut W,
    buffer: &mut SampleBuffer,
    progress: &ProgressHandle,
    options: &ExtractOptions,
    frames_written: &mut u64,
) -> Result<(), ExtractError>
where
    T: AudioTrack,
    D: FrameDecoder,
    W: SampleWriter,
{
    while track.has_more_frames() {
        if options.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let frame = track.read_next_frame()?;
        decoder.decode_frame(&frame.data, buffer)?;
        if !buffer.is_empty() {
            writer.write(buffer.data())?;
        }

        *frames_written += 1;
        progress.advance();
    }

    Ok(())
}

/// Write the samples the decoder holds back after the last frame.
fn drain_decoder<D, W>(
    decoder: &mut D,
    writer: &mut W,
    buffer: &mut SampleBuffer,
) -> Result<(), ExtractError>
where
    D: FrameDecoder,
    W: SampleWriter,
{
    decoder.finish(buffer)?;
    if !buffer.is_empty() {
        writer.write(buffer.data())?;
    }
    Ok(())
}
