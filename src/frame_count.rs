//! Frame counting.
//!
//! Before extracting, the job needs a denominator for its progress
//! percentage. [`count_frames`] drains each selected track once, counting
//! frames, and rewinds it to the start so the extraction pass begins at the
//! first frame.

use crate::{config::FrameCountMode, error::ExtractError, media::AudioTrack};

/// Count the frames of every track and rewind each one.
///
/// `tracks` yields `(track_index, track)` pairs; the 0-based index is only
/// used for diagnostics. A failed read is logged and counted, and the scan
/// continues; only a failed rewind is returned.
///
/// With [`FrameCountMode::Metadata`], tracks that report a
/// [`frame_count_hint`](AudioTrack::frame_count_hint) are not read at all.
///
/// # Errors
///
/// [`ExtractError::Seek`] if a track cannot be rewound.
pub fn count_frames<'t, T, I>(tracks: I, mode: FrameCountMode) -> Result<u64, ExtractError>
where
    T: AudioTrack + 't,
    I: IntoIterator<Item = (usize, &'t mut T)>,
{
    log::info!("Finding max frame count.");
    let mut total = 0_u64;

    for (index, track) in tracks {
        if mode == FrameCountMode::Metadata
            && let Some(hint) = track.frame_count_hint()
        {
            log::debug!("Track {} reports {hint} frames", index + 1);
            total += hint;
            continue;
        }

        let mut frames = 0_u64;
        while track.has_more_frames() {
            frames += 1;
            if let Err(error) = track.read_next_frame() {
                log::warn!(
                    "Frame {frames} of track {} could not be read while counting: {error}",
                    index + 1
                );
            }
        }
        track.seek_to_start()?;

        log::debug!("Track {} has {frames} frames", index + 1);
        total += frames;
    }

    log::info!("Total frame count: {total}");
    Ok(total)
}
