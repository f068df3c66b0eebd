//! Extraction request and output sample format.
//!
//! An [`ExtractionRequest`] is built once, from validated input, before the
//! job starts, and is never mutated afterwards.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use crate::{error::ExtractError, selection::TrackSelection};

/// File extension appended to every per-track output.
pub const OUTPUT_EXTENSION: &str = "wav";

/// Output PCM sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
}

impl PcmSpec {
    /// Validate and build a sample format.
    ///
    /// # Errors
    ///
    /// [`ExtractError::InvalidPcmSpec`] if the sample rate is zero, the
    /// channel count is outside `1..=8`, or the bit depth is not one of 8,
    /// 16, 24 or 32.
    pub fn new(sample_rate: u32, channels: u16, bit_depth: u16) -> Result<Self, ExtractError> {
        if sample_rate == 0 {
            return Err(ExtractError::InvalidPcmSpec(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if !(1..=8).contains(&channels) {
            return Err(ExtractError::InvalidPcmSpec(format!(
                "{channels} channels requested, expected 1 to 8"
            )));
        }
        if !matches!(bit_depth, 8 | 16 | 24 | 32) {
            return Err(ExtractError::InvalidPcmSpec(format!(
                "{bit_depth}-bit samples are not supported (use 8, 16, 24 or 32)"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            bit_depth,
        })
    }

    /// Samples per second, per channel.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bits per sample.
    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    /// Bytes per single-channel sample.
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bit_depth / 8)
    }

    /// Bytes per interleaved sample frame (all channels).
    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }
}

impl Display for PcmSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} Hz, {} ch, {}-bit",
            self.sample_rate, self.channels, self.bit_depth
        )
    }
}

/// Everything a job needs to know before it starts.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    source: PathBuf,
    destination: PathBuf,
    pcm: PcmSpec,
    tracks: Option<TrackSelection>,
}

impl ExtractionRequest {
    /// Build a request from already-validated parts.
    ///
    /// `destination` is the base path; each track is written to
    /// `<destination>_track_<N>.wav`.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, pcm: PcmSpec) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            pcm,
            tracks: None,
        }
    }

    /// Pre-select the tracks instead of prompting for them.
    ///
    /// A selection that does not fit the container's track count is
    /// discarded and the operator is prompted.
    #[must_use]
    pub fn with_tracks(mut self, tracks: TrackSelection) -> Self {
        self.tracks = Some(tracks);
        self
    }

    /// Source container path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Base destination path, without track suffix or extension.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Output sample format.
    pub fn pcm(&self) -> &PcmSpec {
        &self.pcm
    }

    /// Preset track selection, if any.
    pub fn tracks(&self) -> Option<TrackSelection> {
        self.tracks
    }

    /// Output file for the track at `track_index` (0-based).
    pub fn output_path(&self, track_index: usize) -> PathBuf {
        track_output_path(&self.destination, track_index)
    }
}

/// `<destination>_track_<index + 1>.wav`.
pub fn track_output_path(destination: &Path, track_index: usize) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(format!("_track_{}.{OUTPUT_EXTENSION}", track_index + 1));
    PathBuf::from(name)
}

/// Strip whitespace and one pair of surrounding quotes from an entered path.
///
/// Paths dragged into a terminal are often quoted.
pub fn clean_path_input(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Resolve the base destination for `source`.
///
/// A bare file name is placed next to the source file. A trailing `.wav`
/// is dropped so the track suffix lands before the extension.
pub fn resolve_destination(source: &Path, destination: &str) -> PathBuf {
    let mut destination = PathBuf::from(clean_path_input(destination));

    if destination
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case(OUTPUT_EXTENSION))
    {
        destination.set_extension("");
    }

    let is_bare_name = destination
        .parent()
        .is_none_or(|parent| parent.as_os_str().is_empty());
    if is_bare_name && !destination.is_absolute() {
        if let Some(directory) = source.parent() {
            return directory.join(destination);
        }
    }
    destination
}
