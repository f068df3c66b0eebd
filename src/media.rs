//! Media collaborators.
//!
//! The extraction core drives three collaborators it does not implement
//! itself: a demuxer ([`MediaContainer`] / [`AudioTrack`]), an audio
//! decoder ([`FrameDecoder`]) and an output writer ([`SampleWriter`]). A
//! [`MediaBackend`] constructs all three. [`FfmpegBackend`](crate::FfmpegBackend)
//! is the production backend; tests substitute in-memory ones.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
};

use crate::{error::ExtractError, request::PcmSpec};

/// Codec of an audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCodec {
    /// Advanced Audio Coding.
    Aac,
    /// Any other codec, by name.
    Other(String),
}

impl Display for AudioCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AudioCodec::Aac => write!(f, "AAC"),
            AudioCodec::Other(name) => write!(f, "{name}"),
        }
    }
}

/// One unit of encoded audio read from a track.
///
/// Frames are short-lived: read, decoded, dropped.
#[derive(Debug, Clone, Default)]
pub struct EncodedFrame {
    /// Raw encoded payload.
    pub data: Vec<u8>,
    /// Presentation timestamp in the track's time base, if known.
    pub pts: Option<i64>,
}

/// Reusable buffer holding one frame's worth of decoded, interleaved PCM.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    data: Vec<u8>,
    sample_frames: usize,
}

impl SampleBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw interleaved sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of sample frames (one sample per channel) held.
    pub fn sample_frames(&self) -> usize {
        self.sample_frames
    }

    /// Returns `true` if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.sample_frames = 0;
    }

    /// Append interleaved bytes covering `sample_frames` sample frames.
    pub fn extend(&mut self, bytes: &[u8], sample_frames: usize) {
        self.data.extend_from_slice(bytes);
        self.sample_frames += sample_frames;
    }
}

/// A seekable sequence of encoded frames inside a container.
pub trait AudioTrack {
    /// Codec of the track's frames.
    fn codec(&self) -> &AudioCodec;

    /// Returns `true` if another frame can be read.
    fn has_more_frames(&mut self) -> bool;

    /// Read the next encoded frame.
    ///
    /// # Errors
    ///
    /// [`ExtractError::FrameRead`] if the container cannot be read.
    fn read_next_frame(&mut self) -> Result<EncodedFrame, ExtractError>;

    /// Rewind to the first frame.
    ///
    /// # Errors
    ///
    /// [`ExtractError::Seek`] if the track cannot be repositioned.
    fn seek_to_start(&mut self) -> Result<(), ExtractError>;

    /// Decoder-specific initialisation bytes (for AAC, the
    /// AudioSpecificConfig).
    fn decoder_specific_info(&self) -> &[u8];

    /// Frame count reported by the container, if it records one.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// An opened container owning its audio tracks.
pub trait MediaContainer {
    /// Track type exposed by this container.
    type Track: AudioTrack;

    /// All audio tracks, in container order.
    fn audio_tracks(&mut self) -> &mut [Self::Track];
}

/// Decodes encoded frames into PCM in the requested output format.
pub trait FrameDecoder {
    /// Decode one frame into `buffer`, replacing its contents.
    ///
    /// A frame may legitimately produce no samples (decoder priming).
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioDecodeError`] if the payload cannot be decoded.
    fn decode_frame(&mut self, data: &[u8], buffer: &mut SampleBuffer)
    -> Result<(), ExtractError>;

    /// Drain samples still held by the decoder after the last frame into
    /// `buffer`, replacing its contents.
    ///
    /// Called once, after the final [`decode_frame`](FrameDecoder::decode_frame).
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioDecodeError`] if the buffered samples cannot be
    /// converted.
    fn finish(&mut self, buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        buffer.clear();
        Ok(())
    }
}

/// Writes raw PCM bytes to an output file.
pub trait SampleWriter {
    /// Append interleaved PCM bytes.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioWriteError`] if the bytes cannot be written.
    fn write(&mut self, bytes: &[u8]) -> Result<(), ExtractError>;

    /// Finalise and close the output file.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioWriteError`] if the trailer cannot be written.
    fn finish(self) -> Result<(), ExtractError>;
}

/// Factory for the media collaborators.
pub trait MediaBackend: Send {
    /// Container type produced by [`open`](MediaBackend::open).
    type Container: MediaContainer;
    /// Decoder type produced by [`decoder`](MediaBackend::decoder).
    type Decoder: FrameDecoder;
    /// Writer type produced by [`writer`](MediaBackend::writer).
    type Writer: SampleWriter;

    /// Open the source container.
    ///
    /// # Errors
    ///
    /// [`ExtractError::FileOpen`] if the file cannot be opened or parsed.
    fn open(&self, path: &Path) -> Result<Self::Container, ExtractError>;

    /// Build a decoder from decoder-specific initialisation bytes.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioDecodeError`] if no decoder can be configured.
    fn decoder(&self, decoder_info: &[u8], pcm: &PcmSpec) -> Result<Self::Decoder, ExtractError>;

    /// Create an output file at `path` for samples in `pcm` format.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioWriteError`] if the file cannot be created.
    fn writer(&self, path: &Path, pcm: &PcmSpec) -> Result<Self::Writer, ExtractError>;
}
