//! FFmpeg-backed media collaborators.
//!
//! [`FfmpegBackend`] opens MP4 containers through the FFmpeg demuxer
//! ([`Mp4Container`]), decodes AAC with FFmpeg's native decoder
//! ([`AacDecoder`]) and writes WAV through the FFmpeg muxer
//! ([`WavWriter`]).
//!
//! FFmpeg also prints its own diagnostics to stderr, independently of the
//! `log` crate. [`set_ffmpeg_log_level`] tunes that output; the binary
//! derives it from the `log` verbosity with [`FfmpegLogLevel::from_filter`].

use std::path::Path;

use ffmpeg_next::{
    ChannelLayout,
    codec::Id,
    format::{Sample, sample::Type as SampleType},
    util::log::Level,
};
use log::LevelFilter;

use crate::{
    decode::AacDecoder,
    demux::Mp4Container,
    error::ExtractError,
    media::MediaBackend,
    request::PcmSpec,
    wav::WavWriter,
};

/// Production backend over the FFmpeg libraries.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegBackend {
    _initialised: (),
}

impl FfmpegBackend {
    /// Initialise FFmpeg (idempotent) and create the backend.
    ///
    /// # Errors
    ///
    /// [`ExtractError::FfmpegError`] if the libraries fail to initialise.
    pub fn new() -> Result<Self, ExtractError> {
        ffmpeg_next::init()?;
        Ok(Self { _initialised: () })
    }
}

impl MediaBackend for FfmpegBackend {
    type Container = Mp4Container;
    type Decoder = AacDecoder;
    type Writer = WavWriter;

    fn open(&self, path: &Path) -> Result<Mp4Container, ExtractError> {
        Mp4Container::open(path)
    }

    fn decoder(&self, decoder_info: &[u8], pcm: &PcmSpec) -> Result<AacDecoder, ExtractError> {
        AacDecoder::new(decoder_info, pcm)
    }

    fn writer(&self, path: &Path, pcm: &PcmSpec) -> Result<WavWriter, ExtractError> {
        WavWriter::create(path, pcm)
    }
}

/// FFmpeg's internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// No output.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    /// Mirror a `log` level filter: FFmpeg is kept one step quieter than
    /// the crate's own logging, except when tracing.
    pub fn from_filter(filter: LevelFilter) -> Self {
        match filter {
            LevelFilter::Off => FfmpegLogLevel::Quiet,
            LevelFilter::Error | LevelFilter::Warn => FfmpegLogLevel::Fatal,
            LevelFilter::Info => FfmpegLogLevel::Error,
            LevelFilter::Debug => FfmpegLogLevel::Warning,
            LevelFilter::Trace => FfmpegLogLevel::Debug,
        }
    }

    /// Parse a level name as accepted on the command line.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" | "off" => Some(FfmpegLogLevel::Quiet),
            "fatal" => Some(FfmpegLogLevel::Fatal),
            "error" => Some(FfmpegLogLevel::Error),
            "warning" | "warn" => Some(FfmpegLogLevel::Warning),
            "info" => Some(FfmpegLogLevel::Info),
            "debug" => Some(FfmpegLogLevel::Debug),
            "trace" => Some(FfmpegLogLevel::Trace),
            _ => None,
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// Set what FFmpeg itself prints to stderr.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

// ── PCM format mapping ─────────────────────────────────────────────────

/// Sample format produced by the resampler and fed to the WAV muxer.
///
/// There is no packed 24-bit FFmpeg sample format; 24-bit output is
/// resampled to 32-bit and narrowed when copied out.
pub(crate) fn sample_format(pcm: &PcmSpec) -> Sample {
    match pcm.bit_depth() {
        8 => Sample::U8(SampleType::Packed),
        16 => Sample::I16(SampleType::Packed),
        _ => Sample::I32(SampleType::Packed),
    }
}

/// PCM codec written into the WAV header.
pub(crate) fn pcm_codec(pcm: &PcmSpec) -> Id {
    match pcm.bit_depth() {
        8 => Id::PCM_U8,
        16 => Id::PCM_S16LE,
        24 => Id::PCM_S24LE,
        _ => Id::PCM_S32LE,
    }
}

pub(crate) fn channel_layout(channels: u16) -> ChannelLayout {
    match channels {
        1 => ChannelLayout::MONO,
        2 => ChannelLayout::STEREO,
        other => ChannelLayout::default(i32::from(other)),
    }
}
