//! MP4 demuxing through FFmpeg.
//!
//! Each [`FfmpegTrack`] reads its packets through its own demuxer context,
//! opened on first use, so tracks keep independent read positions the way
//! an MP4 sample table allows. Packets of other streams are skipped.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{Id, Parameters},
    format::context::Input,
    media::Type,
};

use crate::{
    error::ExtractError,
    media::{AudioCodec, AudioTrack, EncodedFrame, MediaContainer},
};

/// An MP4 (or any FFmpeg-readable) container and its audio tracks.
pub struct Mp4Container {
    tracks: Vec<FfmpegTrack>,
}

impl Mp4Container {
    /// Open `path` and enumerate its audio streams.
    ///
    /// # Errors
    ///
    /// [`ExtractError::FileOpen`] if FFmpeg cannot open or parse the file.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        log::debug!("Opening container: {}", path.display());
        let input = open_input(path)?;

        let mut tracks = Vec::new();
        for stream in input.streams() {
            let parameters = stream.parameters();
            if parameters.medium() != Type::Audio {
                continue;
            }

            let codec = match parameters.id() {
                Id::AAC => AudioCodec::Aac,
                other => AudioCodec::Other(format!("{other:?}").to_ascii_lowercase()),
            };
            let frames = stream.frames();

            tracks.push(FfmpegTrack {
                path: path.to_path_buf(),
                stream_index: stream.index(),
                track_number: tracks.len() + 1,
                codec,
                decoder_info: extradata(&parameters),
                frame_count_hint: (frames > 0).then_some(frames as u64),
                input: None,
                pending: None,
                exhausted: false,
            });
        }

        log::debug!("Container has {} audio streams", tracks.len());
        Ok(Self { tracks })
    }
}

impl MediaContainer for Mp4Container {
    type Track = FfmpegTrack;

    fn audio_tracks(&mut self) -> &mut [FfmpegTrack] {
        &mut self.tracks
    }
}

/// One audio stream of an [`Mp4Container`].
pub struct FfmpegTrack {
    path: PathBuf,
    stream_index: usize,
    /// 1-based position among the container's audio streams.
    track_number: usize,
    codec: AudioCodec,
    decoder_info: Vec<u8>,
    frame_count_hint: Option<u64>,
    input: Option<Input>,
    /// Look-ahead filled by `has_more_frames`.
    pending: Option<Result<EncodedFrame, ExtractError>>,
    exhausted: bool,
}

impl FfmpegTrack {
    fn demuxer(&mut self) -> Result<&mut Input, ExtractError> {
        if self.input.is_none() {
            self.input = Some(open_input(&self.path)?);
        }
        self.input.as_mut().ok_or_else(|| ExtractError::FileOpen {
            path: self.path.clone(),
            reason: "demuxer unavailable".to_string(),
        })
    }
}

impl AudioTrack for FfmpegTrack {
    fn codec(&self) -> &AudioCodec {
        &self.codec
    }

    fn has_more_frames(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        if self.exhausted {
            return false;
        }

        let (stream_index, track_number) = (self.stream_index, self.track_number);
        let next = match self.demuxer() {
            Ok(input) => next_stream_packet(input, stream_index, track_number),
            Err(error) => Some(Err(error)),
        };

        // A read error is handed out once, then the track is finished.
        if !matches!(next, Some(Ok(_))) {
            self.exhausted = true;
        }
        self.pending = next;
        self.pending.is_some()
    }

    fn read_next_frame(&mut self) -> Result<EncodedFrame, ExtractError> {
        if !self.has_more_frames() {
            return Err(ExtractError::FrameRead {
                track_number: self.track_number,
                reason: "no more frames".to_string(),
            });
        }
        match self.pending.take() {
            Some(frame) => frame,
            None => Err(ExtractError::FrameRead {
                track_number: self.track_number,
                reason: "no more frames".to_string(),
            }),
        }
    }

    fn seek_to_start(&mut self) -> Result<(), ExtractError> {
        // Priming packets of an MP4 carry negative timestamps and a seek to
        // zero lands after them; a fresh demuxer starts at the first packet.
        self.pending = None;
        self.exhausted = false;
        self.input = None;

        let track_number = self.track_number;
        self.input = Some(open_input(&self.path).map_err(|error| ExtractError::Seek {
            track_number,
            reason: error.to_string(),
        })?);
        log::debug!("Rewound track {track_number}");
        Ok(())
    }

    fn decoder_specific_info(&self) -> &[u8] {
        &self.decoder_info
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.frame_count_hint
    }
}

fn open_input(path: &Path) -> Result<Input, ExtractError> {
    ffmpeg_next::format::input(&path).map_err(|error| ExtractError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

/// Read packets until one belongs to `stream_index`.
///
/// Returns `None` at end of file.
fn next_stream_packet(
    input: &mut Input,
    stream_index: usize,
    track_number: usize,
) -> Option<Result<EncodedFrame, ExtractError>> {
    let mut packet = Packet::empty();
    loop {
        match packet.read(input) {
            Ok(()) if packet.stream() == stream_index => {
                return Some(Ok(EncodedFrame {
                    data: packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
                    pts: packet.pts(),
                }));
            }
            Ok(()) => continue,
            Err(FfmpegError::Eof) => return None,
            Err(error) => {
                return Some(Err(ExtractError::FrameRead {
                    track_number,
                    reason: error.to_string(),
                }));
            }
        }
    }
}

/// Copy the codec extradata (for AAC, the AudioSpecificConfig).
fn extradata(parameters: &Parameters) -> Vec<u8> {
    // SAFETY: `parameters` borrows a live AVCodecParameters owned by the
    // stream; FFmpeg guarantees `extradata` holds `extradata_size` bytes
    // when non-null. The bytes are copied before the borrow ends.
    unsafe {
        let raw = parameters.as_ptr();
        let size = (*raw).extradata_size;
        if (*raw).extradata.is_null() || size <= 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts((*raw).extradata, size as usize).to_vec()
    }
}
