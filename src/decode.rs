//! AAC decoding through FFmpeg.
//!
//! [`AacDecoder`] is configured from the track's AudioSpecificConfig and
//! converts every decoded frame to the requested [`PcmSpec`] with
//! libswresample. The resampler is built from the first decoded frame, since
//! only then are the source sample format and layout known for certain.

use ffmpeg_next::{
    Packet,
    codec::{Id, context::Context as CodecContext},
    decoder::Audio as AudioDecoder,
    frame::Audio as AudioFrame,
    software::resampling::Context as ResamplingContext,
};

use crate::{
    error::ExtractError,
    ffmpeg::{channel_layout, sample_format},
    media::{FrameDecoder, SampleBuffer},
    request::PcmSpec,
};

/// Output samples allocated beyond the rate-scaled input length.
const OUTPUT_HEADROOM: usize = 32;
/// Output samples requested per resampler flush round.
const FLUSH_CHUNK: usize = 4_096;
/// Upper bound on flush rounds at the end of a track.
const MAX_FLUSH_ROUNDS: usize = 64;

/// FFmpeg AAC decoder with output conversion.
pub struct AacDecoder {
    decoder: AudioDecoder,
    resampler: Option<ResamplingContext>,
    decoded: AudioFrame,
    /// Sample rate of the decoded stream, known once the resampler exists.
    source_rate: u32,
    pcm: PcmSpec,
    /// Scratch space for narrowing 32-bit samples to 24-bit.
    narrowed: Vec<u8>,
}

impl AacDecoder {
    /// Configure a decoder from AudioSpecificConfig bytes.
    ///
    /// Empty `decoder_info` is accepted; the decoder then expects ADTS
    /// framed input.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioDecodeError`] if FFmpeg has no AAC decoder or
    /// rejects the configuration.
    pub fn new(decoder_info: &[u8], pcm: &PcmSpec) -> Result<Self, ExtractError> {
        let codec = ffmpeg_next::decoder::find(Id::AAC)
            .ok_or_else(|| ExtractError::AudioDecodeError("no AAC decoder available".to_string()))?;

        let mut context = CodecContext::new_with_codec(codec);
        if !decoder_info.is_empty() {
            set_extradata(&mut context, decoder_info)?;
        }

        let decoder = context.decoder().audio().map_err(decode_error)?;
        log::debug!(
            "AAC decoder opened ({} bytes of decoder info), output {pcm}",
            decoder_info.len()
        );

        Ok(Self {
            decoder,
            resampler: None,
            decoded: AudioFrame::empty(),
            source_rate: 0,
            pcm: *pcm,
            narrowed: Vec::new(),
        })
    }

    fn build_resampler(&self) -> Result<ResamplingContext, ExtractError> {
        log::debug!(
            "Resampling {:?} @ {} Hz to {}",
            self.decoded.format(),
            self.decoded.rate(),
            self.pcm
        );
        ResamplingContext::get(
            self.decoded.format(),
            self.decoder.channel_layout(),
            self.decoded.rate(),
            sample_format(&self.pcm),
            channel_layout(self.pcm.channels()),
            self.pcm.sample_rate(),
        )
        .map_err(decode_error)
    }

    /// An output frame able to hold `samples` sample frames.
    fn output_frame(&self, samples: usize) -> AudioFrame {
        AudioFrame::new(
            sample_format(&self.pcm),
            samples,
            channel_layout(self.pcm.channels()),
        )
    }

    /// Convert the frame in `self.decoded` and append it to `buffer`.
    fn convert_into(&mut self, buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        if self.resampler.is_none() {
            self.resampler = Some(self.build_resampler()?);
            self.source_rate = self.decoded.rate();
        }
        let pending = self.resampler.as_ref().map_or(0, pending_output);

        // swr_convert_frame never writes past the frame's sample count, so
        // the frame must fit the whole conversion plus what is buffered.
        let capacity = output_capacity(
            self.decoded.samples(),
            self.source_rate,
            self.pcm.sample_rate(),
            pending,
        );
        let mut resampled = self.output_frame(capacity);

        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };
        resampler
            .run(&self.decoded, &mut resampled)
            .map_err(decode_error)?;

        append_samples(&self.pcm, &mut self.narrowed, &resampled, buffer);
        Ok(())
    }

    /// Pull the samples the resampler still buffers.
    fn drain_resampler(&mut self, buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        for _ in 0..MAX_FLUSH_ROUNDS {
            let Some(pending) = self.resampler.as_ref().map(pending_output) else {
                return Ok(());
            };
            let mut flushed = self.output_frame(pending + FLUSH_CHUNK);

            let Some(resampler) = self.resampler.as_mut() else {
                return Ok(());
            };
            resampler.flush(&mut flushed).map_err(decode_error)?;
            if flushed.samples() == 0 {
                break;
            }
            append_samples(&self.pcm, &mut self.narrowed, &flushed, buffer);
        }
        Ok(())
    }
}

impl FrameDecoder for AacDecoder {
    fn decode_frame(&mut self, data: &[u8], buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        buffer.clear();

        let packet = Packet::copy(data);
        self.decoder.send_packet(&packet).map_err(decode_error)?;

        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.convert_into(buffer)?;
        }
        Ok(())
    }

    fn finish(&mut self, buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        buffer.clear();

        self.decoder.send_eof().map_err(decode_error)?;
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.convert_into(buffer)?;
        }
        self.drain_resampler(buffer)?;

        log::debug!("Decoder drained {} trailing sample frames", buffer.sample_frames());
        Ok(())
    }
}

fn decode_error(error: ffmpeg_next::Error) -> ExtractError {
    ExtractError::AudioDecodeError(error.to_string())
}

/// Output samples buffered inside the resampler.
fn pending_output(resampler: &ResamplingContext) -> usize {
    resampler
        .delay()
        .map_or(0, |delay| usize::try_from(delay.output).unwrap_or(0))
}

/// Room needed to convert `input_samples` from `source_rate` to
/// `target_rate` with `pending` samples already buffered.
fn output_capacity(
    input_samples: usize,
    source_rate: u32,
    target_rate: u32,
    pending: usize,
) -> usize {
    let source_rate = u64::from(source_rate.max(1));
    let scaled = (input_samples as u64 * u64::from(target_rate)).div_ceil(source_rate);
    scaled as usize + pending + OUTPUT_HEADROOM
}

/// Append the packed samples of `frame` to `buffer` in `pcm` layout.
fn append_samples(
    pcm: &PcmSpec,
    narrowed: &mut Vec<u8>,
    frame: &AudioFrame,
    buffer: &mut SampleBuffer,
) {
    let sample_frames = frame.samples();
    if sample_frames == 0 {
        return;
    }
    let width = sample_format(pcm).bytes();
    let length = sample_frames * usize::from(pcm.channels()) * width;
    let plane = frame.data(0);
    let bytes = &plane[..length.min(plane.len())];

    if pcm.bit_depth() == 24 {
        // Keep the three most significant bytes of each little-endian
        // 32-bit sample.
        narrowed.clear();
        narrowed.extend(
            bytes
                .chunks_exact(4)
                .flat_map(|sample| [sample[1], sample[2], sample[3]]),
        );
        buffer.extend(narrowed, sample_frames);
    } else {
        buffer.extend(bytes, sample_frames);
    }
}

fn set_extradata(context: &mut CodecContext, bytes: &[u8]) -> Result<(), ExtractError> {
    let padded = bytes.len() + ffmpeg_sys_next::AV_INPUT_BUFFER_PADDING_SIZE as usize;

    // SAFETY: the buffer is allocated with av_mallocz so the codec context
    // owns it and frees it in avcodec_free_context. FFmpeg requires the
    // zeroed padding past `extradata_size`.
    unsafe {
        let buffer = ffmpeg_sys_next::av_mallocz(padded) as *mut u8;
        if buffer.is_null() {
            return Err(ExtractError::AudioDecodeError(
                "failed to allocate decoder info".to_string(),
            ));
        }
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());

        let raw = context.as_mut_ptr();
        (*raw).extradata = buffer;
        (*raw).extradata_size = bytes.len() as i32;
    }
    Ok(())
}
