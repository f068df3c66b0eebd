//! WAV output through the FFmpeg muxer.
//!
//! PCM needs no encoding: each block of interleaved bytes handed to
//! [`WavWriter::write`] becomes one packet, timestamped by the number of
//! sample frames written before it. The muxer fills in the RIFF sizes when
//! the trailer is written.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Packet, Rational, codec::context::Context as CodecContext, format::context::Output,
};

use crate::{
    error::ExtractError,
    ffmpeg::{channel_layout, pcm_codec, sample_format},
    media::SampleWriter,
    request::PcmSpec,
};

/// Writes interleaved PCM to a WAV file.
pub struct WavWriter {
    output: Option<Output>,
    path: PathBuf,
    sample_time_base: Rational,
    stream_time_base: Rational,
    block_align: usize,
    samples_written: i64,
}

impl WavWriter {
    /// Create `path` and write the WAV header for `pcm`.
    ///
    /// An existing file is overwritten.
    ///
    /// # Errors
    ///
    /// [`ExtractError::AudioWriteError`] if the file cannot be created or
    /// the header cannot be written.
    pub fn create(path: &Path, pcm: &PcmSpec) -> Result<Self, ExtractError> {
        let write_error = |reason: String| ExtractError::AudioWriteError {
            path: path.to_path_buf(),
            reason,
        };

        let mut output = ffmpeg_next::format::output_as(&path, "wav")
            .map_err(|error| write_error(error.to_string()))?;

        let codec_id = pcm_codec(pcm);
        let codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| write_error(format!("no {codec_id:?} encoder available")))?;

        let sample_rate = pcm.sample_rate() as i32;
        let sample_time_base = Rational(1, sample_rate);

        let mut encoder_context = CodecContext::new()
            .encoder()
            .audio()
            .map_err(|error| write_error(error.to_string()))?;
        encoder_context.set_rate(sample_rate);
        encoder_context.set_channel_layout(channel_layout(pcm.channels()));
        encoder_context.set_format(sample_format(pcm));
        encoder_context.set_time_base(sample_time_base);
        let encoder = encoder_context
            .open_as(codec)
            .map_err(|error| write_error(error.to_string()))?;

        {
            let mut stream = output
                .add_stream(codec)
                .map_err(|error| write_error(error.to_string()))?;
            stream.set_parameters(&encoder);
            stream.set_time_base(sample_time_base);
        }

        output
            .write_header()
            .map_err(|error| write_error(error.to_string()))?;

        // The muxer may pick its own time base in write_header.
        let stream_time_base = output
            .stream(0)
            .map(|stream| stream.time_base())
            .unwrap_or(sample_time_base);

        log::debug!("Opened WAV output {} ({pcm})", path.display());
        Ok(Self {
            output: Some(output),
            path: path.to_path_buf(),
            sample_time_base,
            stream_time_base,
            block_align: pcm.block_align(),
            samples_written: 0,
        })
    }

    /// Sample frames written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written as u64
    }

    fn write_error(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::AudioWriteError {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn close(&mut self) -> Result<(), ExtractError> {
        if let Some(mut output) = self.output.take() {
            output
                .write_trailer()
                .map_err(|error| self.write_error(error.to_string()))?;
            log::debug!(
                "Closed {} after {} sample frames",
                self.path.display(),
                self.samples_written
            );
        }
        Ok(())
    }
}

impl SampleWriter for WavWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ExtractError> {
        if bytes.len() % self.block_align != 0 {
            return Err(self.write_error(format!(
                "{} bytes is not a whole number of {}-byte sample frames",
                bytes.len(),
                self.block_align
            )));
        }
        let Some(output) = self.output.as_mut() else {
            return Err(self.write_error("writer already finished"));
        };

        let samples = (bytes.len() / self.block_align) as i64;
        let mut packet = Packet::copy(bytes);
        packet.set_stream(0);
        packet.set_pts(Some(self.samples_written));
        packet.set_dts(Some(self.samples_written));
        packet.set_duration(samples);
        packet.rescale_ts(self.sample_time_base, self.stream_time_base);

        if let Err(error) = packet.write_interleaved(output) {
            return Err(self.write_error(error.to_string()));
        }
        self.samples_written += samples;
        Ok(())
    }

    fn finish(mut self) -> Result<(), ExtractError> {
        self.close()
    }
}

impl Drop for WavWriter {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::warn!("Failed to finalise WAV output: {error}");
        }
    }
}
