//! Real AAC media generated with FFmpeg's native AAC encoder.
//!
//! The encoder primes its output, so the first packet carries a negative
//! timestamp once muxed into MP4, just like files from most tools.

use std::path::Path;

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{Flags, Id, context::Context as CodecContext},
    encoder::audio::Encoder as AudioEncoder,
    format::{Sample, sample::Type},
    frame::Audio as AudioFrame,
};

/// Samples per AAC frame.
pub const AAC_FRAME_SAMPLES: usize = 1024;

/// A raw AAC stream.
pub struct EncodedAac {
    /// AudioSpecificConfig.
    pub decoder_info: Vec<u8>,
    /// Access units in decode order, priming and flush packets included.
    pub packets: Vec<Packet>,
}

fn open_encoder(sample_rate: u32) -> AudioEncoder {
    ffmpeg_next::init().expect("Failed to initialise FFmpeg");
    let codec = ffmpeg_next::encoder::find(Id::AAC).expect("No AAC encoder available");

    let mut context = CodecContext::new_with_codec(codec)
        .encoder()
        .audio()
        .expect("Failed to create encoder context");
    context.set_rate(sample_rate as i32);
    context.set_channel_layout(ChannelLayout::STEREO);
    context.set_format(Sample::F32(Type::Planar));
    context.set_bit_rate(128_000);
    context.set_time_base(Rational(1, sample_rate as i32));
    context.set_flags(Flags::GLOBAL_HEADER);
    context.open_as(codec).expect("Failed to open AAC encoder")
}

fn receive_packets(encoder: &mut AudioEncoder, packets: &mut Vec<Packet>) {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packets.push(packet.clone());
    }
}

/// Encode `frames` frames of a 440 Hz stereo tone.
fn encode_tone(encoder: &mut AudioEncoder, sample_rate: u32, frames: usize) -> Vec<Packet> {
    let mut packets = Vec::new();

    for index in 0..frames {
        let mut frame = AudioFrame::new(
            Sample::F32(Type::Planar),
            AAC_FRAME_SAMPLES,
            ChannelLayout::STEREO,
        );
        frame.set_rate(sample_rate);
        frame.set_pts(Some((index * AAC_FRAME_SAMPLES) as i64));

        for channel in 0..2 {
            let plane = frame.data_mut(channel);
            for (offset, sample) in plane
                .chunks_exact_mut(4)
                .take(AAC_FRAME_SAMPLES)
                .enumerate()
            {
                let time = (index * AAC_FRAME_SAMPLES + offset) as f32 / sample_rate as f32;
                let value = (time * 440.0 * std::f32::consts::TAU).sin() * 0.25;
                sample.copy_from_slice(&value.to_ne_bytes());
            }
        }

        encoder.send_frame(&frame).expect("Failed to encode frame");
        receive_packets(encoder, &mut packets);
    }

    encoder.send_eof().expect("Failed to flush encoder");
    receive_packets(encoder, &mut packets);
    packets
}

fn audio_specific_config(encoder: &AudioEncoder) -> Vec<u8> {
    // SAFETY: the encoder is open, so `extradata` holds `extradata_size`
    // bytes when non-null.
    unsafe {
        let raw = encoder.as_ptr();
        if (*raw).extradata.is_null() || (*raw).extradata_size <= 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts((*raw).extradata, (*raw).extradata_size as usize).to_vec()
    }
}

/// Encode `frames` frames of tone at `sample_rate`.
pub fn encode_aac(sample_rate: u32, frames: usize) -> EncodedAac {
    let mut encoder = open_encoder(sample_rate);
    let packets = encode_tone(&mut encoder, sample_rate, frames);
    EncodedAac {
        decoder_info: audio_specific_config(&encoder),
        packets,
    }
}

/// Write an MP4 with one AAC track of `frames` frames of tone.
///
/// Returns the number of AAC packets in the file.
pub fn write_mp4(path: &Path, sample_rate: u32, frames: usize) -> usize {
    let mut encoder = open_encoder(sample_rate);
    let packets = encode_tone(&mut encoder, sample_rate, frames);
    let codec = ffmpeg_next::encoder::find(Id::AAC).expect("No AAC encoder available");
    let encoder_time_base = Rational(1, sample_rate as i32);

    let mut output = ffmpeg_next::format::output_as(&path, "mp4").expect("Failed to create MP4");
    {
        let mut stream = output.add_stream(codec).expect("Failed to add stream");
        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);
    }
    output.write_header().expect("Failed to write MP4 header");

    let stream_time_base = output.stream(0).expect("Missing stream").time_base();
    for packet in &packets {
        let mut packet = packet.clone();
        packet.set_stream(0);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet
            .write_interleaved(&mut output)
            .expect("Failed to write packet");
    }
    output.write_trailer().expect("Failed to write MP4 trailer");

    packets.len()
}

/// Size of the `data` chunk of a WAV file.
pub fn wav_data_len(bytes: &[u8]) -> usize {
    let position = bytes
        .windows(4)
        .position(|window| window == b"data")
        .expect("WAV file has no data chunk");
    let size = &bytes[position + 4..position + 8];
    u32::from_le_bytes([size[0], size[1], size[2], size[3]]) as usize
}
