//! Scripted media backend and console shared by the integration tests.
//!
//! Tracks are generated, not read: frame `i` of track `id` carries the
//! payload `[id, i]`, and the mock decoder expands it into one sample frame
//! filled with `id`. Outputs are recorded in memory per path.

#![allow(dead_code)]

pub mod media;

use std::{
    collections::{BTreeMap, VecDeque},
    io,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    thread,
    time::Duration,
};

use aac_extract::{
    AudioCodec, AudioTrack, Console, EncodedFrame, ExtractError, ExtractionRequest, FrameDecoder,
    MediaBackend, MediaContainer, PcmSpec, SampleBuffer, SampleWriter,
};

/// Payload marker the mock decoder rejects.
pub const UNDECODABLE: u8 = 0xFF;

/// Fill byte of the samples the mock decoder releases on `finish`.
pub const TAIL: u8 = 0xEE;

pub const SOURCE: &str = "/virtual/movie.mp4";
pub const DESTINATION: &str = "/virtual/soundtrack";

/// 48 kHz stereo 16-bit: 4 bytes per sample frame.
pub fn pcm() -> PcmSpec {
    PcmSpec::new(48_000, 2, 16).unwrap()
}

pub fn request() -> ExtractionRequest {
    ExtractionRequest::new(SOURCE, DESTINATION, pcm())
}

pub fn output(track_number: usize) -> PathBuf {
    PathBuf::from(format!("{DESTINATION}_track_{track_number}.wav"))
}

// ── Tracks ─────────────────────────────────────────────────────────────

/// Shape of one generated track.
#[derive(Debug, Clone)]
pub struct TrackScript {
    pub codec: AudioCodec,
    pub frames: usize,
    pub frame_count_hint: Option<u64>,
    pub decoder_info: Vec<u8>,
    pub read_failure_at: Option<usize>,
    /// Only fail on this pass over the track (0 = first read through).
    pub read_failure_pass: Option<usize>,
    pub undecodable_at: Option<usize>,
}

impl TrackScript {
    pub fn aac(frames: usize) -> Self {
        Self {
            codec: AudioCodec::Aac,
            frames,
            frame_count_hint: None,
            decoder_info: vec![0x12, 0x10],
            read_failure_at: None,
            read_failure_pass: None,
            undecodable_at: None,
        }
    }

    pub fn other(codec: &str, frames: usize) -> Self {
        Self {
            codec: AudioCodec::Other(codec.to_string()),
            ..Self::aac(frames)
        }
    }

    pub fn with_hint(mut self, hint: u64) -> Self {
        self.frame_count_hint = Some(hint);
        self
    }

    pub fn without_decoder_info(mut self) -> Self {
        self.decoder_info.clear();
        self
    }

    pub fn failing_read_at(mut self, frame: usize) -> Self {
        self.read_failure_at = Some(frame);
        self
    }

    /// Fail reading `frame` during the extraction pass only, after the
    /// counting pass rewound the track.
    pub fn failing_extraction_read_at(mut self, frame: usize) -> Self {
        self.read_failure_at = Some(frame);
        self.read_failure_pass = Some(1);
        self
    }

    pub fn undecodable_at(mut self, frame: usize) -> Self {
        self.undecodable_at = Some(frame);
        self
    }
}

pub struct MockTrack {
    id: u8,
    script: TrackScript,
    position: usize,
    pass: usize,
    frames_read: usize,
    read_failures: Arc<AtomicU32>,
    frame_delay: Duration,
}

impl MockTrack {
    pub fn new(id: u8, script: TrackScript) -> Self {
        Self::with_budget(id, script, Arc::new(AtomicU32::new(u32::MAX)), Duration::ZERO)
    }

    fn with_budget(
        id: u8,
        script: TrackScript,
        read_failures: Arc<AtomicU32>,
        frame_delay: Duration,
    ) -> Self {
        Self {
            id,
            script,
            position: 0,
            pass: 0,
            frames_read: 0,
            read_failures,
            frame_delay,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of rewinds so far.
    pub fn pass(&self) -> usize {
        self.pass
    }

    /// Read attempts across all passes, failed ones included.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    fn should_fail_read(&self) -> bool {
        self.script.read_failure_at == Some(self.position)
            && self.script.read_failure_pass.is_none_or(|pass| pass == self.pass)
            && self
                .read_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
    }
}

impl AudioTrack for MockTrack {
    fn codec(&self) -> &AudioCodec {
        &self.script.codec
    }

    fn has_more_frames(&mut self) -> bool {
        self.position < self.script.frames
    }

    fn read_next_frame(&mut self) -> Result<EncodedFrame, ExtractError> {
        if self.position >= self.script.frames {
            return Err(ExtractError::FrameRead {
                track_number: usize::from(self.id),
                reason: "end of track".to_string(),
            });
        }
        self.frames_read += 1;

        if self.should_fail_read() {
            // A corrupt sample is skipped past, like a real demuxer would.
            self.position += 1;
            return Err(ExtractError::FrameRead {
                track_number: usize::from(self.id),
                reason: "simulated read failure".to_string(),
            });
        }
        if !self.frame_delay.is_zero() {
            thread::sleep(self.frame_delay);
        }

        let marker = if self.script.undecodable_at == Some(self.position) {
            UNDECODABLE
        } else {
            self.id
        };
        let frame = EncodedFrame {
            data: vec![marker, self.position as u8],
            pts: Some(self.position as i64 * 1024),
        };
        self.position += 1;
        Ok(frame)
    }

    fn seek_to_start(&mut self) -> Result<(), ExtractError> {
        self.position = 0;
        self.pass += 1;
        Ok(())
    }

    fn decoder_specific_info(&self) -> &[u8] {
        &self.script.decoder_info
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.script.frame_count_hint
    }
}

pub struct MockContainer {
    tracks: Vec<MockTrack>,
}

impl MediaContainer for MockContainer {
    type Track = MockTrack;

    fn audio_tracks(&mut self) -> &mut [MockTrack] {
        &mut self.tracks
    }
}

// ── Decoder and writer ─────────────────────────────────────────────────

pub struct MockDecoder {
    block_align: usize,
    /// Sample frames held back until `finish`.
    tail: usize,
}

impl FrameDecoder for MockDecoder {
    fn decode_frame(&mut self, data: &[u8], buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        buffer.clear();
        match data.first() {
            Some(&UNDECODABLE) | None => Err(ExtractError::AudioDecodeError(
                "simulated corrupt frame".to_string(),
            )),
            Some(&marker) => {
                buffer.extend(&vec![marker; self.block_align], 1);
                Ok(())
            }
        }
    }

    fn finish(&mut self, buffer: &mut SampleBuffer) -> Result<(), ExtractError> {
        buffer.clear();
        buffer.extend(&vec![TAIL; self.tail * self.block_align], self.tail);
        Ok(())
    }
}

/// What a writer left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenFile {
    pub bytes: Vec<u8>,
    pub finished: bool,
}

type Outputs = Arc<Mutex<BTreeMap<PathBuf, WrittenFile>>>;

pub struct MockWriter {
    path: PathBuf,
    outputs: Outputs,
    fails_to_finish: bool,
}

impl SampleWriter for MockWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ExtractError> {
        let mut outputs = self.outputs.lock().unwrap();
        outputs
            .entry(self.path.clone())
            .or_default()
            .bytes
            .extend_from_slice(bytes);
        Ok(())
    }

    fn finish(self) -> Result<(), ExtractError> {
        if self.fails_to_finish {
            return Err(ExtractError::AudioWriteError {
                path: self.path,
                reason: "trailer not written".to_string(),
            });
        }
        let mut outputs = self.outputs.lock().unwrap();
        outputs.entry(self.path.clone()).or_default().finished = true;
        Ok(())
    }
}

// ── Backend ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockBackend {
    tracks: Vec<TrackScript>,
    open_failures: Arc<AtomicU32>,
    read_failures: Arc<AtomicU32>,
    frame_delay: Duration,
    decoder_tail: usize,
    unwritable: Vec<PathBuf>,
    unfinishable: Vec<PathBuf>,
    opens: Arc<AtomicU32>,
    outputs: Outputs,
}

impl MockBackend {
    pub fn new(tracks: Vec<TrackScript>) -> Self {
        Self {
            tracks,
            open_failures: Arc::new(AtomicU32::new(0)),
            read_failures: Arc::new(AtomicU32::new(u32::MAX)),
            frame_delay: Duration::ZERO,
            decoder_tail: 0,
            unwritable: Vec::new(),
            unfinishable: Vec::new(),
            opens: Arc::new(AtomicU32::new(0)),
            outputs: Arc::default(),
        }
    }

    /// The first `count` opens fail.
    pub fn failing_opens(self, count: u32) -> Self {
        self.open_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Scripted read failures fire at most `count` times in total.
    pub fn with_read_failure_budget(self, count: u32) -> Self {
        self.read_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Decoders release `frames` extra sample frames when finished.
    pub fn with_decoder_tail(mut self, frames: usize) -> Self {
        self.decoder_tail = frames;
        self
    }

    pub fn with_unwritable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unwritable.push(path.into());
        self
    }

    /// Writers for `path` fail to finalise.
    pub fn with_unfinishable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unfinishable.push(path.into());
        self
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn outputs(&self) -> BTreeMap<PathBuf, WrittenFile> {
        self.outputs.lock().unwrap().clone()
    }

    pub fn output(&self, path: &Path) -> Option<WrittenFile> {
        self.outputs.lock().unwrap().get(path).cloned()
    }
}

impl MediaBackend for MockBackend {
    type Container = MockContainer;
    type Decoder = MockDecoder;
    type Writer = MockWriter;

    fn open(&self, path: &Path) -> Result<MockContainer, ExtractError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ExtractError::FileOpen {
                path: path.to_path_buf(),
                reason: "simulated open failure".to_string(),
            });
        }

        let tracks = self
            .tracks
            .iter()
            .enumerate()
            .map(|(index, script)| {
                MockTrack::with_budget(
                    index as u8 + 1,
                    script.clone(),
                    self.read_failures.clone(),
                    self.frame_delay,
                )
            })
            .collect();
        Ok(MockContainer { tracks })
    }

    fn decoder(&self, decoder_info: &[u8], pcm: &PcmSpec) -> Result<MockDecoder, ExtractError> {
        if decoder_info.is_empty() {
            return Err(ExtractError::AudioDecodeError(
                "missing decoder configuration".to_string(),
            ));
        }
        Ok(MockDecoder {
            block_align: pcm.block_align(),
            tail: self.decoder_tail,
        })
    }

    fn writer(&self, path: &Path, _pcm: &PcmSpec) -> Result<MockWriter, ExtractError> {
        if self.unwritable.iter().any(|unwritable| unwritable == path) {
            return Err(ExtractError::AudioWriteError {
                path: path.to_path_buf(),
                reason: "permission denied".to_string(),
            });
        }
        self.outputs
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), WrittenFile::default());
        Ok(MockWriter {
            path: path.to_path_buf(),
            outputs: self.outputs.clone(),
            fails_to_finish: self.unfinishable.iter().any(|unfinishable| unfinishable == path),
        })
    }
}

// ── Console ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Transcript {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    said: Vec<String>,
}

/// Console answering from a script. Clones share one transcript, so a test
/// can keep a clone while the job owns the original.
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Self {
        let console = Self::default();
        console.transcript.lock().unwrap().answers =
            answers.iter().map(ToString::to_string).collect();
        console
    }

    pub fn prompts(&self) -> Vec<String> {
        self.transcript.lock().unwrap().prompts.clone()
    }

    pub fn said(&self) -> Vec<String> {
        self.transcript.lock().unwrap().said.clone()
    }

    pub fn unanswered(&self) -> usize {
        self.transcript.lock().unwrap().answers.len()
    }

    pub fn retry_prompts(&self) -> usize {
        self.prompts()
            .iter()
            .filter(|prompt| prompt.contains("try again"))
            .count()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        let mut transcript = self.transcript.lock().unwrap();
        transcript.prompts.push(prompt.to_string());
        transcript
            .answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn say(&mut self, message: &str) {
        self.transcript.lock().unwrap().said.push(message.to_string());
    }
}
