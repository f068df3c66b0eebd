//! The extraction job.
//!
//! [`ExtractionJob`] opens the source, selects tracks, counts frames and
//! extracts each selected track, publishing progress through a
//! [`ProgressHandle`]. I/O-class failures offer the operator a retry of the
//! whole sequence, starting again from container open.
//!
//! A job can run on the calling thread ([`ExtractionJob::run`]) or on a
//! dedicated worker ([`ExtractionJob::spawn`]), in which case the outcome
//! arrives on a channel held by the returned [`JobHandle`].
//!
//! # Example
//!
//! ```no_run
//! use aac_extract::{ExtractionJob, ExtractionRequest, FfmpegBackend, PcmSpec, StdConsole};
//!
//! let pcm = PcmSpec::new(48_000, 2, 16)?;
//! let request = ExtractionRequest::new("movie.mp4", "movie_audio", pcm);
//! let handle = ExtractionJob::new(FfmpegBackend::new()?, StdConsole::new(), request).spawn()?;
//! let report = handle.wait_with_reporter()?;
//! println!("{report}");
//! # Ok::<(), aac_extract::ExtractError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use crossbeam_channel::Receiver;

use crate::{
    config::ExtractOptions,
    console::{Console, confirm_retry},
    error::ExtractError,
    frame_count::count_frames,
    media::{AudioCodec, AudioTrack, MediaBackend, MediaContainer},
    progress::{CancellationToken, JobState, ProgressHandle},
    reporter::ProgressReporter,
    request::ExtractionRequest,
    selection::{TrackSelection, prompt_track_selection},
    track::{TRACK_FAILURE_GUIDANCE, TrackOutcome, extract_track},
};

/// Final report of a successful job.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Base destination path from the request.
    pub destination: PathBuf,
    /// One entry per selected track, in track order.
    pub tracks: Vec<TrackOutcome>,
    /// Frame count established before extraction.
    pub total_frames: u64,
    /// Number of attempts, including the successful one.
    pub attempts: u32,
}

impl ExtractionReport {
    /// Returns `true` if every selected track was extracted completely.
    pub fn is_complete(&self) -> bool {
        self.tracks.iter().all(TrackOutcome::is_complete)
    }

    /// Frames written across all tracks.
    pub fn frames_written(&self) -> u64 {
        self.tracks.iter().map(|track| track.frames_written).sum()
    }

    /// Output files that were written.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.tracks.iter().map(|track| track.output.as_path())
    }
}

impl Display for ExtractionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Audio extraction complete, file is saved at: {}",
            self.destination.display()
        )
    }
}

/// An extraction job over a media backend and an operator console.
pub struct ExtractionJob<B, C> {
    backend: B,
    console: C,
    request: ExtractionRequest,
    options: ExtractOptions,
    progress: ProgressHandle,
}

impl<B: MediaBackend, C: Console> ExtractionJob<B, C> {
    /// Create a job with default options.
    pub fn new(backend: B, console: C, request: ExtractionRequest) -> Self {
        Self {
            backend,
            console,
            request,
            options: ExtractOptions::new(),
            progress: ProgressHandle::new(),
        }
    }

    /// Replace the job's options.
    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// The request this job executes.
    pub fn request(&self) -> &ExtractionRequest {
        &self.request
    }

    /// A handle observing this job's progress.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Run the job on the calling thread until it succeeds or fails for
    /// good.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::NoAacTracks`] if the source has no AAC track; no
    ///   retry is offered.
    /// - [`ExtractError::Cancelled`] if the options' token is cancelled.
    /// - The last I/O-class error once the operator declines a retry.
    pub fn run(&mut self) -> Result<ExtractionReport, ExtractError> {
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            self.progress.reset();
            log::debug!(
                "Extraction attempt {attempt} for {}",
                self.request.source().display()
            );

            let error = match self.attempt() {
                Ok((tracks, total_frames)) => {
                    self.progress.set_state(JobState::Succeeded);
                    return Ok(ExtractionReport {
                        destination: self.request.destination().to_path_buf(),
                        tracks,
                        total_frames,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            log::error!("Extraction attempt {attempt} failed: {error}");
            self.console.say(&format!("Error extracting audio: {error}"));

            let retry = error.is_retryable()
                && self.options.allows_attempt_after(attempt)
                && confirm_retry(&mut self.console);
            if !retry {
                self.progress.set_state(JobState::Failed);
                return Err(error);
            }
        }
    }

    fn attempt(&mut self) -> Result<(Vec<TrackOutcome>, u64), ExtractError> {
        let Self {
            backend,
            console,
            request,
            options,
            progress,
        } = self;

        let mut container = backend.open(request.source())?;
        console.say("Starting to extract audio!");

        let mut tracks: Vec<_> = container
            .audio_tracks()
            .iter_mut()
            .filter(|track| *track.codec() == AudioCodec::Aac)
            .collect();
        if tracks.is_empty() {
            return Err(ExtractError::NoAacTracks {
                path: request.source().to_path_buf(),
            });
        }
        log::debug!("Found {} AAC tracks", tracks.len());

        let selection = resolve_selection(console, request.tracks(), tracks.len())?;
        let indices = selection.indices();
        let last_number = indices.end() + 1;

        let total_frames = count_frames(
            indices
                .clone()
                .zip(tracks[indices.clone()].iter_mut())
                .map(|(index, track)| (index, &mut **track)),
            options.frame_count_mode,
        )?;
        progress.set_total_frames(total_frames);

        let mut outcomes = Vec::with_capacity(selection.len());
        progress.set_state(JobState::Extracting);

        for index in indices {
            if options.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }

            console.say(&format!(
                "Extracting audio track {} of {last_number}.",
                index + 1
            ));
            let outcome = extract_track(
                &*backend,
                &mut *tracks[index],
                index,
                &request.output_path(index),
                request.pcm(),
                progress,
                options,
            )?;
            if !outcome.is_complete() {
                console.say(TRACK_FAILURE_GUIDANCE);
            }
            outcomes.push(outcome);
        }

        Ok((outcomes, total_frames))
    }
}

/// Use the preset selection when it fits, otherwise ask.
fn resolve_selection<C: Console + ?Sized>(
    console: &mut C,
    preset: Option<TrackSelection>,
    track_count: usize,
) -> Result<TrackSelection, ExtractError> {
    match preset {
        Some(selection) if selection.fits(track_count) => Ok(selection),
        Some(selection) => {
            log::warn!("Preset selection {selection:?} does not fit {track_count} tracks");
            console.say(&format!(
                "The requested tracks are not available, the file has {track_count} AAC tracks."
            ));
            Ok(prompt_track_selection(console, track_count)?)
        }
        None => Ok(prompt_track_selection(console, track_count)?),
    }
}

impl<B, C> ExtractionJob<B, C>
where
    B: MediaBackend + 'static,
    C: Console + 'static,
{
    /// Run the job on a dedicated worker thread.
    ///
    /// If the options carry no cancellation token one is added, so
    /// [`JobHandle::cancel`] always works.
    ///
    /// # Errors
    ///
    /// [`ExtractError::IoError`] if the worker thread cannot be spawned.
    pub fn spawn(mut self) -> Result<JobHandle, ExtractError> {
        let cancellation = self
            .options
            .cancellation
            .get_or_insert_with(CancellationToken::new)
            .clone();
        let reporter = ProgressReporter::new(self.options.progress.clone())
            .with_interval(self.options.report_interval);
        let progress = self.progress.clone();
        let (sender, receiver) = crossbeam_channel::bounded(1);

        let worker = thread::Builder::new()
            .name("aac-extract-worker".to_string())
            .spawn(move || {
                let outcome = self.run();
                if sender.send(outcome).is_err() {
                    log::debug!("Job outcome dropped, handle no longer listening");
                }
            })?;

        Ok(JobHandle {
            progress,
            outcome: receiver,
            worker: Some(worker),
            cancellation,
            reporter,
        })
    }
}

/// Handle to a job running on a worker thread.
pub struct JobHandle {
    progress: ProgressHandle,
    outcome: Receiver<Result<ExtractionReport, ExtractError>>,
    worker: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    reporter: ProgressReporter,
}

impl JobHandle {
    /// Progress of the running job.
    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Request cancellation; the job stops before its next frame.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns `true` once the job reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.progress.state().is_terminal()
    }

    /// Block until the job finishes, without reporting progress.
    ///
    /// # Errors
    ///
    /// The job's error, or [`ExtractError::WorkerPanicked`] if the worker
    /// died without an outcome.
    pub fn wait(mut self) -> Result<ExtractionReport, ExtractError> {
        let outcome = self
            .outcome
            .recv()
            .unwrap_or(Err(ExtractError::WorkerPanicked));
        self.join_worker();
        outcome
    }

    /// Block until the job finishes, reporting progress to the options'
    /// callback once per report interval.
    ///
    /// # Errors
    ///
    /// Same as [`wait`](JobHandle::wait).
    pub fn wait_with_reporter(mut self) -> Result<ExtractionReport, ExtractError> {
        let outcome = self
            .reporter
            .watch(&self.progress, &self.outcome)
            .unwrap_or(Err(ExtractError::WorkerPanicked));
        self.join_worker();
        outcome
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("Extraction worker panicked");
        }
    }
}
