use std::{error::Error, path::PathBuf, str::FromStr, sync::Arc};

use aac_extract::{
    Console, ExtractOptions, ExtractionJob, ExtractionReport, ExtractionRequest, FfmpegBackend,
    FfmpegLogLevel, FrameCountMode, PcmSpec, ProgressCallback, ProgressInfo, StdConsole,
    TrackOutcome, TrackSelection, TrackStatus, clean_path_input, parse_track_range,
    resolve_destination,
};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  aac-extract\n  aac-extract movie.mp4 soundtrack --sample-rate 48000 --channels 2 --bit-depth 24\n  aac-extract movie.mp4 soundtrack --tracks 1/3 --progress-bar\n  aac-extract movie.mp4 soundtrack --tracks 2/2 --json\n  aac-extract --completions zsh > _aac-extract";

const WELCOME: &str = "Welcome to the command line MP4 audio extractor.";

#[derive(Debug, Parser)]
#[command(
    name = "aac-extract",
    version,
    about = "Extract the AAC audio tracks of an MP4 file into WAV files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// MP4 file to read. Prompted for when omitted.
    source: Option<String>,

    /// WAV output path, or just a file name to place it next to the source.
    /// Each track is written to `<destination>_track_<n>.wav`.
    destination: Option<String>,

    /// Output sample rate in Hz (e.g. 48000).
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Output channel count (1 = mono, 2 = stereo).
    #[arg(long)]
    channels: Option<u16>,

    /// Output bit depth (8, 16, 24 or 32).
    #[arg(long)]
    bit_depth: Option<u16>,

    /// Tracks to extract as `from/to`, numbered from 1. Use the same number
    /// twice for a single track.
    #[arg(long, value_name = "FROM/TO")]
    tracks: Option<String>,

    /// Take frame counts from container metadata instead of scanning.
    #[arg(long)]
    count_from_metadata: bool,

    /// Show a progress bar instead of percentage lines.
    #[arg(long)]
    progress_bar: bool,

    /// Print the extraction report as JSON.
    #[arg(long)]
    json: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Prints `NN%` once per report.
#[derive(Default)]
struct TerminalProgress {
    stderr: bool,
}

impl TerminalProgress {
    fn new() -> Self {
        Self::default()
    }

    fn stderr() -> Self {
        Self { stderr: true }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.percentage < 0 {
            return;
        }
        if self.stderr {
            eprintln!("{}%", info.percentage);
        } else {
            println!("{}%", info.percentage);
        }
    }
}

/// Drives an `indicatif` bar from progress reports.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.percentage >= 0 {
            self.bar.set_position(info.percentage as u64);
        }
        self.bar.set_message(format!(
            "{}/{} frames",
            info.current_frame, info.total_frames
        ));
        if info.percentage >= 100 {
            self.bar.finish();
        }
    }
}

fn log_filter(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(log_filter(verbose))
        .parse_default_env()
        .init();
}

fn apply_log_level(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let level = match &cli.log_level {
        Some(name) => {
            FfmpegLogLevel::parse(name).ok_or(format!("unsupported --log-level: {name}"))?
        }
        None => FfmpegLogLevel::from_filter(log_filter(cli.verbose)),
    };
    aac_extract::set_ffmpeg_log_level(level);
    Ok(())
}

fn parse_tracks(value: &str) -> Result<TrackSelection, Box<dyn Error>> {
    // The track count is unknown until the file is open; the job checks it.
    parse_track_range(value, usize::MAX)
        .map_err(|error| format!("invalid --tracks {value:?}: {error}").into())
}

/// Ask until the answer parses as `T`.
fn prompt_value<T: FromStr>(console: &mut dyn Console, prompt: &str) -> Result<T, Box<dyn Error>> {
    loop {
        let answer = console.read_line(prompt)?;
        match answer.trim().parse() {
            Ok(value) => return Ok(value),
            Err(_) => console.say(&format!(
                "'{}' is not a valid number, please try again.",
                answer.trim()
            )),
        }
    }
}

fn resolve_paths(
    cli: &Cli,
    console: &mut dyn Console,
) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let source = match &cli.source {
        Some(source) => source.clone(),
        None => console.read_line("First, please enter the MP4 video location: ")?,
    };
    let destination = match &cli.destination {
        Some(destination) => destination.clone(),
        None => console
            .read_line("Now please enter the WAV file location. Or just the file name: ")?,
    };

    let source = PathBuf::from(clean_path_input(&source));
    let destination = resolve_destination(&source, &destination);
    Ok((source, destination))
}

fn resolve_pcm(cli: &Cli, console: &mut dyn Console) -> Result<PcmSpec, Box<dyn Error>> {
    let (mut sample_rate, mut channels, mut bit_depth) =
        (cli.sample_rate, cli.channels, cli.bit_depth);

    loop {
        let prompted = sample_rate.is_none() || channels.is_none() || bit_depth.is_none();

        let rate = match sample_rate {
            Some(rate) => rate,
            None => prompt_value(
                console,
                "Please enter the desired sample rate in Hz. (e.g: 48000): ",
            )?,
        };
        let count = match channels {
            Some(count) => count,
            None => prompt_value(
                console,
                "Please enter the desired number of audio channels. (e.g: 1 - Mono, 2 - Stereo): ",
            )?,
        };
        let depth = match bit_depth {
            Some(depth) => depth,
            None => prompt_value(
                console,
                "Please enter the desired bit depth for the audio. (e.g: 16, 24): ",
            )?,
        };

        match PcmSpec::new(rate, count, depth) {
            Ok(pcm) => return Ok(pcm),
            Err(error) if prompted => {
                console.say(&format!("{error}. Please enter the audio format again."));
                (sample_rate, channels, bit_depth) = (None, None, None);
            }
            Err(error) => return Err(error.into()),
        }
    }
}

fn report_json(report: &ExtractionReport) -> serde_json::Value {
    json!({
        "destination": report.destination.display().to_string(),
        "complete": report.is_complete(),
        "attempts": report.attempts,
        "total_frames": report.total_frames,
        "frames_written": report.frames_written(),
        "tracks": report.tracks.iter().map(track_json).collect::<Vec<_>>(),
    })
}

fn track_json(track: &TrackOutcome) -> serde_json::Value {
    let error = match &track.status {
        TrackStatus::Complete => None,
        TrackStatus::Partial { reason } => Some(reason.as_str()),
    };
    json!({
        "track": track.track_number,
        "output": track.output.display().to_string(),
        "frames_written": track.frames_written,
        "complete": track.is_complete(),
        "error": error,
    })
}

fn print_report(report: &ExtractionReport) {
    println!("{}", report.to_string().green().bold());
    for track in &report.tracks {
        match &track.status {
            TrackStatus::Complete => {
                println!("{} {}", "saved".green().bold(), track.output.display());
            }
            TrackStatus::Partial { reason } => {
                eprintln!(
                    "{} {}",
                    "partial:".yellow().bold(),
                    format!(
                        "{} ({} frames, {reason})",
                        track.output.display(),
                        track.frames_written
                    )
                    .yellow()
                );
            }
        }
    }
}

/// Console for this run; `--json` keeps stdout for the report alone.
fn console_for(cli: &Cli) -> StdConsole {
    if cli.json {
        StdConsole::stderr()
    } else {
        StdConsole::new()
    }
}

fn progress_for(cli: &Cli) -> Arc<dyn ProgressCallback> {
    if cli.json {
        Arc::new(TerminalProgress::stderr())
    } else if cli.progress_bar {
        Arc::new(BarProgress::new())
    } else {
        Arc::new(TerminalProgress::new())
    }
}

fn is_interactive(cli: &Cli) -> bool {
    cli.source.is_none()
        || cli.destination.is_none()
        || cli.sample_rate.is_none()
        || cli.channels.is_none()
        || cli.bit_depth.is_none()
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "aac-extract", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    apply_log_level(&cli)?;

    let preset = cli.tracks.as_deref().map(parse_tracks).transpose()?;

    let mut console = console_for(&cli);
    if is_interactive(&cli) {
        console.say(WELCOME);
    }
    let (source, destination) = resolve_paths(&cli, &mut console)?;
    let pcm = resolve_pcm(&cli, &mut console)?;
    log::info!(
        "Extracting {} -> {} ({pcm})",
        source.display(),
        destination.display()
    );

    let mut request = ExtractionRequest::new(source, destination, pcm);
    if let Some(selection) = preset {
        request = request.with_tracks(selection);
    }

    let mut options = ExtractOptions::new().with_progress(progress_for(&cli));
    if cli.count_from_metadata {
        options = options.with_frame_count_mode(FrameCountMode::Metadata);
    }

    let handle = ExtractionJob::new(FfmpegBackend::new()?, console, request)
        .with_options(options)
        .spawn()?;
    let report = handle.wait_with_reporter()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(&report);
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} tracks were not fully extracted",
            report.tracks.iter().filter(|track| !track.is_complete()).count(),
            report.tracks.len()
        )
        .into())
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {}", "error:".red().bold(), error);
        std::process::exit(1);
    }
}
