//! Interactive console.
//!
//! The extraction job asks the operator for a track range and, after an
//! I/O failure, whether to try again. [`Console`] is the blocking
//! request/response channel it uses; [`StdConsole`] is the terminal
//! implementation.

use std::io::{self, BufRead, Write};

/// Blocking prompt / read-line channel to the operator.
pub trait Console: Send {
    /// Print `prompt` without a newline and read one line of input.
    ///
    /// The returned line has its trailing newline removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the input stream fails or is closed.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Print a diagnostic line for the operator.
    fn say(&mut self, message: &str);
}

/// Console over the process's stdin and stdout.
///
/// [`StdConsole::stderr`] moves prompts and messages to stderr, leaving
/// stdout to machine-readable output.
#[derive(Debug, Default)]
pub struct StdConsole {
    stderr: bool,
}

impl StdConsole {
    /// Create a terminal console writing to stdout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a terminal console writing to stderr.
    pub fn stderr() -> Self {
        Self { stderr: true }
    }

    /// Returns `true` if prompts and messages go to stderr.
    pub fn writes_to_stderr(&self) -> bool {
        self.stderr
    }

    fn emit(&self, text: &str) -> io::Result<()> {
        if self.stderr {
            let mut stderr = io::stderr().lock();
            stderr.write_all(text.as_bytes())?;
            stderr.flush()
        } else {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.emit(prompt)?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "console input closed",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, message: &str) {
        if let Err(error) = self.emit(&format!("{message}\n")) {
            log::warn!("Could not print console message: {error}");
        }
    }
}

/// Returns `true` when `answer` is an explicit "no".
pub fn is_explicit_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no")
}

/// Ask whether a failed extraction should be retried.
///
/// Anything other than an explicit "no" retries. A console failure counts
/// as declining, so a closed stdin cannot cause an endless retry loop.
pub fn confirm_retry<C: Console + ?Sized>(console: &mut C) -> bool {
    match console.read_line("Do you wish to try again? (y/n) ") {
        Ok(answer) => !is_explicit_no(&answer),
        Err(error) => {
            log::warn!("Could not read retry confirmation: {error}");
            false
        }
    }
}
