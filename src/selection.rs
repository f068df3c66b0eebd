//! Track range selection.
//!
//! The operator picks tracks as two 1-based numbers separated by `/`:
//! `"2/2"` selects the second track, `"1/3"` selects the first three. Both
//! ends are inclusive, and the same [`TrackSelection::indices`] drives both
//! the frame count and the extraction pass.
//!
//! ```
//! use aac_extract::{TrackSelection, parse_track_range};
//!
//! assert_eq!(parse_track_range("2/2", 3), Ok(TrackSelection::Single(1)));
//! let range = parse_track_range("1/2", 3).unwrap();
//! assert_eq!(range.indices().collect::<Vec<_>>(), vec![0, 1]);
//! ```

use std::{io, ops::RangeInclusive};

use thiserror::Error;

use crate::console::Console;

/// Delimiter between the two track numbers.
pub const RANGE_DELIMITER: char = '/';

/// Tracks chosen for extraction, as 0-based indices into the AAC track list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection {
    /// One track.
    Single(usize),
    /// Tracks `from` through `to`, both inclusive, `from < to`.
    Range {
        /// First track (0-based).
        from: usize,
        /// Last track (0-based).
        to: usize,
    },
}

impl TrackSelection {
    /// The selected indices in ascending order.
    pub fn indices(&self) -> RangeInclusive<usize> {
        match *self {
            TrackSelection::Single(index) => index..=index,
            TrackSelection::Range { from, to } => from..=to,
        }
    }

    /// Number of selected tracks.
    pub fn len(&self) -> usize {
        self.indices().count()
    }

    /// Always `false`; a selection names at least one track.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if every selected index is below `track_count`.
    pub fn fits(&self, track_count: usize) -> bool {
        *self.indices().end() < track_count
    }
}

/// Why a range entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The entry did not contain exactly two values.
    #[error("expected two values separated by '/', found {0}")]
    WrongTokenCount(usize),
    /// A value is not a whole number.
    #[error("'{0}' is not a track number")]
    NotANumber(String),
    /// A value is outside `1..=track_count`.
    #[error("track {value} does not exist (tracks are numbered 1 to {track_count})")]
    OutOfBounds {
        /// The offending 1-based value.
        value: usize,
        /// Number of available tracks.
        track_count: usize,
    },
    /// The second value is smaller than the first.
    #[error("the last track ({to}) comes before the first track ({from})")]
    Descending {
        /// First 1-based value.
        from: usize,
        /// Second 1-based value.
        to: usize,
    },
}

/// Parse a `from/to` entry against `track_count` available tracks.
///
/// # Errors
///
/// Returns the first [`RangeError`] found; the caller is expected to
/// re-prompt.
pub fn parse_track_range(input: &str, track_count: usize) -> Result<TrackSelection, RangeError> {
    let tokens: Vec<&str> = input.trim().split(RANGE_DELIMITER).collect();
    if tokens.len() != 2 {
        return Err(RangeError::WrongTokenCount(tokens.len()));
    }

    let mut values = [0_usize; 2];
    for (slot, token) in values.iter_mut().zip(&tokens) {
        let token = token.trim();
        let value = token
            .parse::<usize>()
            .map_err(|_| RangeError::NotANumber(token.to_string()))?;
        if value < 1 || value > track_count {
            return Err(RangeError::OutOfBounds { value, track_count });
        }
        *slot = value;
    }

    let [from, to] = values;
    if to < from {
        return Err(RangeError::Descending { from, to });
    }

    Ok(if from == to {
        TrackSelection::Single(from - 1)
    } else {
        TrackSelection::Range {
            from: from - 1,
            to: to - 1,
        }
    })
}

/// Ask the operator for a track range until a valid one is entered.
///
/// # Errors
///
/// Only console failures are returned; invalid entries are reported and
/// prompted again.
pub fn prompt_track_selection<C: Console + ?Sized>(
    console: &mut C,
    track_count: usize,
) -> io::Result<TrackSelection> {
    let prompt = format!(
        "{track_count} number of tracks have been found, please enter the range of tracks\n\
         you wish to extract or enter the same value twice to extract a specific track.\n\
         (trackFromIndex/trackToIndex) "
    );

    loop {
        let entry = console.read_line(&prompt)?;
        match parse_track_range(&entry, track_count) {
            Ok(selection) => return Ok(selection),
            Err(error) => {
                log::debug!("Rejected track range {entry:?}: {error}");
                console.say(&format!("Invalid track range: {error}. Please try again."));
            }
        }
    }
}
