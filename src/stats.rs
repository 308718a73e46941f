//! Positional diffing and live typing statistics.
//!
//! Everything here is a pure function of `(passage, typed, elapsed_secs)`.
//! Characters are compared index by index as Unicode scalar values; there is
//! no alignment, so an inserted character shifts every later one into error.

/// Standard average word length used for WPM.
pub const CHARS_PER_WORD: u64 = 5;

/// Reciprocal of the elapsed-time floor: minutes never drop below 1/100.
const MIN_MINUTES_RECIPROCAL: u64 = 100;

/// Metrics derived from the current passage, buffer and clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub correct_count: usize,
    pub wpm: u32,
    pub accuracy_percent: u32,
}

impl Default for StatsSnapshot {
    /// What an untouched session reports: no words yet, nothing wrong yet.
    fn default() -> Self {
        Self {
            correct_count: 0,
            wpm: 0,
            accuracy_percent: 100,
        }
    }
}

/// How one passage character should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Typed and equal to the passage character.
    Matched,
    /// Typed and different from the passage character.
    Mismatched,
    /// The next character to be typed.
    Cursor,
    /// Not reached yet.
    Pending,
}

/// Positions in the overlap of `passage` and `typed` holding equal characters.
pub fn correct_count(passage: &str, typed: &str) -> usize {
    passage
        .chars()
        .zip(typed.chars())
        .filter(|(expected, actual)| expected == actual)
        .count()
}

/// floor(100 * correct / max(typed_len, 1)), or 100 when nothing is typed.
pub fn accuracy_percent(correct: usize, typed_len: usize) -> u32 {
    if typed_len == 0 {
        return 100;
    }
    let percent = (correct.min(typed_len) as u64 * 100) / typed_len as u64;
    percent as u32
}

/// floor((chars / 5) / max(elapsed_secs / 60, 0.01)), computed on integers so
/// the floor is exact.
pub fn words_per_minute(typed_len: usize, elapsed_secs: u64) -> u32 {
    let chars = typed_len as u64;
    // elapsed_secs / 60 < 0.01  <=>  elapsed_secs * 100 < 60
    let wpm = if elapsed_secs.saturating_mul(MIN_MINUTES_RECIPROCAL) < 60 {
        chars.saturating_mul(MIN_MINUTES_RECIPROCAL) / CHARS_PER_WORD
    } else {
        chars.saturating_mul(60) / CHARS_PER_WORD.saturating_mul(elapsed_secs)
    };
    u32::try_from(wpm).unwrap_or(u32::MAX)
}

/// Total over any pair of strings; characters typed past the end of the
/// passage are never correct but still count towards both denominators.
pub fn compute_stats(passage: &str, typed: &str, elapsed_secs: u64) -> StatsSnapshot {
    let typed_len = typed.chars().count();
    let correct = correct_count(passage, typed);

    StatsSnapshot {
        correct_count: correct,
        wpm: words_per_minute(typed_len, elapsed_secs),
        accuracy_percent: accuracy_percent(correct, typed_len),
    }
}

/// One class per passage character. Exactly one `Cursor` while the buffer is
/// shorter than the passage, none once it has reached the passage length.
pub fn classify(passage: &str, typed: &str) -> Vec<CharClass> {
    let mut typed = typed.chars();
    let mut cursor_placed = false;

    passage
        .chars()
        .map(|expected| match typed.next() {
            Some(actual) if actual == expected => CharClass::Matched,
            Some(_) => CharClass::Mismatched,
            None if !cursor_placed => {
                cursor_placed = true;
                CharClass::Cursor
            }
            None => CharClass::Pending,
        })
        .collect()
}
