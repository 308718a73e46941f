use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::audio::{Click, SilentClick};
use crate::corpus::{Corpus, Tier};
use crate::stats::{classify, compute_stats, CharClass, StatsSnapshot};
use crate::timer::{SecondTimer, TICK_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Complete,
}

/// Raw learner input. Line breaks are kept here, as typed, and dropped by
/// [`TypedBuffer::stripped`] before any comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedBuffer {
    raw: String,
}

impl TypedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents; a missing buffer is read as empty.
    pub fn set(&mut self, raw: Option<&str>) {
        self.raw.clear();
        if let Some(raw) = raw {
            self.raw.push_str(raw);
        }
    }

    pub fn push(&mut self, c: char) {
        self.raw.push(c);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.raw.pop()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn stripped(&self) -> String {
        strip_line_breaks(&self.raw)
    }
}

pub fn strip_line_breaks(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

/// Terminal payload of a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub stats: StatsSnapshot,
    pub elapsed_secs: u64,
    pub tier: Tier,
    pub passage: String,
    pub finished_at: DateTime<Local>,
}

/// What the host needs after one input event.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOutcome {
    /// Snapshot for the buffer this event carried.
    pub stats: StatsSnapshot,
    /// Classification of the passage this event was typed against.
    pub classes: Vec<CharClass>,
    /// True on the single event that moved the session from idle to running.
    pub started: bool,
    /// Set when this event matched the passage exactly. The session has
    /// already reset to idle with a fresh passage by the time it is returned.
    pub completed: Option<SessionResult>,
}

/// One practice attempt at a time: passage, buffer, clock and phase.
///
/// The clock only exists while running. Hosts wait for
/// [`Session::timer_deadline`] and call [`Session::on_tick`] when it passes.
pub struct Session {
    corpus: Corpus,
    tier: Tier,
    passage: String,
    buffer: TypedBuffer,
    elapsed_secs: u64,
    phase: Phase,
    timer: Option<SecondTimer>,
    tick_interval: Duration,
    stats: StatsSnapshot,
    classes: Vec<CharClass>,
    click: Box<dyn Click>,
    sound_enabled: bool,
}

impl Session {
    pub fn new(corpus: Corpus, tier: Tier) -> Self {
        let passage = corpus.pick_passage(tier).to_string();
        let classes = classify(&passage, "");

        Self {
            corpus,
            tier,
            passage,
            buffer: TypedBuffer::new(),
            elapsed_secs: 0,
            phase: Phase::Idle,
            timer: None,
            tick_interval: TICK_INTERVAL,
            stats: StatsSnapshot::default(),
            classes,
            click: Box::new(SilentClick),
            sound_enabled: false,
        }
    }

    pub fn with_click(mut self, click: Box<dyn Click>, sound_enabled: bool) -> Self {
        self.click = click;
        self.sound_enabled = sound_enabled;
        self
    }

    /// Wall-clock length of one counted second. Only tests and demos should
    /// shorten it.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn buffer(&self) -> &TypedBuffer {
        &self.buffer
    }

    /// Latest snapshot, refreshed on every input and tick.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats
    }

    pub fn classes(&self) -> &[CharClass] {
        &self.classes
    }

    pub fn timer_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline())
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }

    /// Core input event: the whole current buffer, `None` if the widget
    /// produced nothing readable.
    pub fn on_input(&mut self, raw: Option<&str>) -> InputOutcome {
        if self.sound_enabled {
            self.click.play();
        }

        self.buffer.set(raw);
        let typed = self.buffer.stripped();

        let started = self.phase == Phase::Idle && !typed.is_empty();
        if started {
            self.start();
        }

        self.stats = compute_stats(&self.passage, &typed, self.elapsed_secs);
        self.classes = classify(&self.passage, &typed);

        let mut outcome = InputOutcome {
            stats: self.stats,
            classes: self.classes.clone(),
            started,
            completed: None,
        };

        if self.phase == Phase::Running && typed == self.passage {
            outcome.completed = Some(self.complete());
        }

        outcome
    }

    pub fn type_char(&mut self, c: char) -> InputOutcome {
        let mut next = self.buffer.clone();
        next.push(c);
        self.on_input(Some(next.raw()))
    }

    pub fn backspace(&mut self) -> InputOutcome {
        let mut next = self.buffer.clone();
        next.pop();
        self.on_input(Some(next.raw()))
    }

    /// One clock period elapsed. Returns the refreshed snapshot, or `None`
    /// when no clock is running.
    pub fn on_tick(&mut self) -> Option<StatsSnapshot> {
        if self.phase != Phase::Running {
            return None;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.advance();
        }

        self.elapsed_secs += 1;
        let typed = self.buffer.stripped();
        self.stats = compute_stats(&self.passage, &typed, self.elapsed_secs);
        Some(self.stats)
    }

    /// Fire every clock period whose deadline is at or before `now`. Returns
    /// how many fired; a late event loop catches up instead of losing seconds.
    pub fn poll_timer(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while self.timer.is_some_and(|t| t.is_due(now)) {
            if self.on_tick().is_none() {
                break;
            }
            fired += 1;
        }
        fired
    }

    /// Fresh passage from the current tier, clock cleared. Legal from any phase.
    pub fn reset(&mut self) {
        self.stop_timer();
        self.elapsed_secs = 0;
        self.phase = Phase::Idle;
        self.buffer.clear();
        self.passage = self.corpus.pick_passage(self.tier).to_string();
        self.stats = StatsSnapshot::default();
        self.classes = classify(&self.passage, "");

        debug!(tier = %self.tier, "session reset");
    }

    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
        self.reset();
    }

    /// Ordinal tier selection from the presentation layer; clamps.
    pub fn set_tier_index(&mut self, index: usize) {
        self.set_tier(Tier::from_index(index));
    }

    fn start(&mut self) {
        self.phase = Phase::Running;
        self.timer = Some(SecondTimer::with_interval(Instant::now(), self.tick_interval));

        info!(tier = %self.tier, "session started");
    }

    fn stop_timer(&mut self) {
        self.timer = None;
    }

    fn complete(&mut self) -> SessionResult {
        self.stop_timer();
        self.phase = Phase::Complete;

        let result = SessionResult {
            stats: self.stats,
            elapsed_secs: self.elapsed_secs,
            tier: self.tier,
            passage: self.passage.clone(),
            finished_at: Local::now(),
        };

        info!(
            tier = %result.tier,
            elapsed_secs = result.elapsed_secs,
            wpm = result.stats.wpm,
            accuracy = result.stats.accuracy_percent,
            "session complete"
        );

        self.reset();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingClick(Rc<Cell<usize>>);

    impl Click for CountingClick {
        fn play(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn session_for(passage: &str) -> Session {
        Session::new(Corpus::single(passage).unwrap(), Tier::Medium)
    }

    #[test]
    fn new_session_is_idle() {
        let session = session_for("hi");

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.passage(), "hi");
        assert_eq!(session.stats(), StatsSnapshot::default());
        assert_eq!(session.classes(), &[CharClass::Cursor, CharClass::Pending]);
        assert!(session.timer_deadline().is_none());
    }

    #[test]
    fn empty_input_stays_idle() {
        let mut session = session_for("hi");

        let outcome = session.on_input(Some(""));

        assert_eq!(session.phase(), Phase::Idle);
        assert!(!outcome.started);
        assert_eq!(outcome.stats.accuracy_percent, 100);
        assert_eq!(outcome.stats.wpm, 0);
        assert!(session.timer_deadline().is_none());
    }

    #[test]
    fn malformed_input_reads_as_empty() {
        let mut session = session_for("hi");
        session.type_char('h');

        let outcome = session.on_input(None);

        assert_eq!(session.buffer().raw(), "");
        assert_eq!(outcome.stats, StatsSnapshot::default());
        assert!(outcome.completed.is_none());
    }

    #[test]
    fn line_breaks_alone_do_not_start() {
        let mut session = session_for("hi");

        let outcome = session.on_input(Some("\r\n\n"));

        assert!(!outcome.started);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn first_character_starts_the_clock_once() {
        let mut session = session_for("hello");

        let first = session.type_char('h');
        let deadline = session.timer_deadline();

        assert!(first.started);
        assert_eq!(session.phase(), Phase::Running);
        assert!(deadline.is_some());

        let second = session.type_char('e');

        assert!(!second.started);
        assert_eq!(session.timer_deadline(), deadline);
    }

    #[test]
    fn clearing_the_buffer_keeps_running() {
        let mut session = session_for("hello");
        session.type_char('h');
        session.backspace();

        assert_eq!(session.phase(), Phase::Running);
        assert!(!session.type_char('h').started);
    }

    #[test]
    fn tick_counts_only_while_running() {
        let mut session = session_for("hello");

        assert_eq!(session.on_tick(), None);
        assert_eq!(session.elapsed_secs(), 0);

        session.type_char('h');
        let deadline = session.timer_deadline().unwrap();
        let refreshed = session.on_tick();

        assert_eq!(session.elapsed_secs(), 1);
        assert_eq!(refreshed, Some(session.stats()));
        assert!(session.timer_deadline().unwrap() > deadline);
    }

    #[test]
    fn tick_refreshes_wpm_without_input() {
        let mut session = session_for("cat");
        session.on_input(Some("cap"));
        for _ in 0..6 {
            session.on_tick();
        }

        let stats = session.stats();
        assert_eq!(stats.correct_count, 2);
        assert_eq!(stats.accuracy_percent, 66);
        assert_eq!(stats.wpm, 6);

        session.on_tick();
        assert!(session.stats().wpm <= stats.wpm);
    }

    #[test]
    fn poll_timer_catches_up_on_missed_deadlines() {
        let mut session = session_for("hello");
        assert_eq!(session.poll_timer(Instant::now()), 0);

        session.type_char('h');
        let deadline = session.timer_deadline().unwrap();

        assert_eq!(session.poll_timer(deadline - Duration::from_millis(1)), 0);
        assert_eq!(session.poll_timer(deadline + Duration::from_millis(2500)), 3);
        assert_eq!(session.elapsed_secs(), 3);
        assert_eq!(session.timer_deadline(), Some(deadline + Duration::from_secs(3)));
    }

    #[test]
    fn exact_match_completes_and_resets() {
        let mut session = session_for("go");
        session.type_char('g');
        session.on_tick();

        let outcome = session.type_char('o');

        let result = outcome.completed.expect("session should complete");
        assert_eq!(result.passage, "go");
        assert_eq!(result.elapsed_secs, 1);
        assert_eq!(result.stats.correct_count, 2);
        assert_eq!(result.stats.accuracy_percent, 100);
        assert_eq!(result.stats.wpm, 24);
        assert_eq!(outcome.classes, vec![CharClass::Matched, CharClass::Matched]);

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.buffer().raw(), "");
        assert!(session.timer_deadline().is_none());
        assert_eq!(session.stats(), StatsSnapshot::default());
    }

    #[test]
    fn whole_buffer_at_once_completes() {
        let mut session = session_for("go");

        let outcome = session.on_input(Some("go"));

        assert!(outcome.started);
        assert_matches!(outcome.completed, Some(SessionResult { elapsed_secs: 0, .. }));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn trailing_extra_does_not_complete() {
        let mut session = session_for("go");

        let outcome = session.on_input(Some("gox"));

        assert!(outcome.completed.is_none());
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(outcome.stats.correct_count, 2);
        assert_eq!(outcome.stats.accuracy_percent, 66);
    }

    #[test]
    fn line_breaks_are_stripped_before_matching() {
        let mut session = session_for("go");

        let outcome = session.on_input(Some("g\r\no\n"));

        assert!(outcome.completed.is_some());
    }

    #[test]
    fn positional_match_with_wrong_content_does_not_complete() {
        let mut session = session_for("go");

        let outcome = session.on_input(Some("gp"));

        assert!(outcome.completed.is_none());
        assert_eq!(session.phase(), Phase::Running);
    }

    #[test]
    fn reset_is_legal_from_any_phase() {
        let mut session = session_for("hello");

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);

        session.type_char('h');
        session.on_tick();
        session.reset();

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.elapsed_secs(), 0);
        assert!(session.timer_deadline().is_none());
        assert_eq!(session.on_tick(), None);

        // a new attempt starts a new clock
        assert!(session.type_char('h').started);
    }

    #[test]
    fn reset_while_idle_is_observably_idempotent() {
        let mut session = Session::new(Corpus::builtin().unwrap(), Tier::Hard);

        for _ in 0..5 {
            session.reset();
            assert_eq!(session.phase(), Phase::Idle);
            assert_eq!(session.elapsed_secs(), 0);
            assert_eq!(session.stats(), StatsSnapshot::default());
            assert!(session
                .corpus
                .passages(Tier::Hard)
                .iter()
                .any(|p| p == session.passage()));
        }
    }

    #[test]
    fn tier_change_draws_from_new_tier() {
        let corpus = Corpus::new([
            vec!["easy one".into()],
            vec!["medium one".into()],
            vec!["hard one".into()],
        ])
        .unwrap();
        let mut session = Session::new(corpus, Tier::Medium);
        session.type_char('m');

        session.set_tier(Tier::Easy);
        assert_eq!(session.passage(), "easy one");
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.timer_deadline().is_none());

        session.set_tier_index(7);
        assert_eq!(session.tier(), Tier::Hard);
        assert_eq!(session.passage(), "hard one");
    }

    #[test]
    fn click_plays_per_input_only_when_enabled() {
        let click = CountingClick::default();
        let plays = Rc::clone(&click.0);
        let mut session = session_for("hello").with_click(Box::new(click), true);

        session.type_char('h');
        session.type_char('x');
        session.backspace();
        assert_eq!(plays.get(), 3);

        session.on_tick();
        assert_eq!(plays.get(), 3);

        session.set_sound_enabled(false);
        session.type_char('e');
        assert_eq!(plays.get(), 3);
    }

    #[test]
    fn typed_buffer_editing() {
        let mut buffer = TypedBuffer::new();
        buffer.push('a');
        buffer.push('\n');
        buffer.push('b');

        assert_eq!(buffer.raw(), "a\nb");
        assert_eq!(buffer.stripped(), "ab");
        assert_eq!(buffer.pop(), Some('b'));

        buffer.set(None);
        assert_eq!(buffer.raw(), "");
        assert_eq!(buffer.pop(), None);
    }
}
