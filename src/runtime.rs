use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TyperEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait TyperEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TyperEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<TyperEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // release/repeat reports would double every keystroke on some platforms
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => TyperEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => TyperEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TyperEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TyperEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    /// Longest wait when no clock deadline is pending.
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TyperEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TyperEvent>) -> Self {
        Self { rx }
    }
}

impl TyperEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TyperEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TyperEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: TyperEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks until the next event or `deadline`, whichever comes first.
    /// Without a deadline waits at most one ticker interval. A deadline that
    /// has already passed is reported as Tick before any queued event, since
    /// that tick happened first.
    pub fn step(&self, deadline: Option<Instant>) -> TyperEvent {
        let timeout = match deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return TyperEvent::Tick;
                }
                remaining
            }
            None => self.ticker.interval(),
        };

        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => TyperEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                // keep the clock honest once input has gone away
                std::thread::sleep(timeout);
                TyperEvent::Tick
            }
        }
    }
}
