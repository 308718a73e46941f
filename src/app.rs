use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::config::{Settings, SettingsStore};
use crate::session::{Session, SessionResult};

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Typing,
    /// Summary of the attempt that just finished; the next passage is
    /// already loaded underneath.
    Results(SessionResult),
}

/// Per-run flag overrides from the command line. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub mute: bool,
    pub light: bool,
}

pub struct App {
    pub session: Session,
    pub state: AppState,
    settings: Settings,
    overrides: Overrides,
    store: Box<dyn SettingsStore>,
    should_quit: bool,
}

impl App {
    pub fn new(session: Session, store: Box<dyn SettingsStore>, overrides: Overrides) -> Self {
        let mut app = Self {
            session,
            state: AppState::Typing,
            settings: store.load(),
            overrides,
            store,
            should_quit: false,
        };
        app.session.set_sound_enabled(app.sound_enabled());
        app
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn sound_enabled(&self) -> bool {
        self.settings.sound_enabled && !self.overrides.mute
    }

    pub fn light_mode(&self) -> bool {
        self.settings.is_light_mode || self.overrides.light
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn toggle_sound(&mut self) {
        let enabled = !self.sound_enabled();
        self.overrides.mute = false;
        self.settings.sound_enabled = enabled;
        self.session.set_sound_enabled(enabled);
        self.save_settings();
    }

    pub fn toggle_theme(&mut self) {
        let light = !self.light_mode();
        self.overrides.light = false;
        self.settings.is_light_mode = light;
        self.save_settings();
    }

    /// Fires any clock periods that are due.
    pub fn on_tick(&mut self, now: Instant) -> u32 {
        self.session.poll_timer(now)
    }

    /// Clock periods that came due before the key are counted first, so the
    /// stats computed for this key see the right elapsed time.
    pub fn on_key(&mut self, key: KeyEvent) {
        self.session.poll_timer(Instant::now());

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        if matches!(self.state, AppState::Results(_)) {
            // any key dismisses the summary without typing into the next passage
            self.state = AppState::Typing;
            return;
        }

        let outcome = match key.code {
            KeyCode::Char('r') if ctrl => {
                self.session.reset();
                None
            }
            KeyCode::Char('s') if ctrl => {
                self.toggle_sound();
                None
            }
            KeyCode::Char('t') if ctrl => {
                self.toggle_theme();
                None
            }
            KeyCode::Tab => {
                self.change_tier(self.session.tier().next());
                None
            }
            KeyCode::BackTab => {
                self.change_tier(self.session.tier().prev());
                None
            }
            KeyCode::Backspace => Some(self.session.backspace()),
            KeyCode::Enter => Some(self.session.type_char('\n')),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(self.session.type_char(c))
            }
            _ => None,
        };

        if let Some(result) = outcome.and_then(|o| o.completed) {
            self.state = AppState::Results(result);
        }
    }

    fn change_tier(&mut self, tier: crate::corpus::Tier) {
        info!(%tier, "difficulty changed");
        self.session.set_tier(tier);
    }

    fn save_settings(&self) {
        if let Err(e) = self.store.save(&self.settings) {
            warn!(error = %e, "failed to save settings");
        }
    }
}
