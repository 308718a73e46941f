use exacto::{
    app::{App, Overrides},
    app_dirs::AppDirs,
    audio::ClickPlayer,
    config::FileSettingsStore,
    corpus::{Corpus, Tier},
    logging,
    runtime::{CrosstermEventSource, FixedTicker, Runner, TyperEvent},
    session::Session,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, Instant},
};
use tracing::info;

/// Longest the loop sleeps with no session clock running.
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// precision typing tui: type the passage exactly, get wpm and accuracy
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing trainer that only lets you finish when the passage matches exactly. Live WPM and accuracy, three difficulty tiers and a procedural mechanical key click."
)]
pub struct Cli {
    /// difficulty tier to draw passages from
    #[clap(short = 'd', long, value_enum, default_value_t = Tier::Medium)]
    difficulty: Tier,

    /// custom passage to practice instead of the built-in ones
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// disable the key click for this run (saved setting is kept)
    #[clap(long)]
    mute: bool,

    /// use light mode for this run (saved setting is kept)
    #[clap(long)]
    light: bool,
}

impl Cli {
    fn corpus(&self) -> Result<Corpus, exacto::corpus::CorpusError> {
        match &self.prompt {
            Some(prompt) => Corpus::single(prompt.clone()),
            None => Corpus::builtin(),
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            mute: self.mute,
            light: self.light,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let corpus = match cli.corpus() {
        Ok(corpus) => corpus,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e).exit();
        }
    };

    // dropped at the end of main so buffered log lines get flushed
    let _log_guard = AppDirs::log_dir().and_then(|dir| logging::init(&dir).ok());
    info!(difficulty = %cli.difficulty, custom = cli.prompt.is_some(), "starting");

    let session = Session::new(corpus, cli.difficulty).with_click(Box::new(ClickPlayer::new()), false);
    let mut app = App::new(session, Box::new(FileSettingsStore::new()), cli.overrides());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(IDLE_WAIT));

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit() {
        match runner.step(app.session.timer_deadline()) {
            TyperEvent::Tick => {
                if app.on_tick(Instant::now()) == 0 {
                    continue;
                }
            }
            TyperEvent::Resize => {}
            TyperEvent::Key(key) => app.on_key(key),
        }

        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
