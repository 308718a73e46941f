use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppState},
    session::SessionResult,
    stats::CharClass,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

/// Colors for one of the two display modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub base: Style,
    pub matched: Color,
    pub mismatched: Color,
    pub accent: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            base: Style::default(),
            matched: Color::Green,
            mismatched: Color::Red,
            accent: Color::Cyan,
        }
    }

    pub fn light() -> Self {
        Self {
            base: Style::default().fg(Color::Black).bg(Color::White),
            matched: Color::Rgb(0, 128, 0),
            mismatched: Color::Rgb(200, 0, 0),
            accent: Color::Blue,
        }
    }

    pub fn for_mode(light: bool) -> Self {
        if light {
            Self::light()
        } else {
            Self::dark()
        }
    }
}

/// Styled spans for the passage, one per character.
pub fn passage_spans<'a>(passage: &str, classes: &[CharClass], theme: &Theme) -> Vec<Span<'a>> {
    let bold = theme.base.add_modifier(Modifier::BOLD);
    let dim = bold.add_modifier(Modifier::DIM);

    passage
        .chars()
        .zip(classes.iter())
        .map(|(c, class)| match class {
            CharClass::Matched => Span::styled(c.to_string(), bold.fg(theme.matched)),
            CharClass::Mismatched => Span::styled(
                match c {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                },
                bold.fg(theme.mismatched),
            ),
            CharClass::Cursor => Span::styled(c.to_string(), dim.add_modifier(Modifier::UNDERLINED)),
            CharClass::Pending => Span::styled(c.to_string(), dim),
        })
        .collect()
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = Theme::for_mode(self.light_mode());
        let session = &self.session;
        let bold_style = theme.base.add_modifier(Modifier::BOLD);
        let dim_style = theme.base.add_modifier(Modifier::DIM);

        buf.set_style(area, theme.base);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let passage_width = session.passage().width();
        let prompt_occupied_lines = if passage_width <= max_chars_per_line as usize {
            1
        } else {
            ((passage_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(1),    // spacer
                Constraint::Length(prompt_occupied_lines),
                Constraint::Length(1), // padding
                Constraint::Length(1), // live stats
                Constraint::Min(1),    // spacer
                Constraint::Length(1), // help
            ])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled("exacto", bold_style.fg(theme.accent)),
            Span::styled(format!("   difficulty: {}", session.tier()), dim_style),
        ]))
        .alignment(Alignment::Center);
        header.render(chunks[0], buf);

        let spans = passage_spans(session.passage(), session.classes(), &theme);
        let passage = Paragraph::new(Line::from(spans))
            .alignment(if prompt_occupied_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false });
        passage.render(chunks[2], buf);

        let stats = session.stats();
        let live = Paragraph::new(Span::styled(
            format!(
                "Time: {}s   WPM: {}   Accuracy: {}%",
                session.elapsed_secs(),
                stats.wpm,
                stats.accuracy_percent
            ),
            bold_style,
        ))
        .alignment(Alignment::Center);
        live.render(chunks[4], buf);

        let help = Paragraph::new(Span::styled(
            format!(
                "(tab) difficulty  (ctrl+r) new passage  (ctrl+s) sound: {}  (ctrl+t) {} mode  (esc) quit",
                on_off(self.sound_enabled()),
                if self.light_mode() { "light" } else { "dark" },
            ),
            dim_style.add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        help.render(chunks[6], buf);

        if let AppState::Results(result) = &self.state {
            render_results(result, &theme, area, buf);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_results(result: &SessionResult, theme: &Theme, area: Rect, buf: &mut Buffer) {
    let bold_style = theme.base.add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled("Done!", bold_style.fg(theme.matched))),
        Line::from(""),
        Line::from(Span::styled(format!("WPM: {}", result.stats.wpm), bold_style)),
        Line::from(Span::styled(
            format!("Accuracy: {}%", result.stats.accuracy_percent),
            bold_style,
        )),
        Line::from(format!("Time: {}s   Difficulty: {}", result.elapsed_secs, result.tier)),
        Line::from(format!("Finished at {}", result.finished_at.format("%H:%M:%S"))),
        Line::from(""),
        Line::from(Span::styled(
            "press any key for the next passage, esc to quit",
            theme.base.add_modifier(Modifier::DIM | Modifier::ITALIC),
        )),
    ];

    let popup = centered(area, 52, lines.len() as u16 + 2);
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .style(theme.base)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent))
                .title("Result"),
        )
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Overrides;
    use crate::config::MemorySettingsStore;
    use crate::corpus::{Corpus, Tier};
    use crate::session::Session;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn app_for(passage: &str) -> App {
        let session = Session::new(Corpus::single(passage).unwrap(), Tier::Easy);
        App::new(session, Box::new(MemorySettingsStore::default()), Overrides::default())
    }

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| f.render_widget(app, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn renders_passage_and_live_stats() {
        let app = app_for("clean code");

        let content = draw(&app, 80, 20);

        assert!(content.contains("clean code"));
        assert!(content.contains("Time: 0s"));
        assert!(content.contains("WPM: 0"));
        assert!(content.contains("Accuracy: 100%"));
        assert!(content.contains("difficulty: Easy"));
    }

    #[test]
    fn renders_result_modal() {
        let mut app = app_for("go");
        for c in "go".chars() {
            app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }

        let content = draw(&app, 80, 24);

        assert!(content.contains("Done!"));
        assert!(content.contains("Accuracy: 100%"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let app = app_for("a rather long passage that will have to wrap");
        draw(&app, 8, 4);
    }

    #[test]
    fn mismatched_space_is_visible() {
        let theme = Theme::dark();
        let spans = passage_spans(
            "a b",
            &[CharClass::Matched, CharClass::Mismatched, CharClass::Cursor],
            &theme,
        );

        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].content, "·");
        assert_eq!(spans[1].style.fg, Some(theme.mismatched));
        assert_eq!(spans[0].style.fg, Some(theme.matched));
        assert!(spans[2].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn theme_follows_mode() {
        assert_eq!(Theme::for_mode(true), Theme::light());
        assert_eq!(Theme::for_mode(false), Theme::dark());
        assert_eq!(Theme::light().base.bg, Some(Color::White));
    }
}
