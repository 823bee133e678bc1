//! Navigation shell: terminal lifecycle, the three slides, global key
//! routing, and the transient error banner.

use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};
use tokio::sync::broadcast;

use crate::chat_service::ChatService;
use crate::chat_view::ChatView;
use crate::config::Config;
use crate::entry_store::EntryStore;
use crate::history_view::HistoryView;
use crate::journal_view::JournalView;
use crate::sync::{AppEvent, SyncBus};

const TICK: Duration = Duration::from_millis(50);
const ERROR_BANNER_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slide {
    Analysis,
    Journal,
    History,
}

impl Slide {
    fn index(self) -> usize {
        match self {
            Slide::Analysis => 0,
            Slide::Journal => 1,
            Slide::History => 2,
        }
    }

    fn next(self) -> Self {
        match self {
            Slide::Analysis => Slide::Journal,
            Slide::Journal => Slide::History,
            Slide::History => Slide::Analysis,
        }
    }
}

pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    slide: Slide,
    chat: ChatView,
    journal: JournalView,
    history: HistoryView,
    rx: broadcast::Receiver<AppEvent>,
    error: Option<(String, Instant)>,
}

impl App {
    pub fn new(store: EntryStore, bus: SyncBus, config: &Config) -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let service = ChatService::new(&config.service);

        Ok(App {
            terminal,
            // The journal is the start slide.
            slide: Slide::Journal,
            chat: ChatView::new(store.clone(), bus.clone(), service),
            journal: JournalView::new(store.clone(), bus.clone()),
            history: HistoryView::new(store, bus.clone()),
            rx: bus.subscribe(),
            error: None,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.tick();
            self.draw()?;

            if !event::poll(TICK)? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
                break;
            }
            if self.handle_global_key(key) {
                continue;
            }

            let consumed = match self.slide {
                Slide::Analysis => self.chat.handle_key(key),
                Slide::Journal => self.journal.handle_key(key),
                Slide::History => self.history.handle_key(key),
            };
            if !consumed {
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Tab => self.slide = self.slide.next(),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        if !key.modifiers.contains(KeyModifiers::ALT) {
            return false;
        }
        match key.code {
            KeyCode::Char('1') => {
                self.slide = Slide::Analysis;
                true
            }
            KeyCode::Char('2') => {
                self.slide = Slide::Journal;
                true
            }
            KeyCode::Char('3') => {
                self.slide = Slide::History;
                true
            }
            _ => false,
        }
    }

    fn tick(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(AppEvent::SwitchToAnalysisView) => self.slide = Slide::Analysis,
                Ok(AppEvent::AppError(message)) => {
                    self.error = Some((message, Instant::now()));
                }
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        self.journal.tick();
        self.history.tick();
        self.chat.tick();

        if let Some((_, shown_at)) = &self.error {
            if shown_at.elapsed() >= ERROR_BANNER_TTL {
                self.error = None;
            }
        }
    }

    fn draw(&mut self) -> Result<()> {
        let App {
            terminal,
            slide,
            chat,
            journal,
            history,
            error,
            ..
        } = self;

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(0),
                        Constraint::Length(1),
                    ]
                    .as_ref(),
                )
                .split(f.area());

            let tabs = Tabs::new(vec![
                "AI Analysis [Alt+1]",
                "Journal [Alt+2]",
                "History [Alt+3]",
            ])
            .select(slide.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(tabs, chunks[0]);

            match slide {
                Slide::Analysis => chat.render(f, chunks[1]),
                Slide::Journal => journal.render(f, chunks[1]),
                Slide::History => history.render(f, chunks[1]),
            }

            if let Some((message, _)) = error {
                let banner = Paragraph::new(message.clone())
                    .style(Style::default().fg(Color::White).bg(Color::Red))
                    .alignment(Alignment::Center);
                f.render_widget(banner, chunks[2]);
            }
        })?;

        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        disable_raw_mode().unwrap();
        stdout().execute(LeaveAlternateScreen).unwrap();
    }
}
