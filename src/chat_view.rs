//! Chat view: an ephemeral transcript against the analysis service, with
//! the option to attach the latest response to a journal entry.
//!
//! The service call is the only asynchronous boundary in the app. It runs
//! on a spawned task and delivers its result through a channel the event
//! loop drains, so the interface never blocks. A second send while one is
//! in flight simply races it; responses are appended in arrival order.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tokio::sync::{broadcast, mpsc};

use crate::chat_service::{ChatError, ChatMessage, ChatService, Role, APOLOGY, GREETING};
use crate::entry_store::EntryStore;
use crate::journal_entry::AnalysisRecord;
use crate::sync::{AppEvent, SyncBus};

pub struct TranscriptMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl TranscriptMessage {
    fn greeting() -> Self {
        TranscriptMessage {
            role: Role::Assistant,
            text: GREETING.to_string(),
            timestamp: Local::now(),
        }
    }
}

pub struct ChatView {
    messages: Vec<TranscriptMessage>,
    input: String,
    loading: bool,
    bound_entry: Option<String>,
    store: EntryStore,
    bus: SyncBus,
    rx: broadcast::Receiver<AppEvent>,
    service: ChatService,
    response_tx: mpsc::UnboundedSender<Result<String, ChatError>>,
    response_rx: mpsc::UnboundedReceiver<Result<String, ChatError>>,
    scroll: u16,
}

impl ChatView {
    pub fn new(store: EntryStore, bus: SyncBus, service: ChatService) -> Self {
        let rx = bus.subscribe();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        ChatView {
            messages: vec![TranscriptMessage::greeting()],
            input: String::new(),
            loading: false,
            bound_entry: None,
            store,
            bus,
            rx,
            service,
            response_tx,
            response_rx,
            scroll: 0,
        }
    }

    /// Drain bus signals and any completed service responses.
    pub fn tick(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(AppEvent::AnalyzeDream { content, id }) => self.begin_analysis(content, id),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        while let Ok(outcome) = self.response_rx.try_recv() {
            self.loading = false;
            match outcome {
                Ok(text) => self.push_assistant(text),
                Err(e) => {
                    tracing::warn!(error = %e, "analysis request failed");
                    self.push_assistant(APOLOGY.to_string());
                }
            }
            self.scroll = 0;
        }
    }

    fn push_assistant(&mut self, text: String) {
        self.messages.push(TranscriptMessage {
            role: Role::Assistant,
            text,
            timestamp: Local::now(),
        });
    }

    /// Append a user message and fire the service call without blocking.
    pub fn send(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        self.messages.push(TranscriptMessage {
            role: Role::User,
            text,
            timestamp: Local::now(),
        });
        self.loading = true;
        self.scroll = 0;

        let transcript: Vec<ChatMessage> = self
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.text.clone(),
            })
            .collect();
        let service = self.service.clone();
        let tx = self.response_tx.clone();
        tokio::spawn(async move {
            let outcome = service.send(&transcript).await;
            let _ = tx.send(outcome);
        });
    }

    /// Bind the entry, reset the transcript, and auto-send the dream.
    pub fn begin_analysis(&mut self, content: String, id: String) {
        self.bound_entry = Some(id);
        self.messages = vec![TranscriptMessage::greeting()];
        self.send(content);
    }

    pub fn new_chat(&mut self) {
        self.messages = vec![TranscriptMessage::greeting()];
        self.input.clear();
        self.bound_entry = None;
        self.scroll = 0;
    }

    /// Attach the latest assistant response (the greeting does not count)
    /// to the bound entry as an interpretation record. Read-modify-write
    /// against the store, then publish. No-op when nothing is bound or
    /// nothing has been answered yet.
    pub fn save_last_response_as_analysis(&mut self) {
        let Some(entry_id) = self.bound_entry.clone() else {
            return;
        };
        let Some(last) = self
            .messages
            .iter()
            .skip(1)
            .filter(|m| m.role == Role::Assistant)
            .last()
        else {
            return;
        };
        let record = AnalysisRecord::interpretation(last.text.clone());

        let mut entries = match self.store.try_load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "cannot attach analysis, stored entries unreadable");
                self.bus.report_error("Failed to save analysis");
                return;
            }
        };
        let Some(entry) = entries.iter_mut().find(|e| e.id == entry_id) else {
            return;
        };
        entry.analysis.insert(0, record);

        if let Err(e) = self.store.save(&entries) {
            tracing::warn!(error = %e, "failed to save analysis");
            self.bus.report_error("Failed to save analysis");
            return;
        }
        self.bus.publish_entries(&entries);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    self.save_last_response_as_analysis();
                    return true;
                }
                KeyCode::Char('n') => {
                    self.new_chat();
                    return true;
                }
                _ => return false,
            }
        }
        match key.code {
            KeyCode::Char(c) => {
                self.input.push(c);
                true
            }
            KeyCode::Backspace => {
                self.input.pop();
                true
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.input);
                self.send(text);
                true
            }
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_add(1);
                true
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Length(3),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let heading = match &self.bound_entry {
            Some(_) => "AI Dream Analysis (dream attached)",
            None => "AI Dream Analysis",
        };
        let title = Paragraph::new(heading)
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let mut transcript = String::new();
        for message in &self.messages {
            let speaker = match message.role {
                Role::User => "You",
                Role::Assistant => "AI",
            };
            transcript.push_str(&format!(
                "[{}] {}:\n{}\n\n",
                message.timestamp.format("%H:%M"),
                speaker,
                message.text
            ));
        }
        if self.loading {
            transcript.push_str("AI is thinking...\n");
        }
        let transcript = Paragraph::new(transcript)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(Block::default().borders(Borders::ALL).title("Conversation"));
        f.render_widget(transcript, chunks[1]);

        let input_title = if self.loading {
            "Share your dream... (waiting for response)"
        } else {
            "Share your dream..."
        };
        let input = Paragraph::new(self.input.clone())
            .block(Block::default().borders(Borders::ALL).title(input_title));
        f.render_widget(input, chunks[2]);

        let controls =
            Paragraph::new("Enter: send, Ctrl+S: save analysis to dream, Ctrl+N: new chat")
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
        f.render_widget(controls, chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::entry_store::{MemoryBackend, StorageBackend};
    use crate::journal_entry::{JournalEntry, Mood};
    use std::sync::Arc;

    fn chat_with(store: EntryStore, bus: SyncBus) -> ChatView {
        ChatView::new(store, bus, ChatService::new(&ServiceConfig::default()))
    }

    fn assistant(text: &str) -> TranscriptMessage {
        TranscriptMessage {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    #[test]
    fn transcript_starts_with_the_greeting() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let chat = chat_with(store, SyncBus::new());
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].text, GREETING);
        assert_eq!(chat.messages[0].role, Role::Assistant);
    }

    #[test]
    fn save_is_a_noop_without_a_bound_entry() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let entries = vec![JournalEntry::create(
            "Flying".into(),
            "I flew".into(),
            1,
            1,
            Mood::Neutral,
            vec![],
            false,
        )];
        store.save(&entries).unwrap();

        let mut chat = chat_with(store.clone(), SyncBus::new());
        chat.messages.push(assistant("An interpretation"));
        chat.save_last_response_as_analysis();

        assert!(store.load()[0].analysis.is_empty());
    }

    #[test]
    fn save_is_a_noop_with_only_the_greeting() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let entries = vec![JournalEntry::create(
            "Flying".into(),
            "I flew".into(),
            1,
            1,
            Mood::Neutral,
            vec![],
            false,
        )];
        store.save(&entries).unwrap();

        let mut chat = chat_with(store.clone(), SyncBus::new());
        chat.bound_entry = Some(store.load()[0].id.clone());
        chat.save_last_response_as_analysis();

        assert!(store.load()[0].analysis.is_empty());
    }

    #[test]
    fn save_prepends_one_interpretation_and_publishes() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let mut entry = JournalEntry::create(
            "Flying".into(),
            "I dreamed of flying".into(),
            1,
            1,
            Mood::Neutral,
            vec![],
            false,
        );
        entry
            .analysis
            .insert(0, AnalysisRecord::interpretation("Older".into()));
        let entry_id = entry.id.clone();
        store.save(&[entry]).unwrap();

        let bus = SyncBus::new();
        let mut rx = bus.subscribe();
        let mut chat = chat_with(store.clone(), bus);
        chat.bound_entry = Some(entry_id.clone());
        chat.messages.push(TranscriptMessage {
            role: Role::User,
            text: "I dreamed of flying".into(),
            timestamp: Local::now(),
        });
        chat.messages.push(assistant("Flight often means freedom."));

        chat.save_last_response_as_analysis();

        let saved = store.load();
        assert_eq!(saved[0].analysis.len(), 2);
        assert_eq!(saved[0].analysis[0].content, "Flight often means freedom.");
        assert_eq!(
            saved[0].analysis[0].kind,
            crate::journal_entry::AnalysisKind::Interpretation
        );

        match rx.try_recv().unwrap() {
            AppEvent::EntriesUpdated(entries) => {
                assert_eq!(entries[0].analysis.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn save_aborts_when_the_slot_is_malformed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("{{{ not json").unwrap();
        let store = EntryStore::new(backend.clone());

        let mut chat = chat_with(store, SyncBus::new());
        chat.bound_entry = Some("whatever".into());
        chat.messages.push(assistant("Response"));
        chat.save_last_response_as_analysis();

        // The slot was not clobbered by the failed read-modify-write.
        assert_eq!(backend.read().unwrap().as_deref(), Some("{{{ not json"));
    }
}
