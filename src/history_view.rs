//! History view: every entry, hidden or not, with hard deletion, inline
//! content editing, and per-record analysis deletion.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tokio::sync::broadcast;

use crate::entry_store::EntryStore;
use crate::journal_entry::JournalEntry;
use crate::sync::{AppEvent, SyncBus};

struct Detail {
    entry_id: String,
    editing: bool,
    edited_content: String,
    analysis_selected: usize,
}

enum Mode {
    List,
    Detail(Detail),
    ConfirmDelete(String),
    ConfirmDeleteAnalysis { entry_id: String, analysis_id: String },
}

pub struct HistoryView {
    entries: Vec<JournalEntry>,
    store: EntryStore,
    bus: SyncBus,
    rx: broadcast::Receiver<AppEvent>,
    mode: Mode,
    selected: usize,
}

impl HistoryView {
    pub fn new(store: EntryStore, bus: SyncBus) -> Self {
        let entries = store.load();
        let rx = bus.subscribe();
        HistoryView {
            entries,
            store,
            bus,
            rx,
            mode: Mode::List,
            selected: 0,
        }
    }

    pub fn tick(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(AppEvent::EntriesUpdated(entries)) => self.apply_update(entries),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    /// Converge on a broadcast collection. An open detail view follows
    /// the authoritative copy; it closes if its entry was removed.
    pub fn apply_update(&mut self, entries: Vec<JournalEntry>) {
        self.entries = entries;
        if let Mode::Detail(detail) = &mut self.mode {
            match self.entries.iter().find(|e| e.id == detail.entry_id) {
                Some(entry) => {
                    if !detail.editing {
                        detail.edited_content = entry.content.clone();
                    }
                    detail.analysis_selected =
                        detail.analysis_selected.min(entry.analysis.len().saturating_sub(1));
                }
                None => self.mode = Mode::List,
            }
        }
    }

    /// Permanently remove an entry. Closes the detail view if it was
    /// showing the removed entry.
    pub fn hard_delete(&mut self, id: &str) {
        let entries: Vec<JournalEntry> = self
            .entries
            .iter()
            .filter(|e| e.id != id)
            .cloned()
            .collect();
        if let Mode::Detail(detail) = &self.mode {
            if detail.entry_id == id {
                self.mode = Mode::List;
            }
        }
        self.commit(entries);
    }

    /// Replace one entry's content; every other field is untouched.
    pub fn edit_content(&mut self, id: &str, new_content: &str) {
        let entries: Vec<JournalEntry> = self
            .entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.id == id {
                    e.content = new_content.to_string();
                }
                e
            })
            .collect();
        self.commit(entries);
        // Refresh the open detail copy from the committed result.
        if let Mode::Detail(detail) = &mut self.mode {
            if detail.entry_id == id {
                detail.editing = false;
                detail.edited_content = new_content.to_string();
            }
        }
    }

    /// Remove one analysis record from an entry.
    pub fn delete_analysis(&mut self, entry_id: &str, analysis_id: &str) {
        let entries: Vec<JournalEntry> = self
            .entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.id == entry_id {
                    e.analysis.retain(|a| a.id != analysis_id);
                }
                e
            })
            .collect();
        self.commit(entries);
        if let Mode::Detail(detail) = &mut self.mode {
            if detail.entry_id == entry_id {
                let remaining = self
                    .entries
                    .iter()
                    .find(|e| e.id == entry_id)
                    .map(|e| e.analysis.len())
                    .unwrap_or(0);
                detail.analysis_selected = detail.analysis_selected.min(remaining.saturating_sub(1));
            }
        }
    }

    fn commit(&mut self, entries: Vec<JournalEntry>) {
        self.entries = entries;
        if let Err(e) = self.store.save(&self.entries) {
            tracing::warn!(error = %e, "failed to save journal entries");
            self.bus.report_error("Failed to save journal entries");
        }
        self.bus.publish_entries(&self.entries);
    }

    fn selected_id(&self) -> Option<String> {
        self.entries.get(self.selected).map(|e| e.id.clone())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match &self.mode {
            Mode::List => self.handle_list_key(key),
            Mode::Detail(_) => self.handle_detail_key(key),
            Mode::ConfirmDelete(_) => self.handle_confirm_delete_key(key),
            Mode::ConfirmDeleteAnalysis { .. } => self.handle_confirm_analysis_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                true
            }
            KeyCode::Down => {
                if self.selected + 1 < self.entries.len() {
                    self.selected += 1;
                }
                true
            }
            KeyCode::Enter if !self.entries.is_empty() => {
                if let Some(entry) = self.entries.get(self.selected) {
                    self.mode = Mode::Detail(Detail {
                        entry_id: entry.id.clone(),
                        editing: false,
                        edited_content: entry.content.clone(),
                        analysis_selected: 0,
                    });
                }
                true
            }
            KeyCode::Char('d') if !self.entries.is_empty() => {
                if let Some(id) = self.selected_id() {
                    self.mode = Mode::ConfirmDelete(id);
                }
                true
            }
            KeyCode::Char('a') if !self.entries.is_empty() => {
                if let Some(entry) = self.entries.get(self.selected) {
                    self.bus.analyze_dream(entry.content.clone(), entry.id.clone());
                }
                true
            }
            _ => false,
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
        let Mode::Detail(detail) = &mut self.mode else {
            return true;
        };

        if detail.editing {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
                let id = detail.entry_id.clone();
                let content = detail.edited_content.clone();
                self.edit_content(&id, &content);
                return true;
            }
            match key.code {
                KeyCode::Esc => {
                    detail.editing = false;
                    detail.edited_content = self
                        .entries
                        .iter()
                        .find(|e| e.id == detail.entry_id)
                        .map(|e| e.content.clone())
                        .unwrap_or_default();
                }
                KeyCode::Char(c) => detail.edited_content.push(c),
                KeyCode::Enter => detail.edited_content.push('\n'),
                KeyCode::Backspace => {
                    detail.edited_content.pop();
                }
                _ => {}
            }
            return true;
        }

        let entry_id = detail.entry_id.clone();
        let analysis_count = self
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .map(|e| e.analysis.len())
            .unwrap_or(0);

        match key.code {
            KeyCode::Esc => self.mode = Mode::List,
            KeyCode::Char('e') => detail.editing = true,
            KeyCode::Char('d') => self.mode = Mode::ConfirmDelete(entry_id),
            KeyCode::Char('a') => {
                if let Some(entry) = self.entries.iter().find(|e| e.id == entry_id) {
                    self.bus.analyze_dream(entry.content.clone(), entry.id.clone());
                }
            }
            KeyCode::Up => detail.analysis_selected = detail.analysis_selected.saturating_sub(1),
            KeyCode::Down => {
                if detail.analysis_selected + 1 < analysis_count {
                    detail.analysis_selected += 1;
                }
            }
            KeyCode::Char('x') if analysis_count > 0 => {
                let analysis_id = self
                    .entries
                    .iter()
                    .find(|e| e.id == entry_id)
                    .and_then(|e| e.analysis.get(detail.analysis_selected))
                    .map(|a| a.id.clone());
                if let Some(analysis_id) = analysis_id {
                    self.mode = Mode::ConfirmDeleteAnalysis {
                        entry_id,
                        analysis_id,
                    };
                }
            }
            _ => {}
        }
        true
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent) -> bool {
        let Mode::ConfirmDelete(id) = &self.mode else {
            return true;
        };
        let id = id.clone();
        match key.code {
            KeyCode::Char('y') => {
                self.hard_delete(&id);
                self.selected = self.selected.min(self.entries.len().saturating_sub(1));
                if matches!(self.mode, Mode::ConfirmDelete(_)) {
                    self.mode = Mode::List;
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.mode = Mode::List,
            _ => {}
        }
        true
    }

    fn handle_confirm_analysis_key(&mut self, key: KeyEvent) -> bool {
        let Mode::ConfirmDeleteAnalysis {
            entry_id,
            analysis_id,
        } = &self.mode
        else {
            return true;
        };
        let entry_id = entry_id.clone();
        let analysis_id = analysis_id.clone();
        match key.code {
            KeyCode::Char('y') => {
                // Reopen the detail view on the affected entry.
                let detail = Detail {
                    entry_id: entry_id.clone(),
                    editing: false,
                    edited_content: self
                        .entries
                        .iter()
                        .find(|e| e.id == entry_id)
                        .map(|e| e.content.clone())
                        .unwrap_or_default(),
                    analysis_selected: 0,
                };
                self.mode = Mode::Detail(detail);
                self.delete_analysis(&entry_id, &analysis_id);
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                let detail = Detail {
                    entry_id: entry_id.clone(),
                    editing: false,
                    edited_content: self
                        .entries
                        .iter()
                        .find(|e| e.id == entry_id)
                        .map(|e| e.content.clone())
                        .unwrap_or_default(),
                    analysis_selected: 0,
                };
                self.mode = Mode::Detail(detail);
            }
            _ => {}
        }
        true
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        match &self.mode {
            Mode::List => self.render_list(f, area),
            Mode::Detail(_) => self.render_detail(f, area),
            Mode::ConfirmDelete(_) => self.render_confirm(
                f,
                area,
                "Delete this dream permanently?\nThis action cannot be undone.",
            ),
            Mode::ConfirmDeleteAnalysis { .. } => self.render_confirm(
                f,
                area,
                "Delete this interpretation?\nThis action cannot be undone.",
            ),
        }
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let title = Paragraph::new("Dream History")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        if self.entries.is_empty() {
            let placeholder = Paragraph::new("No dream entries yet")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Entries"));
            f.render_widget(placeholder, chunks[1]);
        } else {
            self.selected = self.selected.min(self.entries.len() - 1);
            let items: Vec<ListItem> = self
                .entries
                .iter()
                .map(|entry| {
                    let mut title = format!(
                        "[{}] {}",
                        entry.date.format("%Y-%m-%d %H:%M"),
                        entry.title
                    );
                    if !entry.show_in_journal {
                        title.push_str(" (hidden)");
                    }
                    let meta = format!(
                        "{} | {} analysis record(s)",
                        entry.mood.label(),
                        entry.analysis.len()
                    );
                    ListItem::new(vec![
                        Line::from(Span::raw(title)),
                        Line::from(Span::styled(meta, Style::default().fg(Color::DarkGray))),
                    ])
                })
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Entries"))
                .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            f.render_stateful_widget(
                list,
                chunks[1],
                &mut ListState::default().with_selected(Some(self.selected)),
            );
        }

        let controls = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" view  "),
            Span::styled("a", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" analyse  "),
            Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" delete  "),
            Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]);
        let controls = Paragraph::new(controls)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[2]);
    }

    fn render_detail(&mut self, f: &mut Frame, area: Rect) {
        let Mode::Detail(detail) = &self.mode else {
            return;
        };
        let Some(entry) = self.entries.iter().find(|e| e.id == detail.entry_id) else {
            self.mode = Mode::List;
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Min(5),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let header = format!(
            "{} — {}",
            entry.title,
            entry.date.format("%Y-%m-%d %H:%M")
        );
        let title = Paragraph::new(header)
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let (content_text, content_title) = if detail.editing {
            (detail.edited_content.clone(), "Dream Content (editing)")
        } else {
            (entry.content.clone(), "Dream Content")
        };
        let content_style = if detail.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let content = Paragraph::new(content_text).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .title(content_title)
                .border_style(content_style),
        );
        f.render_widget(content, chunks[1]);

        if entry.analysis.is_empty() {
            let placeholder = Paragraph::new("No analysis yet. Press a to analyse this dream.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Dream Analysis"));
            f.render_widget(placeholder, chunks[2]);
        } else {
            let items: Vec<ListItem> = entry
                .analysis
                .iter()
                .map(|a| {
                    let first_line = a.content.lines().next().unwrap_or("").to_string();
                    ListItem::new(vec![
                        Line::from(Span::styled(
                            format!("{} — {}", a.kind.label(), a.timestamp.format("%Y-%m-%d")),
                            Style::default().fg(Color::Blue),
                        )),
                        Line::from(Span::raw(first_line)),
                    ])
                })
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Dream Analysis"))
                .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            f.render_stateful_widget(
                list,
                chunks[2],
                &mut ListState::default().with_selected(Some(detail.analysis_selected)),
            );
        }

        let hint = if detail.editing {
            "Ctrl+S: save edit, Esc: cancel edit"
        } else {
            "e: edit, a: analyse, x: delete analysis, d: delete dream, Esc: back"
        };
        let controls = Paragraph::new(hint)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[3]);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect, message: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
            .split(area);

        let message = Paragraph::new(message.to_string())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Confirm"));
        f.render_widget(message, chunks[0]);

        let controls = Paragraph::new("y: delete, n: cancel")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_store::MemoryBackend;
    use crate::journal_entry::{AnalysisRecord, Mood};
    use std::sync::Arc;

    fn seeded(titles: &[&str]) -> (HistoryView, EntryStore, SyncBus) {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let entries: Vec<JournalEntry> = titles
            .iter()
            .map(|t| {
                JournalEntry::create(
                    t.to_string(),
                    format!("{t} content"),
                    1,
                    1,
                    Mood::Neutral,
                    vec![],
                    false,
                )
            })
            .collect();
        store.save(&entries).unwrap();
        let bus = SyncBus::new();
        (HistoryView::new(store.clone(), bus.clone()), store, bus)
    }

    #[test]
    fn lists_hidden_entries_too() {
        let (mut view, store, _bus) = seeded(&["Visible", "Hidden"]);
        let mut entries = store.load();
        entries[1].show_in_journal = false;
        store.save(&entries).unwrap();
        view.apply_update(entries);
        assert_eq!(view.entries.len(), 2);
    }

    #[test]
    fn hard_delete_removes_exactly_one() {
        let (mut view, store, _bus) = seeded(&["One", "Two", "Three"]);
        let id = view.entries[1].id.clone();

        view.hard_delete(&id);

        assert_eq!(view.entries.len(), 2);
        assert!(view.entries.iter().all(|e| e.id != id));
        // And the removal is persisted: a fresh read has no trace of it.
        assert!(store.load().iter().all(|e| e.id != id));
    }

    #[test]
    fn hard_delete_closes_open_detail() {
        let (mut view, _store, _bus) = seeded(&["Doomed"]);
        let id = view.entries[0].id.clone();
        view.mode = Mode::Detail(Detail {
            entry_id: id.clone(),
            editing: false,
            edited_content: String::new(),
            analysis_selected: 0,
        });

        view.hard_delete(&id);
        assert!(matches!(view.mode, Mode::List));
    }

    #[test]
    fn edit_content_changes_only_content() {
        let (mut view, _store, _bus) = seeded(&["Ocean"]);
        let before = view.entries[0].clone();

        view.edit_content(&before.id, "Calm waters this time");

        let after = &view.entries[0];
        assert_eq!(after.content, "Calm waters this time");
        assert_eq!(after.title, before.title);
        assert_eq!(after.date, before.date);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.show_in_journal, before.show_in_journal);
    }

    #[test]
    fn delete_analysis_removes_one_record() {
        let (mut view, store, _bus) = seeded(&["Analysed"]);
        let mut entries = store.load();
        entries[0]
            .analysis
            .insert(0, AnalysisRecord::interpretation("First".into()));
        entries[0]
            .analysis
            .insert(0, AnalysisRecord::interpretation("Second".into()));
        store.save(&entries).unwrap();
        view.apply_update(entries);

        let entry_id = view.entries[0].id.clone();
        let analysis_id = view.entries[0].analysis[0].id.clone();
        view.delete_analysis(&entry_id, &analysis_id);

        assert_eq!(view.entries[0].analysis.len(), 1);
        assert_eq!(view.entries[0].analysis[0].content, "First");
    }

    #[test]
    fn broadcast_removal_closes_stale_detail() {
        let (mut view, _store, _bus) = seeded(&["Here", "Gone"]);
        let gone = view.entries[1].clone();
        view.mode = Mode::Detail(Detail {
            entry_id: gone.id.clone(),
            editing: false,
            edited_content: gone.content.clone(),
            analysis_selected: 0,
        });

        let remaining = vec![view.entries[0].clone()];
        view.apply_update(remaining);
        assert!(matches!(view.mode, Mode::List));
    }

    #[test]
    fn mutations_are_broadcast() {
        let (mut view, _store, bus) = seeded(&["One"]);
        let mut rx = bus.subscribe();
        let id = view.entries[0].id.clone();

        view.hard_delete(&id);

        match rx.try_recv().unwrap() {
            AppEvent::EntriesUpdated(entries) => assert!(entries.is_empty()),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
