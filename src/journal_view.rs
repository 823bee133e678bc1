//! Journal view: visible entries only, creation, soft delete, search,
//! sort, and the Analyse hand-off to the chat view.

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
use crate::journal_entry::{JournalEntry, Mood, DEFAULT_CLARITY, DEFAULT_LUCIDITY};
use crate::sync::{AppEvent, SyncBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Date,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftField {
    Title,
    Content,
    Lucidity,
    Clarity,
    Mood,
    Tags,
    Recurring,
}

impl DraftField {
    fn next(self) -> Self {
        match self {
            DraftField::Title => DraftField::Content,
            DraftField::Content => DraftField::Lucidity,
            DraftField::Lucidity => DraftField::Clarity,
            DraftField::Clarity => DraftField::Mood,
            DraftField::Mood => DraftField::Tags,
            DraftField::Tags => DraftField::Recurring,
            DraftField::Recurring => DraftField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            DraftField::Title => DraftField::Recurring,
            DraftField::Content => DraftField::Title,
            DraftField::Lucidity => DraftField::Content,
            DraftField::Clarity => DraftField::Lucidity,
            DraftField::Mood => DraftField::Clarity,
            DraftField::Tags => DraftField::Mood,
            DraftField::Recurring => DraftField::Tags,
        }
    }
}

/// A new entry being composed. Tags are committed one at a time and
/// duplicates are suppressed at insertion.
pub struct Draft {
    pub title: String,
    pub content: String,
    pub lucidity_level: u8,
    pub clarity: u8,
    pub mood_index: usize,
    pub tags: Vec<String>,
    pub tag_input: String,
    pub recurring: bool,
    field: DraftField,
}

impl Default for Draft {
    fn default() -> Self {
        Draft {
            title: String::new(),
            content: String::new(),
            lucidity_level: DEFAULT_LUCIDITY,
            clarity: DEFAULT_CLARITY,
            mood_index: Mood::ALL
                .iter()
                .position(|m| *m == Mood::Neutral)
                .unwrap_or(0),
            tags: Vec::new(),
            tag_input: String::new(),
            recurring: false,
            field: DraftField::Title,
        }
    }
}

impl Draft {
    pub fn mood(&self) -> Mood {
        Mood::ALL[self.mood_index]
    }

    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    pub fn add_tag(&mut self) {
        let tag = self.tag_input.trim().to_string();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self.tag_input.clear();
    }
}

enum Mode {
    List,
    New(Draft),
    Detail(String),
    ConfirmHide(String),
}

pub struct JournalView {
    entries: Vec<JournalEntry>,
    store: EntryStore,
    bus: SyncBus,
    rx: broadcast::Receiver<AppEvent>,
    mode: Mode,
    query: String,
    searching: bool,
    sort_by: SortBy,
    sort_order: SortOrder,
    selected: usize,
}

impl JournalView {
    pub fn new(store: EntryStore, bus: SyncBus) -> Self {
        let entries = store.load();
        let rx = bus.subscribe();
        JournalView {
            entries,
            store,
            bus,
            rx,
            mode: Mode::List,
            query: String::new(),
            searching: false,
            sort_by: SortBy::Date,
            sort_order: SortOrder::Desc,
            selected: 0,
        }
    }

    /// Drain broadcasts from other views and converge on them.
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

    pub fn apply_update(&mut self, entries: Vec<JournalEntry>) {
        self.entries = entries;
    }

    /// Visible entries, filtered and sorted.
    pub fn visible(&self) -> Vec<&JournalEntry> {
        let mut list: Vec<&JournalEntry> = self
            .entries
            .iter()
            .filter(|e| e.show_in_journal)
            .filter(|e| self.query.is_empty() || e.matches(&self.query))
            .collect();
        list.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortBy::Date => a.date.cmp(&b.date),
                SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            };
            match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        list
    }

    /// Rejects drafts without a trimmed title and content; otherwise
    /// prepends a fresh entry and commits.
    pub fn create(&mut self, draft: &Draft) -> bool {
        if !draft.is_valid() {
            return false;
        }
        let entry = JournalEntry::create(
            draft.title.clone(),
            draft.content.clone(),
            draft.lucidity_level,
            draft.clarity,
            draft.mood(),
            draft.tags.clone(),
            draft.recurring,
        );
        let mut entries = self.entries.clone();
        entries.insert(0, entry);
        self.commit(entries);
        true
    }

    /// Hide from the journal without removing from storage.
    pub fn soft_delete(&mut self, id: &str) {
        let entries: Vec<JournalEntry> = self
            .entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.id == id {
                    e.show_in_journal = false;
                }
                e
            })
            .collect();
        self.commit(entries);
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
        let visible = self.visible();
        visible.get(self.selected).map(|e| e.id.clone())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match &mut self.mode {
            Mode::List => self.handle_list_key(key),
            Mode::New(_) => self.handle_new_key(key),
            Mode::Detail(_) => self.handle_detail_key(key),
            Mode::ConfirmHide(_) => self.handle_confirm_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        if self.searching {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.searching = false,
                KeyCode::Char(c) => {
                    self.query.push(c);
                    self.selected = 0;
                }
                KeyCode::Backspace => {
                    self.query.pop();
                    self.selected = 0;
                }
                _ => {}
            }
            return true;
        }

        let count = self.visible().len();
        match key.code {
            KeyCode::Char('n') => {
                self.mode = Mode::New(Draft::default());
                true
            }
            KeyCode::Char('/') => {
                self.searching = true;
                true
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                true
            }
            KeyCode::Down => {
                if self.selected + 1 < count {
                    self.selected += 1;
                }
                true
            }
            KeyCode::Enter if count > 0 => {
                if let Some(id) = self.selected_id() {
                    self.mode = Mode::Detail(id);
                }
                true
            }
            KeyCode::Char('d') if count > 0 => {
                if let Some(id) = self.selected_id() {
                    self.mode = Mode::ConfirmHide(id);
                }
                true
            }
            KeyCode::Char('a') if count > 0 => {
                if let Some(id) = self.selected_id() {
                    if let Some(entry) = self.entries.iter().find(|e| e.id == id) {
                        self.bus.analyze_dream(entry.content.clone(), entry.id.clone());
                    }
                }
                true
            }
            KeyCode::Char('s') => {
                self.sort_by = match self.sort_by {
                    SortBy::Date => SortBy::Title,
                    SortBy::Title => SortBy::Date,
                };
                true
            }
            KeyCode::Char('o') => {
                self.sort_order = match self.sort_order {
                    SortOrder::Asc => SortOrder::Desc,
                    SortOrder::Desc => SortOrder::Asc,
                };
                true
            }
            _ => false,
        }
    }

    fn handle_new_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            let Mode::New(draft) = std::mem::replace(&mut self.mode, Mode::List) else {
                return true;
            };
            if !self.create(&draft) {
                // Keep composing until the required fields are there.
                self.mode = Mode::New(draft);
            }
            return true;
        }

        let Mode::New(draft) = &mut self.mode else {
            return true;
        };
        match key.code {
            KeyCode::Esc => self.mode = Mode::List,
            KeyCode::Tab => draft.field = draft.field.next(),
            KeyCode::BackTab => draft.field = draft.field.prev(),
            KeyCode::Char(c) => match draft.field {
                DraftField::Title => draft.title.push(c),
                DraftField::Content => draft.content.push(c),
                DraftField::Tags => draft.tag_input.push(c),
                DraftField::Recurring if c == ' ' => draft.recurring = !draft.recurring,
                _ => {}
            },
            KeyCode::Backspace => match draft.field {
                DraftField::Title => {
                    draft.title.pop();
                }
                DraftField::Content => {
                    draft.content.pop();
                }
                DraftField::Tags => {
                    if draft.tag_input.is_empty() {
                        draft.tags.pop();
                    } else {
                        draft.tag_input.pop();
                    }
                }
                _ => {}
            },
            KeyCode::Enter => match draft.field {
                DraftField::Content => draft.content.push('\n'),
                DraftField::Tags => draft.add_tag(),
                _ => {}
            },
            KeyCode::Left => match draft.field {
                DraftField::Lucidity => draft.lucidity_level = draft.lucidity_level.max(2) - 1,
                DraftField::Clarity => draft.clarity = draft.clarity.max(2) - 1,
                DraftField::Mood => {
                    draft.mood_index = draft.mood_index.saturating_sub(1);
                }
                DraftField::Recurring => draft.recurring = !draft.recurring,
                _ => {}
            },
            KeyCode::Right => match draft.field {
                DraftField::Lucidity => draft.lucidity_level = (draft.lucidity_level + 1).min(5),
                DraftField::Clarity => draft.clarity = (draft.clarity + 1).min(5),
                DraftField::Mood => {
                    draft.mood_index = (draft.mood_index + 1).min(Mood::ALL.len() - 1);
                }
                DraftField::Recurring => draft.recurring = !draft.recurring,
                _ => {}
            },
            _ => {}
        }
        true
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
        let Mode::Detail(id) = &self.mode else {
            return true;
        };
        let id = id.clone();
        match key.code {
            KeyCode::Esc => self.mode = Mode::List,
            KeyCode::Char('d') => self.mode = Mode::ConfirmHide(id),
            KeyCode::Char('a') => {
                if let Some(entry) = self.entries.iter().find(|e| e.id == id) {
                    self.bus.analyze_dream(entry.content.clone(), entry.id.clone());
                }
                self.mode = Mode::List;
            }
            _ => {}
        }
        true
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> bool {
        let Mode::ConfirmHide(id) = &self.mode else {
            return true;
        };
        let id = id.clone();
        match key.code {
            KeyCode::Char('y') => {
                self.soft_delete(&id);
                self.selected = self.selected.saturating_sub(1);
                self.mode = Mode::List;
            }
            KeyCode::Char('n') | KeyCode::Esc => self.mode = Mode::List,
            _ => {}
        }
        true
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        match &self.mode {
            Mode::List => self.render_list(f, area),
            Mode::New(_) => self.render_new(f, area),
            Mode::Detail(_) => self.render_detail(f, area),
            Mode::ConfirmHide(_) => self.render_confirm(f, area),
        }
    }

    fn entry_item(entry: &JournalEntry) -> ListItem<'static> {
        let mut title = format!(
            "[{}] {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.title
        );
        if entry.recurring {
            title.push_str(" (Recurring)");
        }
        let mut meta = format!(
            "Lucidity {}/5 | Clarity {}/5 | {}",
            entry.lucidity_level,
            entry.clarity,
            entry.mood.label()
        );
        if !entry.tags.is_empty() {
            meta.push_str(&format!(" | Tags: {}", entry.tags.join(", ")));
        }
        ListItem::new(vec![
            Line::from(Span::raw(title)),
            Line::from(Span::styled(meta, Style::default().fg(Color::DarkGray))),
        ])
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let title = Paragraph::new("Dream Journal")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let bar = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(26)].as_ref())
            .split(chunks[1]);

        let search_style = if self.searching {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let search = Paragraph::new(self.query.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search")
                .border_style(search_style),
        );
        f.render_widget(search, bar[0]);

        let sort_label = format!(
            "{} {}",
            match self.sort_by {
                SortBy::Date => "Date",
                SortBy::Title => "Title",
            },
            match self.sort_order {
                SortOrder::Asc => "↑",
                SortOrder::Desc => "↓",
            }
        );
        let sort = Paragraph::new(sort_label)
            .block(Block::default().borders(Borders::ALL).title("Sort"));
        f.render_widget(sort, bar[1]);

        let visible: Vec<JournalEntry> = self.visible().into_iter().cloned().collect();
        self.selected = self.selected.min(visible.len().saturating_sub(1));

        if visible.is_empty() {
            let empty = if self.query.is_empty() {
                "No dreams recorded yet. Press n to record your first dream."
            } else {
                "No dreams match your search."
            };
            let placeholder = Paragraph::new(empty)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Dreams"));
            f.render_widget(placeholder, chunks[2]);
        } else {
            let items: Vec<ListItem> = visible.iter().map(|e| Self::entry_item(e)).collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Dreams"))
                .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            f.render_stateful_widget(
                list,
                chunks[2],
                &mut ListState::default().with_selected(Some(self.selected)),
            );
        }

        let controls = Line::from(vec![
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" new  "),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" view  "),
            Span::styled("a", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" analyse  "),
            Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" hide  "),
            Span::styled("/", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" search  "),
            Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("/"),
            Span::styled("o", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" sort  "),
            Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit"),
        ]);
        let controls = Paragraph::new(controls)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[3]);
    }

    fn render_new(&mut self, f: &mut Frame, area: Rect) {
        let Mode::New(draft) = &self.mode else {
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(6),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let title = Paragraph::new("Record New Dream")
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let focus = |field| {
            if draft.field == field {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };

        let title_input = Paragraph::new(draft.title.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Title")
                .border_style(focus(DraftField::Title)),
        );
        f.render_widget(title_input, chunks[1]);

        let content_input = Paragraph::new(draft.content.clone())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Describe your dream")
                    .border_style(focus(DraftField::Content)),
            );
        f.render_widget(content_input, chunks[2]);

        let ratings = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Percentage(33),
                    Constraint::Percentage(33),
                    Constraint::Percentage(34),
                ]
                .as_ref(),
            )
            .split(chunks[3]);

        let lucidity = Paragraph::new(format!("{}/5", draft.lucidity_level)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Lucidity")
                .border_style(focus(DraftField::Lucidity)),
        );
        f.render_widget(lucidity, ratings[0]);

        let clarity = Paragraph::new(format!("{}/5", draft.clarity)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Clarity")
                .border_style(focus(DraftField::Clarity)),
        );
        f.render_widget(clarity, ratings[1]);

        let mood = Paragraph::new(draft.mood().label()).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Mood")
                .border_style(focus(DraftField::Mood)),
        );
        f.render_widget(mood, ratings[2]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(16)].as_ref())
            .split(chunks[4]);

        let mut tags_text = draft.tags.join(", ");
        if !draft.tag_input.is_empty() {
            if !tags_text.is_empty() {
                tags_text.push_str(", ");
            }
            tags_text.push_str(&draft.tag_input);
        }
        let tags = Paragraph::new(tags_text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Tags (Enter adds)")
                .border_style(focus(DraftField::Tags)),
        );
        f.render_widget(tags, bottom[0]);

        let recurring = Paragraph::new(if draft.recurring { "[x]" } else { "[ ]" }).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recurring")
                .border_style(focus(DraftField::Recurring)),
        );
        f.render_widget(recurring, bottom[1]);

        let hint = if draft.is_valid() {
            "Tab: next field, Ctrl+S: save, Esc: cancel".to_string()
        } else {
            "Title and content are required. Tab: next field, Esc: cancel".to_string()
        };
        let hint = Paragraph::new(hint)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(hint, chunks[5]);
    }

    fn render_detail(&mut self, f: &mut Frame, area: Rect) {
        let Mode::Detail(id) = &self.mode else {
            return;
        };
        let Some(entry) = self.entries.iter().find(|e| &e.id == id) else {
            // Removed by another view while open.
            self.mode = Mode::List;
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(2),
                    Constraint::Min(6),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(area);

        let title = Paragraph::new(entry.title.clone())
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let mut meta = format!(
            "{} | Lucidity {}/5 | Clarity {}/5 | {}",
            entry.date.format("%A, %B %e %Y"),
            entry.lucidity_level,
            entry.clarity,
            entry.mood.label()
        );
        if !entry.tags.is_empty() {
            meta.push_str(&format!(" | {}", entry.tags.join(", ")));
        }
        let meta = Paragraph::new(meta)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(meta, chunks[1]);

        let content = Paragraph::new(entry.content.clone())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Dream"));
        f.render_widget(content, chunks[2]);

        let controls = Paragraph::new("a: analyse, d: hide from journal, Esc: back")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[3]);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
            .split(area);

        let message = Paragraph::new(
            "Remove this dream from your journal?\nIt will still be available in the history.",
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Confirm"));
        f.render_widget(message, chunks[0]);

        let controls = Paragraph::new("y: remove, n: cancel")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(controls, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_store::MemoryBackend;
    use std::sync::Arc;

    fn view() -> JournalView {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        JournalView::new(store, SyncBus::new())
    }

    fn draft(title: &str, content: &str) -> Draft {
        Draft {
            title: title.into(),
            content: content.into(),
            ..Draft::default()
        }
    }

    #[test]
    fn create_rejects_blank_title_or_content() {
        let mut view = view();
        assert!(!view.create(&draft("   ", "something")));
        assert!(!view.create(&draft("Flying", "  \n ")));
        assert!(view.entries.is_empty());
        assert!(view.create(&draft("Flying", "I flew over mountains")));
        assert_eq!(view.entries.len(), 1);
    }

    #[test]
    fn create_prepends_newest_first() {
        let mut view = view();
        view.create(&draft("First", "one"));
        view.create(&draft("Second", "two"));
        assert_eq!(view.entries[0].title, "Second");
        assert_eq!(view.entries[1].title, "First");
    }

    #[test]
    fn created_ids_are_unique() {
        let mut view = view();
        for i in 0..10 {
            view.create(&draft(&format!("Dream {i}"), "content"));
        }
        let mut ids: Vec<_> = view.entries.iter().map(|e| e.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn soft_delete_keeps_collection_length() {
        let mut view = view();
        view.create(&draft("Flying", "I flew over mountains"));
        let id = view.entries[0].id.clone();

        view.soft_delete(&id);

        assert_eq!(view.entries.len(), 1);
        assert!(!view.entries[0].show_in_journal);
        assert!(view.visible().is_empty());
    }

    #[test]
    fn filter_is_case_insensitive_and_idempotent() {
        let mut view = view();
        view.create(&draft("Flying dream", "over mountains"));
        view.create(&draft("Ocean", "waves"));

        view.query = "DREAM".into();
        let upper: Vec<String> = view.visible().iter().map(|e| e.id.clone()).collect();
        view.query = "dream".into();
        let lower: Vec<String> = view.visible().iter().map(|e| e.id.clone()).collect();
        assert_eq!(upper, lower);
        assert_eq!(lower.len(), 1);

        // Filtering again with the same query changes nothing.
        let again: Vec<String> = view.visible().iter().map(|e| e.id.clone()).collect();
        assert_eq!(lower, again);
    }

    #[test]
    fn filter_matches_tags() {
        let mut view = view();
        let mut d = draft("Untitled", "nothing notable");
        d.tag_input = "Nightmare".into();
        d.add_tag();
        view.create(&d);

        view.query = "nightmare".into();
        assert_eq!(view.visible().len(), 1);
    }

    #[test]
    fn sort_desc_then_asc_reverses() {
        let mut view = view();
        for (i, title) in ["Alpha", "Beta", "Gamma"].iter().enumerate() {
            view.create(&draft(title, "content"));
            // Distinct, strictly increasing creation times.
            let idx = view
                .entries
                .iter()
                .position(|e| e.title == *title)
                .unwrap();
            view.entries[idx].date =
                chrono::Local::now() + chrono::Duration::seconds(i as i64 + 1);
        }

        view.sort_by = SortBy::Date;
        view.sort_order = SortOrder::Desc;
        let desc: Vec<String> = view.visible().iter().map(|e| e.title.clone()).collect();
        view.sort_by = SortBy::Date;
        view.sort_order = SortOrder::Asc;
        let mut asc: Vec<String> = view.visible().iter().map(|e| e.title.clone()).collect();
        asc.reverse();
        assert_eq!(desc, asc);

        view.sort_by = SortBy::Title;
        view.sort_order = SortOrder::Asc;
        let titles: Vec<String> = view.visible().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn draft_suppresses_duplicate_tags() {
        let mut d = Draft::default();
        d.tag_input = "water".into();
        d.add_tag();
        d.tag_input = "water".into();
        d.add_tag();
        d.tag_input = "sky".into();
        d.add_tag();
        assert_eq!(d.tags, vec!["water", "sky"]);
    }

    #[test]
    fn soft_delete_converges_across_views() {
        let store = EntryStore::new(Arc::new(MemoryBackend::new()));
        let bus = SyncBus::new();
        let mut view_a = JournalView::new(store.clone(), bus.clone());
        let mut view_b = JournalView::new(store, bus);

        view_a.create(&draft("Flying", "I flew over mountains"));
        view_b.tick();
        assert_eq!(view_b.entries.len(), 1);
        let id = view_b.entries[0].id.clone();

        view_a.soft_delete(&id);
        view_b.tick();
        assert!(!view_b.entries[0].show_in_journal);
    }

    #[test]
    fn flying_dream_scenario() {
        let mut view = view();
        let mut d = draft("Flying", "I flew over mountains");
        d.lucidity_level = 3;
        d.mood_index = Mood::ALL.iter().position(|m| *m == Mood::Positive).unwrap();
        view.create(&d);

        let visible = view.visible();
        assert_eq!(visible[0].title, "Flying");
        assert_eq!(visible[0].mood, Mood::Positive);

        let id = visible[0].id.clone();
        view.soft_delete(&id);
        assert!(view.visible().is_empty());
        assert_eq!(view.entries.len(), 1);
        assert!(!view.entries[0].show_in_journal);
    }
}
