//! The persisted data model: journal entries and their attached analyses.
//!
//! Entries are stored as a single JSON array. Timestamps are textual on
//! disk (RFC 3339) and temporal in memory; decoding always goes through
//! [`decode_entries`], which fills defaults for fields that older records
//! may lack, so every reader reconstructs the same in-memory shape.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LUCIDITY: u8 = 1;
pub const DEFAULT_CLARITY: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "Very Negative")]
    VeryNegative,
    Negative,
    #[default]
    Neutral,
    Positive,
    #[serde(rename = "Very Positive")]
    VeryPositive,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::VeryNegative,
        Mood::Negative,
        Mood::Neutral,
        Mood::Positive,
        Mood::VeryPositive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::VeryNegative => "Very Negative",
            Mood::Negative => "Negative",
            Mood::Neutral => "Neutral",
            Mood::Positive => "Positive",
            Mood::VeryPositive => "Very Positive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    #[default]
    Interpretation,
    Symbols,
    Advice,
}

impl AnalysisKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisKind::Interpretation => "Interpretation",
            AnalysisKind::Symbols => "Symbols",
            AnalysisKind::Advice => "Advice",
        }
    }
}

/// One AI-generated interpretation attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
}

impl AnalysisRecord {
    /// The chat flow only ever produces interpretations.
    pub fn interpretation(content: String) -> Self {
        AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            content,
            timestamp: Local::now(),
            kind: AnalysisKind::Interpretation,
        }
    }
}

/// One recorded dream. `show_in_journal = false` hides it from the
/// journal view without removing it from storage; only a hard delete in
/// the history view removes it for good.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Local>,
    pub lucidity_level: u8,
    pub clarity: u8,
    pub mood: Mood,
    pub tags: Vec<String>,
    pub recurring: bool,
    /// Newest first.
    pub analysis: Vec<AnalysisRecord>,
    pub show_in_journal: bool,
}

impl JournalEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        title: String,
        content: String,
        lucidity_level: u8,
        clarity: u8,
        mood: Mood,
        tags: Vec<String>,
        recurring: bool,
    ) -> Self {
        JournalEntry {
            id: Uuid::new_v4().to_string(),
            title,
            content,
            date: Local::now(),
            lucidity_level,
            clarity,
            mood,
            tags,
            recurring,
            analysis: Vec::new(),
            show_in_journal: true,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.content.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

// Raw record shapes for decoding. Older records may predate some fields;
// each optional field gets its stated default here rather than at the
// call sites that read the collection.

fn default_lucidity() -> u8 {
    DEFAULT_LUCIDITY
}

fn default_clarity() -> u8 {
    DEFAULT_CLARITY
}

fn default_show_in_journal() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysisRecord {
    id: String,
    content: String,
    timestamp: DateTime<Local>,
    #[serde(rename = "type", default)]
    kind: AnalysisKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJournalEntry {
    id: String,
    title: String,
    content: String,
    date: DateTime<Local>,
    #[serde(default = "default_lucidity")]
    lucidity_level: u8,
    #[serde(default = "default_clarity")]
    clarity: u8,
    #[serde(default)]
    mood: Mood,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    recurring: bool,
    #[serde(default)]
    analysis: Vec<RawAnalysisRecord>,
    #[serde(default = "default_show_in_journal")]
    show_in_journal: bool,
}

impl From<RawJournalEntry> for JournalEntry {
    fn from(raw: RawJournalEntry) -> Self {
        JournalEntry {
            id: raw.id,
            title: raw.title,
            content: raw.content,
            date: raw.date,
            lucidity_level: raw.lucidity_level,
            clarity: raw.clarity,
            mood: raw.mood,
            tags: raw.tags,
            recurring: raw.recurring,
            analysis: raw
                .analysis
                .into_iter()
                .map(|a| AnalysisRecord {
                    id: a.id,
                    content: a.content,
                    timestamp: a.timestamp,
                    kind: a.kind,
                })
                .collect(),
            show_in_journal: raw.show_in_journal,
        }
    }
}

/// Decode the serialized collection, default-filling partial records.
pub fn decode_entries(raw: &str) -> Result<Vec<JournalEntry>, serde_json::Error> {
    let raw_entries: Vec<RawJournalEntry> = serde_json::from_str(raw)?;
    Ok(raw_entries.into_iter().map(JournalEntry::from).collect())
}
