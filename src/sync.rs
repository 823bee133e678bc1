//! Cross-view signals: the full entry collection after every mutation,
//! plus the handful of navigation and error signals the views exchange.
//!
//! Ordering guarantee: none beyond last-publish-wins. If two views mutate
//! their in-memory copies before either publishes, whichever saves and
//! publishes second overwrites the other's change. That is the store's
//! actual conflict policy (a known, accepted race), not something this
//! bus papers over.

use tokio::sync::broadcast;

use crate::journal_entry::JournalEntry;

const BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The complete collection after a mutation-and-save. Receivers
    /// replace their in-memory copy wholesale.
    EntriesUpdated(Vec<JournalEntry>),
    /// Open the analysis view pre-seeded with a dream and its entry id.
    AnalyzeDream { content: String, id: String },
    SwitchToAnalysisView,
    /// Transient, non-fatal; shown as a banner by the shell.
    AppError(String),
}

#[derive(Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<AppEvent>,
}

impl SyncBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        SyncBus { tx }
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn publish_entries(&self, entries: &[JournalEntry]) {
        self.send(AppEvent::EntriesUpdated(entries.to_vec()));
    }

    pub fn analyze_dream(&self, content: String, id: String) {
        self.send(AppEvent::AnalyzeDream { content, id });
        self.send(AppEvent::SwitchToAnalysisView);
    }

    pub fn report_error(&self, message: impl Into<String>) {
        self.send(AppEvent::AppError(message.into()));
    }

    fn send(&self, event: AppEvent) {
        // Err only means no receiver is currently mounted.
        let _ = self.tx.send(event);
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        SyncBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_entry::Mood;

    fn sample(title: &str) -> JournalEntry {
        JournalEntry::create(
            title.into(),
            "content".into(),
            1,
            1,
            Mood::Neutral,
            vec![],
            false,
        )
    }

    #[test]
    fn every_subscriber_receives_the_full_collection() {
        let bus = SyncBus::new();
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        bus.publish_entries(&[sample("Flying")]);

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.try_recv().unwrap() {
                AppEvent::EntriesUpdated(entries) => {
                    assert_eq!(entries.len(), 1);
                    assert_eq!(entries[0].title, "Flying");
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn analyze_dream_also_switches_views() {
        let bus = SyncBus::new();
        let mut rx = bus.subscribe();

        bus.analyze_dream("I flew".into(), "abc".into());

        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::AnalyzeDream { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::SwitchToAnalysisView
        ));
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = SyncBus::new();
        bus.publish_entries(&[]);
        bus.report_error("nothing listening");
    }
}
