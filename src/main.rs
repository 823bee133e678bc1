mod chat_service;
mod chat_view;
mod config;
mod entry_store;
mod history_view;
mod journal_entry;
mod journal_view;
mod sync;
mod ui;

use std::path::Path;
use std::sync::Arc;

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use config::Config;
use entry_store::EntryStore;
use sync::SyncBus;
use ui::App;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Stderr belongs to the terminal UI, so logs go to a file.
    let log_file = std::fs::File::create("dream_journal.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    let config = Config::load(Path::new("dream_journal.json"));
    let store = EntryStore::with_file(&config.storage_path);
    let bus = SyncBus::new();

    let mut app = App::new(store, bus, &config)?;
    app.run().await
}
