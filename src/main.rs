//! garoon-sync — one-way sync of Garoon events into an Outlook calendar.
//!
//! Each run re-derives the full state from both calendars: fetch the
//! window from Garoon and Outlook, diff, then apply deletes, updates,
//! and creates against Outlook. Garoon is the sole source of truth for
//! mirrored events; a failed run is retried by the next invocation.

mod config;
mod diff;
mod event;
mod period;
mod providers;

use anyhow::Result;
use period::SyncWindow;
use providers::garoon::GaroonClient;
use providers::outlook::{EventChanges, OutlookClient};

/// Number of weeks ahead to sync.
const SYNC_WEEKS: i64 = 2;

/// Maximum events fetched from either calendar per run.
const MAX_EVENT_NUM: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match config::load()? {
        Some(config) => config,
        None => {
            println!(
                "No config file: put {} in the working directory or your home directory",
                config::CONFIG_FILE
            );
            return Ok(());
        }
    };

    // A failed fetch or write aborts the run; there is no partial state
    // to clean up, so the process still exits cleanly.
    if let Err(error) = run(&config).await {
        eprintln!("Sync aborted: {:#}", error);
    }

    Ok(())
}

async fn run(config: &config::Config) -> Result<()> {
    let window = SyncWindow::next_weeks(SYNC_WEEKS);

    let garoon = GaroonClient::new(config, MAX_EVENT_NUM);
    let garoon_events = garoon.fetch_events(&window).await?;

    let outlook = OutlookClient::connect(config, MAX_EVENT_NUM).await?;
    let outlook_events = outlook.fetch_events(&window).await?;

    println!(
        "Fetched {} Garoon events, {} Outlook events",
        garoon_events.total(),
        outlook_events.total()
    );

    let plan = diff::compute(&garoon_events.native, &outlook_events.garoon_mirrors);

    if plan.is_empty() {
        println!("Everything up to date.");
        return Ok(());
    }

    let mut created = 0;
    let mut updated = 0;
    let mut deleted = 0;

    // Orphaned mirrors go first, before anything is created or updated.
    for key in &plan.to_delete {
        let mirror = &outlook_events.garoon_mirrors[key];
        println!("  - {} {}", key, mirror.subject);
        outlook.delete_event(&mirror.id).await?;
        deleted += 1;
    }

    for key in &plan.to_update {
        let source = &garoon_events.native[key];
        let mirror = &outlook_events.garoon_mirrors[key];
        let changes = EventChanges::compute(Some(mirror), key, source, &config.event_url)?;

        // An untouched mirror produces an empty change set; skip the write.
        if changes.is_empty() {
            continue;
        }

        println!("  ~ {} {}", key, source.subject);
        outlook.update_event(&mirror.id, &changes).await?;
        updated += 1;
    }

    for key in &plan.to_create {
        let source = &garoon_events.native[key];
        let changes = EventChanges::compute(None, key, source, &config.event_url)?;

        println!("  + {} {}", key, source.subject);
        outlook.create_event(&changes).await?;
        created += 1;
    }

    println!("{} created, {} updated, {} deleted", created, updated, deleted);

    Ok(())
}
