// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adlift status`: print queue depths and activity-state counters.

use adlift_config::AdliftConfig;
use adlift_core::AdliftError;
use adlift_storage::{PackageStore, StateStore};

pub async fn run(config: &AdliftConfig) -> Result<(), AdliftError> {
    let state_store = StateStore::open(config.storage.state_db_path()).await?;
    let packages = PackageStore::open(config.storage.package_queue_db_path()).await?;
    let clicks = PackageStore::open(config.storage.click_queue_db_path()).await?;

    println!("environment:      {}", config.app.environment);
    println!("package queue:    {}", packages.depth().await?);
    println!("click queue:      {}", clicks.depth().await?);

    match state_store.load_state().await? {
        Some(state) => {
            println!("install uuid:     {}", state.uuid);
            println!("enabled:          {}", state.enabled);
            println!("gdpr forgotten:   {}", state.is_gdpr_forgotten);
            println!("sessions:         {}", state.session_count);
            println!("subsessions:      {}", state.subsession_count);
            println!("events:           {}", state.event_count);
            println!("session length:   {}s", state.session_length_secs);
            println!("time spent:       {}s", state.time_spent_secs);
        }
        None => println!("install:          (no activity recorded yet)"),
    }

    state_store.close().await?;
    packages.close().await?;
    clicks.close().await?;
    Ok(())
}
