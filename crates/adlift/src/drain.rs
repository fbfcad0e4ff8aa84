// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adlift drain`: deliver every queued package, then stop.

use std::sync::Arc;
use std::time::Duration;

use adlift_config::AdliftConfig;
use adlift_core::{AdliftError, DeviceInfo};
use adlift_net::HttpTransport;
use adlift_pipeline::ActivityHandler;
use tracing::info;

/// Stop waiting for the queues after this long.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(config: &AdliftConfig) -> Result<(), AdliftError> {
    let transport = HttpTransport::new(
        config.network.base_url.clone(),
        Duration::from_secs(config.network.timeout_secs),
    )?;

    let handler =
        ActivityHandler::init(config.clone(), host_device(), Arc::new(transport)).await?;

    let (packages, clicks) = handler.queue_depths().await;
    if packages == 0 && clicks == 0 {
        println!("nothing queued");
        return Ok(());
    }
    info!(packages, clicks, "draining queues");
    handler.resume_delivery().await;

    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    loop {
        let (packages, clicks) = handler.queue_depths().await;
        if packages == 0 && clicks == 0 {
            println!("queues drained");
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            println!("timed out with {packages} packages and {clicks} clicks still queued");
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    handler.teardown(false).await;
    Ok(())
}

/// Minimal device snapshot for a host-side drain; the pipeline omits
/// whatever the host cannot provide.
pub(crate) fn host_device() -> DeviceInfo {
    DeviceInfo {
        os_name: std::env::consts::OS.to_string(),
        os_version: String::new(),
        device_type: "host".to_string(),
        device_name: std::env::consts::ARCH.to_string(),
        language: String::new(),
        country: String::new(),
        bundle_id: String::new(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        hardware_id: None,
    }
}
