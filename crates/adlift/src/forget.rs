// SPDX-FileCopyrightText: 2026 Adlift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adlift forget`: enqueue a forget-me request and deliver it.

use std::sync::Arc;
use std::time::Duration;

use adlift_config::AdliftConfig;
use adlift_core::AdliftError;
use adlift_net::HttpTransport;
use adlift_pipeline::ActivityHandler;

use crate::drain::host_device;

const DELIVER_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(config: &AdliftConfig) -> Result<(), AdliftError> {
    let transport = HttpTransport::new(
        config.network.base_url.clone(),
        Duration::from_secs(config.network.timeout_secs),
    )?;

    let handler =
        ActivityHandler::init(config.clone(), host_device(), Arc::new(transport)).await?;

    handler.gdpr_forget_me().await;

    let deadline = tokio::time::Instant::now() + DELIVER_TIMEOUT;
    loop {
        if handler.queue_depths().await.0 == 0 {
            println!("forget-me delivered; tracking is permanently disabled");
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            println!("forget-me still queued; it will be retried on the next drain");
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    handler.teardown(false).await;
    Ok(())
}
