//! Drives webhook retries.
//!
//! Every tick claims the deliveries whose backoff has elapsed and attempts
//! them. Claims are leased with `SKIP LOCKED`, so running this on several
//! replicas is safe.

use std::time::Duration;

use folio_events::WebhookDispatcher;
use tokio_util::sync::CancellationToken;

/// How often due deliveries are polled.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Run the retry loop until `cancel` is triggered.
pub async fn run(dispatcher: WebhookDispatcher, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = POLL_INTERVAL.as_secs(),
        batch_size = dispatcher.config().batch_size,
        "Webhook worker started"
    );

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Webhook worker stopping");
                break;
            }
            _ = interval.tick() => {
                match dispatcher.process_due().await {
                    Ok(0) => {}
                    Ok(attempted) => {
                        tracing::debug!(attempted, "Webhook worker: processed due deliveries");
                    }
                    Err(e) => tracing::error!(error = %e, "Webhook worker: claim failed"),
                }
            }
        }
    }
}
