// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound delivery worker: at-least-once consumption of the outbound
//! stream via a consumer group.
//!
//! An entry is acknowledged only after every chunk was delivered, so a
//! failed delivery is redelivered by the broker. Entries redelivered past
//! the cap are dead-lettered (acknowledged and dropped with an error log)
//! so one poisoned entry cannot stall the stream forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::queue::OutboundQueue;
use crate::broker::OutboundEntry;
use crate::delivery::MessageSender;
use crate::publisher::ContentPublisher;
use crate::splitter::{split, MAX_MSG_LEN, PUBLISH_THRESHOLD};

/// Deliveries after which an entry is dead-lettered.
const MAX_DELIVERIES: u64 = 5;
/// Delay after a failed read before the next attempt.
const READ_RETRY_DELAY: Duration = Duration::from_millis(3000);
/// Consecutive read failures before the poll loop is torn down and
/// restarted under exponential backoff.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 5;
/// Restart backoff bounds for the outer loop.
const RESTART_BACKOFF_START: Duration = Duration::from_secs(1);
const RESTART_BACKOFF_CAP: Duration = Duration::from_secs(60);

/// Multiply a delay by `(0.5 + rand·0.5)` so multiple instances never retry
/// in lock-step.
fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(0.5 + rand::random::<f64>() * 0.5)
}

/// Consumes the outbound stream and delivers each entry through the CLI.
pub struct OutboundWorker {
    queue: Arc<dyn OutboundQueue>,
    sender: Arc<dyn MessageSender>,
    publisher: Option<Arc<ContentPublisher>>,
    cancel: CancellationToken,
}

impl OutboundWorker {
    pub fn new(
        queue: Arc<dyn OutboundQueue>,
        sender: Arc<dyn MessageSender>,
        publisher: Option<Arc<ContentPublisher>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { queue, sender, publisher, cancel }
    }

    /// One-time startup work; failure here aborts service start.
    pub async fn start(&self) -> anyhow::Result<()> {
        self.queue.create_group().await
    }

    /// Sleep unless cancelled first; returns false when cancelled.
    async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Run until cancelled. The poll loop handles transient read errors
    /// itself; if it tears down anyway, it is restarted here under jittered
    /// exponential backoff.
    pub async fn run(self) {
        let mut backoff = RESTART_BACKOFF_START;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.poll_loop().await {
                Ok(()) => break,
                Err(e) => {
                    let delay = jittered(backoff);
                    tracing::error!(
                        err = %e,
                        delay_ms = delay.as_millis() as u64,
                        "outbound poll loop failed, restarting"
                    );
                    backoff = (backoff * 2).min(RESTART_BACKOFF_CAP);
                    if !self.sleep_unless_cancelled(delay).await {
                        break;
                    }
                }
            }
        }
        tracing::info!("outbound worker stopped");
    }

    /// Inner read loop: `Ok` only on cancellation.
    async fn poll_loop(&self) -> anyhow::Result<()> {
        let mut consecutive_errors: u32 = 0;
        loop {
            let batch = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                batch = self.queue.read_batch() => batch,
            };

            match batch {
                Ok(entries) => {
                    consecutive_errors = 0;
                    for (entry_id, fields) in entries {
                        if self.cancel.is_cancelled() {
                            return Ok(());
                        }
                        self.process_entry(&entry_id, &fields).await;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        return Err(e);
                    }
                    let delay = jittered(READ_RETRY_DELAY);
                    tracing::warn!(
                        err = %e,
                        consecutive_errors,
                        delay_ms = delay.as_millis() as u64,
                        "outbound read failed, retrying"
                    );
                    if !self.sleep_unless_cancelled(delay).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Deliver one entry: decode, dead-letter check, publish/chunk, send,
    /// ack. Never returns an error; ack discipline encodes the outcome.
    pub(crate) async fn process_entry(&self, entry_id: &str, fields: &HashMap<String, String>) {
        let entry = match OutboundEntry::from_fields(fields) {
            Ok(entry) => entry,
            Err(missing) => {
                tracing::warn!(entry_id, missing, "malformed outbound entry, discarding");
                self.ack_best_effort(entry_id).await;
                return;
            }
        };

        if let Some(deliveries) = self.queue.delivery_count(entry_id).await {
            if deliveries > MAX_DELIVERIES {
                tracing::error!(
                    entry_id,
                    deliveries,
                    to = %entry.to,
                    channel = %entry.channel,
                    "Dead-lettering outbound entry after repeated delivery failures"
                );
                self.ack_best_effort(entry_id).await;
                return;
            }
        }

        let mut message = entry.message.clone();
        if message.len() > PUBLISH_THRESHOLD {
            if let Some(publisher) = &self.publisher {
                if let Some(summary) = publisher.publish(&message).await {
                    message = summary;
                }
            }
        }

        for chunk in split(&message, MAX_MSG_LEN) {
            if let Err(e) = self
                .sender
                .send(&entry.channel, &entry.to, &chunk, entry.account_id.as_deref())
                .await
            {
                // No ack: the broker will redeliver and the dead-letter cap
                // bounds the retries.
                tracing::error!(
                    entry_id,
                    to = %entry.to,
                    channel = %entry.channel,
                    err = %e,
                    "outbound delivery failed, leaving entry pending"
                );
                return;
            }
        }

        self.ack_best_effort(entry_id).await;
    }

    async fn ack_best_effort(&self, entry_id: &str) {
        if let Err(e) = self.queue.ack(entry_id).await {
            tracing::error!(entry_id, err = %e, "failed to acknowledge outbound entry");
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
