// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer-group access to the outbound stream.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::streams::{StreamPendingCountReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::broker::supervisor::BrokerSupervisor;
use crate::broker::STREAM_OUTBOUND;

/// Entries per consumer-group read.
const READ_COUNT: usize = 10;
/// Block time of one consumer-group read, milliseconds.
const READ_BLOCK_MS: usize = 5000;

/// Raw entry id plus its flat field map.
pub type RawEntry = (String, HashMap<String, String>);

/// Consumer-group operations used by the outbound worker.
#[async_trait]
pub trait OutboundQueue: Send + Sync {
    /// Create the consumer group at stream offset 0, creating the stream if
    /// missing. An already-existing group is not an error.
    async fn create_group(&self) -> anyhow::Result<()>;

    /// Blocking read of new entries for this consumer.
    async fn read_batch(&self) -> anyhow::Result<Vec<RawEntry>>;

    /// Acknowledge one entry.
    async fn ack(&self, entry_id: &str) -> anyhow::Result<()>;

    /// How many times the entry has been delivered, per the pending list.
    /// Best-effort: `None` on any inspection problem, and the caller must
    /// proceed to delivery.
    async fn delivery_count(&self, entry_id: &str) -> Option<u64>;
}

/// [`OutboundQueue`] over Redis Streams.
pub struct RedisOutboundQueue {
    supervisor: Arc<BrokerSupervisor>,
    group: String,
    consumer: String,
}

impl RedisOutboundQueue {
    pub fn new(supervisor: Arc<BrokerSupervisor>, group: &str, consumer: &str) -> Self {
        Self { supervisor, group: group.to_owned(), consumer: consumer.to_owned() }
    }
}

#[async_trait]
impl OutboundQueue for RedisOutboundQueue {
    async fn create_group(&self) -> anyhow::Result<()> {
        let mut conn = self.supervisor.cmd().await?;
        let created: Result<String, redis::RedisError> =
            conn.xgroup_create_mkstream(STREAM_OUTBOUND, &self.group, "0").await;
        match created {
            Ok(_) => {
                tracing::info!(group = %self.group, "outbound consumer group created");
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                tracing::debug!(group = %self.group, "outbound consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_batch(&self) -> anyhow::Result<Vec<RawEntry>> {
        let mut conn = self.supervisor.blocking().await?;
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(READ_COUNT)
            .block(READ_BLOCK_MS);
        // Cursor ">": only entries never delivered to this group.
        let reply: StreamReadReply =
            conn.xread_options(&[STREAM_OUTBOUND], &[">"], &options).await?;

        let mut batch = Vec::new();
        for key in reply.keys {
            for entry in key.ids {
                let mut fields = HashMap::with_capacity(entry.map.len());
                for (name, value) in &entry.map {
                    if let Ok(value) = redis::from_redis_value::<String>(value) {
                        fields.insert(name.clone(), value);
                    }
                }
                batch.push((entry.id, fields));
            }
        }
        Ok(batch)
    }

    async fn ack(&self, entry_id: &str) -> anyhow::Result<()> {
        let mut conn = self.supervisor.cmd().await?;
        let _acked: u64 = conn.xack(STREAM_OUTBOUND, &self.group, &[entry_id]).await?;
        Ok(())
    }

    async fn delivery_count(&self, entry_id: &str) -> Option<u64> {
        let mut conn = match self.supervisor.cmd().await {
            Ok(conn) => conn,
            Err(_) => return None,
        };
        // Same id as range start and end: inspect this one entry only.
        let reply: StreamPendingCountReply = match conn
            .xpending_count(STREAM_OUTBOUND, &self.group, entry_id, entry_id, 1)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(entry_id, err = %e, "pending inspection failed");
                return None;
            }
        };
        reply.ids.first().map(|pending| pending.times_delivered as u64)
    }
}
