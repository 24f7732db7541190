// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlated request/response RPC over the broker: append one inbound
//! entry, then block on that request's rendezvous key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::broker::supervisor::BrokerSupervisor;
use crate::broker::{response_key, InboundEntry, STREAM_INBOUND};

/// Engine-side RPC operations used by the hook and the tool.
#[async_trait]
pub trait EngineRpc: Send + Sync {
    /// Repair the broker connection if needed; `false` means unavailable.
    async fn ensure_ready(&self) -> bool;

    /// Append one request to the inbound stream; returns the entry id.
    async fn append_inbound(&self, entry: &InboundEntry) -> anyhow::Result<String>;

    /// Block on the request's rendezvous key. `Ok(None)` means the engine
    /// did not respond within `timeout`. The pop removes the key's single
    /// element atomically.
    async fn await_response(
        &self,
        correlation_id: &str,
        timeout: Duration,
    ) -> anyhow::Result<Option<String>>;
}

/// [`EngineRpc`] over Redis: XADD on the cmd connection, BLPOP on the
/// blocking connection.
pub struct RedisRpc {
    supervisor: Arc<BrokerSupervisor>,
}

impl RedisRpc {
    pub fn new(supervisor: Arc<BrokerSupervisor>) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl EngineRpc for RedisRpc {
    async fn ensure_ready(&self) -> bool {
        self.supervisor.ensure_connected().await
    }

    async fn append_inbound(&self, entry: &InboundEntry) -> anyhow::Result<String> {
        let mut conn = self.supervisor.cmd().await?;
        let fields = entry.to_fields();
        let id: String = conn.xadd(STREAM_INBOUND, "*", &fields).await?;
        tracing::debug!(
            correlation_id = %entry.correlation_id,
            entry_id = %id,
            agent = %entry.agent,
            "inbound entry appended"
        );
        Ok(id)
    }

    async fn await_response(
        &self,
        correlation_id: &str,
        timeout: Duration,
    ) -> anyhow::Result<Option<String>> {
        let mut conn = self.supervisor.blocking().await?;
        let key = response_key(correlation_id);
        let popped: Option<(String, String)> = conn.blpop(&key, timeout.as_secs_f64()).await?;
        Ok(popped.map(|(_, value)| value))
    }
}
