// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker connection supervisor.
//!
//! Two multiplexed connections are held open: `cmd` for appends, acks, and
//! group management, and `blocking` reserved for BLPOP and XREADGROUP BLOCK,
//! since a blocked command on a shared connection would serialize all other
//! traffic. Plain multiplexed connections are used instead of the driver's
//! reconnecting manager so no per-command retry interferes with blocking
//! reads; repair is this supervisor's job.
//!
//! Readiness is re-derived with a PING on every query, never cached: a
//! connection can die without any observable event on the handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;

/// Overall deadline for the initial connect of both connections.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for a single readiness PING.
const PING_TIMEOUT: Duration = Duration::from_secs(1);
/// How long `ensure_connected` waits for readiness, and at what granularity.
const REPAIR_WINDOW: Duration = Duration::from_secs(3);
const REPAIR_POLL: Duration = Duration::from_millis(200);

/// Supervises the two broker connections and repairs them on demand.
pub struct BrokerSupervisor {
    client: redis::Client,
    cmd: RwLock<Option<MultiplexedConnection>>,
    blocking: RwLock<Option<MultiplexedConnection>>,
    /// Single-flight guard: one task repairs, the rest poll for readiness.
    reconnect_in_flight: AtomicBool,
}

impl BrokerSupervisor {
    /// Create a lazy supervisor; no connection is made until [`connect`].
    ///
    /// [`connect`]: BrokerSupervisor::connect
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("invalid broker URL {redis_url}"))?;
        Ok(Self {
            client,
            cmd: RwLock::new(None),
            blocking: RwLock::new(None),
            reconnect_in_flight: AtomicBool::new(false),
        })
    }

    /// Establish both connections. Service start aborts on failure.
    pub async fn connect(&self) -> anyhow::Result<()> {
        let open_both = async {
            let cmd = self.client.get_multiplexed_async_connection().await?;
            let blocking = self.client.get_multiplexed_async_connection().await?;
            Ok::<_, redis::RedisError>((cmd, blocking))
        };
        let (cmd, blocking) = tokio::time::timeout(CONNECT_TIMEOUT, open_both)
            .await
            .context("broker connect timed out")?
            .context("broker connect failed")?;

        *self.cmd.write().await = Some(cmd);
        *self.blocking.write().await = Some(blocking);
        tracing::info!("broker connections established");
        Ok(())
    }

    /// Connection for non-blocking commands.
    pub async fn cmd(&self) -> anyhow::Result<MultiplexedConnection> {
        self.cmd.read().await.clone().context("broker not connected")
    }

    /// Connection reserved for blocking reads.
    pub async fn blocking(&self) -> anyhow::Result<MultiplexedConnection> {
        self.blocking.read().await.clone().context("broker not connected")
    }

    async fn slot_ready(slot: &RwLock<Option<MultiplexedConnection>>) -> bool {
        let Some(mut conn) = slot.read().await.clone() else {
            return false;
        };
        let ping = async move {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            pong
        };
        matches!(tokio::time::timeout(PING_TIMEOUT, ping).await, Ok(Ok(_)))
    }

    /// Probe both connections. Derived fresh on every call.
    pub async fn is_ready(&self) -> bool {
        Self::slot_ready(&self.cmd).await && Self::slot_ready(&self.blocking).await
    }

    async fn await_ready(&self) -> bool {
        let mut elapsed = Duration::ZERO;
        loop {
            if self.is_ready().await {
                return true;
            }
            if elapsed >= REPAIR_WINDOW {
                return false;
            }
            tokio::time::sleep(REPAIR_POLL).await;
            elapsed += REPAIR_POLL;
        }
    }

    async fn reopen_slot(&self, name: &str, slot: &RwLock<Option<MultiplexedConnection>>) {
        if Self::slot_ready(slot).await {
            return;
        }
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                *slot.write().await = Some(conn);
                tracing::info!(connection = name, "broker connection reopened");
            }
            Err(e) => {
                tracing::warn!(connection = name, err = %e, "broker reconnect failed");
            }
        }
    }

    /// Repair the connections if needed; returns whether the broker is ready.
    ///
    /// Only one task performs the actual reconnect; concurrent callers poll
    /// readiness for up to the repair window instead of piling on.
    pub async fn ensure_connected(&self) -> bool {
        if self.is_ready().await {
            return true;
        }

        if self.reconnect_in_flight.swap(true, Ordering::AcqRel) {
            return self.await_ready().await;
        }

        tracing::warn!("broker unready, reconnecting");
        self.reopen_slot("cmd", &self.cmd).await;
        self.reopen_slot("blocking", &self.blocking).await;
        let ready = self.await_ready().await;
        if ready {
            tracing::info!("broker connection restored");
        } else {
            tracing::error!("broker connection could not be restored");
        }
        self.reconnect_in_flight.store(false, Ordering::Release);
        ready
    }

    /// Drop both connections. Always clean; nothing to flush.
    pub async fn close(&self) {
        self.cmd.write().await.take();
        self.blocking.write().await.take();
        tracing::debug!("broker connections closed");
    }
}
