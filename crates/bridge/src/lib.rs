// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clawbridge: bidirectional message bridge between a chat gateway and an
//! out-of-process conversational engine over Redis Streams.
//!
//! Inbound, chat messages for the bridged agents are diverted by the
//! `before_reply` hook, appended to the inbound stream, and answered from a
//! per-request rendezvous key. Outbound, a background worker consumes the
//! outbound stream via a consumer group and fans entries out to end users
//! through the gateway's delivery CLI. A circuit breaker, a sliding-window
//! rate limiter, and a self-repairing broker supervisor sit in front of the
//! inbound path.

pub mod breaker;
pub mod broker;
pub mod config;
pub mod delivery;
pub mod host;
pub mod inbound;
pub mod limiter;
pub mod outbound;
pub mod publisher;
pub mod splitter;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::breaker::CircuitBreaker;
use crate::broker::queue::RedisOutboundQueue;
use crate::broker::rpc::{EngineRpc, RedisRpc};
use crate::broker::supervisor::BrokerSupervisor;
use crate::config::BridgeConfig;
use crate::delivery::{CliSender, MessageSender};
use crate::inbound::{bridge_tool, BridgeTool, InboundBridge};
use crate::limiter::RateLimiter;
use crate::outbound::OutboundWorker;
use crate::publisher::ContentPublisher;

/// The assembled plugin: hook, tool factory, and background service.
pub struct BridgePlugin {
    config: Arc<BridgeConfig>,
    supervisor: Arc<BrokerSupervisor>,
    rpc: Arc<dyn EngineRpc>,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
    sender: Arc<dyn MessageSender>,
    publisher: Option<Arc<ContentPublisher>>,
    shutdown: CancellationToken,
}

impl BridgePlugin {
    /// Build all collaborators and establish the broker connections.
    /// Registration aborts if the broker is unreachable.
    pub async fn connect(config: BridgeConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(config.is_active(), "no bridged agents configured");

        let supervisor = Arc::new(BrokerSupervisor::new(&config.redis_url)?);
        supervisor.connect().await?;

        let breaker = Arc::new(CircuitBreaker::new(
            config.breaker_threshold,
            config.breaker_cooldown(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            config.global_per_hour,
            config.agent_per_hour,
            config.alert_chat_id.clone(),
            config.alert_cooldown(),
        ));
        let sender: Arc<dyn MessageSender> = Arc::new(CliSender::resolve().await);
        let publisher = ContentPublisher::from_config(&config).map(Arc::new);
        let rpc: Arc<dyn EngineRpc> = Arc::new(RedisRpc::new(Arc::clone(&supervisor)));

        tracing::info!(
            agents = ?config.agents,
            redis_url = %config.redis_url,
            publishing = publisher.is_some(),
            "bridge plugin connected"
        );

        Ok(Self {
            config: Arc::new(config),
            supervisor,
            rpc,
            breaker,
            limiter,
            sender,
            publisher,
            shutdown: CancellationToken::new(),
        })
    }

    /// The `before_reply` hook instance to register with the host.
    pub fn hook(&self) -> InboundBridge {
        InboundBridge::new(
            Arc::clone(&self.config),
            Arc::clone(&self.rpc),
            Arc::clone(&self.breaker),
            Arc::clone(&self.limiter),
            Arc::clone(&self.sender),
        )
    }

    /// Tool factory: the `redis_bridge` tool for a bridged agent, or `None`.
    pub fn tool(&self, agent: &str) -> Option<BridgeTool> {
        bridge_tool(agent, &self.config, Arc::clone(&self.rpc))
    }

    /// Start the outbound delivery worker as a background task.
    pub async fn start_outbound(&self) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        let queue = Arc::new(RedisOutboundQueue::new(
            Arc::clone(&self.supervisor),
            &self.config.consumer_group,
            &self.config.consumer_name,
        ));
        let worker = OutboundWorker::new(
            queue,
            Arc::clone(&self.sender),
            self.publisher.clone(),
            self.shutdown.child_token(),
        );
        worker.start().await?;
        tracing::info!(
            group = %self.config.consumer_group,
            consumer = %self.config.consumer_name,
            "outbound worker starting"
        );
        Ok(tokio::spawn(worker.run()))
    }

    /// Stop background work and drop the broker connections.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.supervisor.close().await;
    }
}

/// Run the bridge standalone until interrupted.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let plugin = BridgePlugin::connect(config).await?;
    let worker = plugin.start_outbound().await?;
    tracing::info!("clawbridge running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    plugin.shutdown().await;
    let _ = worker.await;
    Ok(())
}
