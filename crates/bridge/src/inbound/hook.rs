// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `before_reply` hook: correlated RPC to the engine with the full
//! safety envelope in front of it.
//!
//! The hook is total. `None` is the one deliberate pass-through (agent not
//! bridged); every other path returns a reply. A silently dropped error
//! would make the host fall back to its built-in model and hallucinate tool
//! results, so the fallible body is wrapped and any error becomes a
//! user-visible error reply plus a breaker failure.

use std::sync::Arc;

use uuid::Uuid;

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::broker::rpc::EngineRpc;
use crate::broker::{EngineResponse, InboundEntry};
use crate::config::BridgeConfig;
use crate::delivery::MessageSender;
use crate::host::{ChatEvent, HookReply};
use crate::inbound::{
    is_heartbeat, HEARTBEAT_REPLY, MSG_CONNECTION_LOST, MSG_ENGINE_FAILURE,
    MSG_ENGINE_TIMEOUT, MSG_ENGINE_UNAVAILABLE,
};
use crate::limiter::RateLimiter;

/// Bridges inbound chat messages for the configured agents to the engine.
pub struct InboundBridge {
    config: Arc<BridgeConfig>,
    rpc: Arc<dyn EngineRpc>,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
    sender: Arc<dyn MessageSender>,
}

impl InboundBridge {
    pub fn new(
        config: Arc<BridgeConfig>,
        rpc: Arc<dyn EngineRpc>,
        breaker: Arc<CircuitBreaker>,
        limiter: Arc<RateLimiter>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self { config, rpc, breaker, limiter, sender }
    }

    /// Handle one `before_reply` event. `None` passes the message through
    /// to the host; `Some` short-circuits the host's reply.
    pub async fn before_reply(&self, event: &ChatEvent) -> Option<HookReply> {
        if !self.config.is_bridged(&event.agent) {
            return None;
        }

        if is_heartbeat(&event.body) {
            tracing::debug!(agent = %event.agent, "heartbeat answered locally");
            return Some(HookReply::text(HEARTBEAT_REPLY));
        }

        if let Some(denied) = self.limiter.acquire(&event.agent) {
            tracing::warn!(agent = %event.agent, reason = denied.reason(), "request rate-limited");
            self.limiter.spawn_alert(Arc::clone(&self.sender), &denied, &event.agent);
            return Some(HookReply::error(denied.user_message()));
        }

        match self.breaker.state() {
            BreakerState::Open => {
                tracing::warn!(agent = %event.agent, "circuit open, request short-circuited");
                return Some(HookReply::error(MSG_ENGINE_UNAVAILABLE));
            }
            BreakerState::HalfOpen => {
                tracing::info!(agent = %event.agent, "circuit half-open, letting one probe through");
            }
            BreakerState::Closed => {}
        }

        let correlation_id = Uuid::new_v4().to_string();
        let reply = match self.exchange(event, &correlation_id).await {
            Ok(reply) => reply,
            Err(e) => {
                self.breaker.record_failure();
                tracing::error!(
                    correlation_id = %correlation_id,
                    agent = %event.agent,
                    err = %e,
                    "inbound bridge failed"
                );
                HookReply::error(MSG_ENGINE_FAILURE)
            }
        };
        Some(reply)
    }

    /// The broker round-trip. Expected failure modes are mapped to replies
    /// here; only genuinely unexpected errors bubble up to the wrapper.
    async fn exchange(&self, event: &ChatEvent, correlation_id: &str) -> anyhow::Result<HookReply> {
        if !self.rpc.ensure_ready().await {
            self.breaker.record_failure();
            return Ok(HookReply::error(MSG_CONNECTION_LOST));
        }

        let entry = InboundEntry::from_event(event, correlation_id);
        self.rpc.append_inbound(&entry).await?;

        let raw = self
            .rpc
            .await_response(correlation_id, self.config.response_timeout())
            .await?;
        let Some(raw) = raw else {
            self.breaker.record_failure();
            tracing::warn!(
                correlation_id,
                timeout_s = self.config.timeout_seconds,
                "engine response timed out"
            );
            return Ok(HookReply::error(MSG_ENGINE_TIMEOUT));
        };

        let response = EngineResponse::parse(&raw);
        if let Some(error) = response.error {
            tracing::warn!(correlation_id, err = %error, "engine reported an error");
            return Ok(HookReply::error(format!("Engine error: {error}")));
        }

        self.breaker.record_success();
        Ok(HookReply::text(response.text))
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
