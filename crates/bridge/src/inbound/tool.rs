// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit `redis_bridge` tool: the opt-in RPC path.
//!
//! Unlike the hook, the tool skips the safety envelope entirely: its caller
//! asked for the engine and should see failures as plain errors.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::broker::rpc::EngineRpc;
use crate::broker::{EngineResponse, InboundEntry};
use crate::config::BridgeConfig;

/// Tool name as registered with the host.
pub const TOOL_NAME: &str = "redis_bridge";

/// One engine exchange on behalf of an explicitly invoking agent.
pub struct BridgeTool {
    agent: String,
    rpc: Arc<dyn EngineRpc>,
    timeout: Duration,
}

/// Tool factory: `None` unless the invoking agent is bridged, so the tool
/// simply does not exist for other agents.
pub fn bridge_tool(
    agent: &str,
    config: &BridgeConfig,
    rpc: Arc<dyn EngineRpc>,
) -> Option<BridgeTool> {
    config.is_bridged(agent).then(|| BridgeTool {
        agent: agent.to_owned(),
        rpc,
        timeout: config.response_timeout(),
    })
}

impl BridgeTool {
    /// Forward `message` to the engine and return its reply text.
    pub async fn invoke(&self, message: &str) -> anyhow::Result<String> {
        let message = message.trim();
        anyhow::ensure!(!message.is_empty(), "message must be a non-empty string");

        let correlation_id = Uuid::new_v4().to_string();
        let entry = InboundEntry::proxy(&self.agent, message, &correlation_id);
        self.rpc.append_inbound(&entry).await?;

        let raw = self
            .rpc
            .await_response(&correlation_id, self.timeout)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("engine did not respond within {}s", self.timeout.as_secs())
            })?;

        let response = EngineResponse::parse(&raw);
        if let Some(error) = response.error {
            anyhow::bail!("engine error: {error}");
        }
        Ok(response.text)
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
