// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{bridge_tool, BridgeTool};
use crate::broker::rpc::EngineRpc;
use crate::broker::InboundEntry;
use crate::config::BridgeConfig;

#[derive(Default)]
struct FakeRpc {
    responses: Mutex<VecDeque<String>>,
    appended: Mutex<Vec<InboundEntry>>,
}

impl FakeRpc {
    fn queue_response(&self, raw: &str) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(raw.to_owned());
        }
    }

    fn appended(&self) -> Vec<InboundEntry> {
        match self.appended.lock() {
            Ok(entries) => entries.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EngineRpc for FakeRpc {
    async fn ensure_ready(&self) -> bool {
        true
    }

    async fn append_inbound(&self, entry: &InboundEntry) -> anyhow::Result<String> {
        if let Ok(mut entries) = self.appended.lock() {
            entries.push(entry.clone());
        }
        Ok("1-0".to_owned())
    }

    async fn await_response(
        &self,
        _correlation_id: &str,
        _timeout: Duration,
    ) -> anyhow::Result<Option<String>> {
        let next = match self.responses.lock() {
            Ok(mut responses) => responses.pop_front(),
            Err(_) => None,
        };
        Ok(next)
    }
}

fn config() -> BridgeConfig {
    BridgeConfig { agents: vec!["eng-1".to_owned()], ..BridgeConfig::default() }
}

fn tool(rpc: &Arc<FakeRpc>) -> anyhow::Result<BridgeTool> {
    bridge_tool("eng-1", &config(), Arc::clone(rpc) as Arc<dyn EngineRpc>)
        .ok_or_else(|| anyhow::anyhow!("tool should exist for a bridged agent"))
}

// ── factory ───────────────────────────────────────────────────────────────

#[test]
fn factory_returns_none_for_unbridged_agent() {
    let rpc = Arc::new(FakeRpc::default());
    assert!(bridge_tool("other", &config(), rpc).is_none());
}

// ── invoke ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invoke_forwards_as_proxy_and_returns_text() -> anyhow::Result<()> {
    let rpc = Arc::new(FakeRpc::default());
    rpc.queue_response(r#"{"text":"Salut"}"#);

    let text = tool(&rpc)?.invoke("Bonjour").await?;
    assert_eq!(text, "Salut");

    let appended = rpc.appended();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].from, "proxy");
    assert_eq!(appended[0].agent, "eng-1");
    assert_eq!(appended[0].message, "Bonjour");
    Ok(())
}

#[tokio::test]
async fn invoke_rejects_empty_message() -> anyhow::Result<()> {
    let rpc = Arc::new(FakeRpc::default());
    let result = tool(&rpc)?.invoke("   ").await;
    assert!(result.is_err());
    assert!(rpc.appended().is_empty());
    Ok(())
}

#[tokio::test]
async fn invoke_errors_on_timeout() -> anyhow::Result<()> {
    let rpc = Arc::new(FakeRpc::default());
    let result = tool(&rpc)?.invoke("Bonjour").await;
    let Err(e) = result else {
        anyhow::bail!("timeout must surface as an error");
    };
    assert!(e.to_string().contains("did not respond"));
    Ok(())
}

#[tokio::test]
async fn invoke_errors_on_engine_error() -> anyhow::Result<()> {
    let rpc = Arc::new(FakeRpc::default());
    rpc.queue_response(r#"{"error":"boom"}"#);
    let result = tool(&rpc)?.invoke("Bonjour").await;
    let Err(e) = result else {
        anyhow::bail!("engine error must surface as an error");
    };
    assert!(e.to_string().contains("boom"));
    Ok(())
}
