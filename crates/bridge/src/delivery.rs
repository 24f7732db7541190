// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message delivery through the gateway's CLI child process.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;

/// Preferred gateway binary, probed at startup.
const PRIMARY_BINARY: &str = "openclaw";
/// Fallback when the probe fails.
const FALLBACK_BINARY: &str = "clawdbot";
/// Deadline for the `--version` probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for a single `message send` invocation.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers one message to one recipient on one channel.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(
        &self,
        channel: &str,
        to: &str,
        message: &str,
        account_id: Option<&str>,
    ) -> anyhow::Result<()>;
}

/// [`MessageSender`] backed by the gateway CLI.
pub struct CliSender {
    binary: String,
}

impl CliSender {
    /// Probe `openclaw --version`; fall back to `clawdbot` on any failure.
    pub async fn resolve() -> Self {
        let probe = Command::new(PRIMARY_BINARY)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let binary = match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(status)) if status.success() => PRIMARY_BINARY,
            Ok(Ok(status)) => {
                tracing::warn!(%status, "{PRIMARY_BINARY} probe failed, using {FALLBACK_BINARY}");
                FALLBACK_BINARY
            }
            Ok(Err(e)) => {
                tracing::warn!(err = %e, "{PRIMARY_BINARY} not runnable, using {FALLBACK_BINARY}");
                FALLBACK_BINARY
            }
            Err(_) => {
                tracing::warn!("{PRIMARY_BINARY} probe timed out, using {FALLBACK_BINARY}");
                FALLBACK_BINARY
            }
        };

        tracing::info!(binary, "delivery CLI resolved");
        Self { binary: binary.to_owned() }
    }

    /// Use a specific binary without probing.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[async_trait]
impl MessageSender for CliSender {
    async fn send(
        &self,
        channel: &str,
        to: &str,
        message: &str,
        account_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["message", "send", "--channel", channel, "--target", to, "--message", message]);
        if let Some(account) = account_id {
            cmd.args(["--account", account]);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(SEND_TIMEOUT, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("{} message send timed out after 30s", self.binary))?
            .with_context(|| format!("failed to spawn {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} message send exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}
