// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridge configuration, resolved env > plugin-config key > default.

use std::time::Duration;

use serde_json::Value;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_CONSUMER_GROUP: &str = "clawdbot-bridge";
pub const DEFAULT_GLOBAL_PER_HOUR: usize = 60;
pub const DEFAULT_AGENT_PER_HOUR: usize = 20;
pub const DEFAULT_ALERT_COOLDOWN_SECONDS: u64 = 300;
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_COOLDOWN_SECONDS: u64 = 15;

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Agent ids routed through the engine. Empty set = plugin inactive.
    pub agents: Vec<String>,
    pub redis_url: String,
    /// Inbound rendezvous timeout.
    pub timeout_seconds: u64,
    pub consumer_group: String,
    pub consumer_name: String,
    /// Content publisher endpoint; empty disables oversize publishing.
    pub publisher_url: String,
    pub publisher_token: String,
    /// Public base for published links; empty = use the URL the server returns.
    pub publisher_public_url: String,
    pub global_per_hour: usize,
    pub agent_per_hour: usize,
    /// Operator chat for rate-limit alerts; empty disables alerting.
    pub alert_chat_id: String,
    pub alert_cooldown_seconds: u64,
    pub breaker_threshold: u32,
    pub breaker_cooldown_seconds: u64,
}

impl BridgeConfig {
    /// Resolve from the host's plugin-config object with env overrides.
    pub fn resolve(plugin: &Value) -> Self {
        Self::resolve_with(plugin, &|key| std::env::var(key).ok())
    }

    fn resolve_with(plugin: &Value, env: &dyn Fn(&str) -> Option<String>) -> Self {
        let setting = |env_key: &str, plugin_key: &str| -> Option<String> {
            if !env_key.is_empty() {
                if let Some(value) = env(env_key).filter(|v| !v.is_empty()) {
                    return Some(value);
                }
            }
            plugin.get(plugin_key).and_then(scalar_to_string)
        };

        let agents = resolve_agents(plugin, env);
        let consumer_name = setting("", "consumerName")
            .unwrap_or_else(|| format!("clawdbot-{}", std::process::id()));

        Self {
            agents,
            redis_url: setting("REDIS_URL", "redisUrl")
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_owned()),
            timeout_seconds: parse_or(
                setting("", "timeoutSeconds"),
                "timeoutSeconds",
                DEFAULT_TIMEOUT_SECONDS,
            ),
            consumer_group: setting("", "consumerGroup")
                .unwrap_or_else(|| DEFAULT_CONSUMER_GROUP.to_owned()),
            consumer_name,
            publisher_url: setting("CONTENT_PUBLISHER_URL", "contentPublisherUrl")
                .unwrap_or_default(),
            publisher_token: setting("CONTENT_PUBLISHER_TOKEN", "contentPublisherToken")
                .unwrap_or_default(),
            publisher_public_url: setting(
                "CONTENT_PUBLISHER_PUBLIC_URL",
                "contentPublisherPublicUrl",
            )
            .unwrap_or_default(),
            global_per_hour: parse_or(
                setting("RATE_LIMIT_GLOBAL_PER_HOUR", "rateLimitGlobalPerHour"),
                "rateLimitGlobalPerHour",
                DEFAULT_GLOBAL_PER_HOUR,
            ),
            agent_per_hour: parse_or(
                setting("RATE_LIMIT_AGENT_PER_HOUR", "rateLimitAgentPerHour"),
                "rateLimitAgentPerHour",
                DEFAULT_AGENT_PER_HOUR,
            ),
            alert_chat_id: setting("RATE_LIMIT_ALERT_CHAT_ID", "rateLimitAlertChatId")
                .unwrap_or_default(),
            alert_cooldown_seconds: parse_or(
                setting("RATE_LIMIT_ALERT_COOLDOWN", "rateLimitAlertCooldown"),
                "rateLimitAlertCooldown",
                DEFAULT_ALERT_COOLDOWN_SECONDS,
            ),
            breaker_threshold: parse_or(
                setting("", "breakerThreshold"),
                "breakerThreshold",
                DEFAULT_BREAKER_THRESHOLD,
            ),
            breaker_cooldown_seconds: parse_or(
                setting("", "breakerCooldownSeconds"),
                "breakerCooldownSeconds",
                DEFAULT_BREAKER_COOLDOWN_SECONDS,
            ),
        }
    }

    /// The plugin is inert without at least one bridged agent.
    pub fn is_active(&self) -> bool {
        !self.agents.is_empty()
    }

    pub fn is_bridged(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_seconds)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_seconds)
    }
}

impl Default for BridgeConfig {
    /// Pure defaults, ignoring both plugin config and the environment.
    fn default() -> Self {
        Self::resolve_with(&Value::Null, &|_| None)
    }
}

/// Agents come either as a comma-separated string (env or plugin) or as a
/// JSON array of strings (plugin).
fn resolve_agents(plugin: &Value, env: &dyn Fn(&str) -> Option<String>) -> Vec<String> {
    if let Some(raw) = env("REDIS_BRIDGE_AGENTS").filter(|v| !v.is_empty()) {
        return split_csv(&raw);
    }
    match plugin.get("agents") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(raw)) => split_csv(raw),
        _ => Vec::new(),
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr + Copy>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw = %raw, "unparseable config value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
