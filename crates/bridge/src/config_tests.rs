// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::BridgeConfig;

fn no_env(_key: &str) -> Option<String> {
    None
}

// ── defaults ──────────────────────────────────────────────────────────────

#[test]
fn defaults_without_plugin_or_env() {
    let cfg = BridgeConfig::resolve_with(&json!({}), &no_env);
    assert!(cfg.agents.is_empty());
    assert!(!cfg.is_active());
    assert_eq!(cfg.redis_url, "redis://localhost:6379");
    assert_eq!(cfg.timeout_seconds, 120);
    assert_eq!(cfg.consumer_group, "clawdbot-bridge");
    assert!(cfg.consumer_name.starts_with("clawdbot-"));
    assert!(cfg.publisher_url.is_empty());
    assert_eq!(cfg.global_per_hour, 60);
    assert_eq!(cfg.agent_per_hour, 20);
    assert_eq!(cfg.alert_cooldown_seconds, 300);
    assert_eq!(cfg.breaker_threshold, 5);
    assert_eq!(cfg.breaker_cooldown_seconds, 15);
}

// ── plugin-config values ──────────────────────────────────────────────────

#[test]
fn plugin_values_override_defaults() {
    let plugin = json!({
        "agents": ["eng-1", "eng-2"],
        "redisUrl": "redis://broker:6379",
        "timeoutSeconds": 30,
        "consumerGroup": "custom-group",
        "consumerName": "worker-7",
        "rateLimitGlobalPerHour": 10,
        "rateLimitAgentPerHour": 3,
        "rateLimitAlertChatId": "ops",
        "rateLimitAlertCooldown": 60,
        "breakerThreshold": 2,
        "breakerCooldownSeconds": 5,
    });
    let cfg = BridgeConfig::resolve_with(&plugin, &no_env);
    assert_eq!(cfg.agents, vec!["eng-1", "eng-2"]);
    assert!(cfg.is_bridged("eng-1"));
    assert!(!cfg.is_bridged("other"));
    assert_eq!(cfg.redis_url, "redis://broker:6379");
    assert_eq!(cfg.timeout_seconds, 30);
    assert_eq!(cfg.consumer_group, "custom-group");
    assert_eq!(cfg.consumer_name, "worker-7");
    assert_eq!(cfg.global_per_hour, 10);
    assert_eq!(cfg.agent_per_hour, 3);
    assert_eq!(cfg.alert_chat_id, "ops");
    assert_eq!(cfg.alert_cooldown_seconds, 60);
    assert_eq!(cfg.breaker_threshold, 2);
    assert_eq!(cfg.breaker_cooldown_seconds, 5);
}

#[test]
fn agents_accepts_comma_separated_string() {
    let plugin = json!({"agents": "eng-1, eng-2 ,, eng-3"});
    let cfg = BridgeConfig::resolve_with(&plugin, &no_env);
    assert_eq!(cfg.agents, vec!["eng-1", "eng-2", "eng-3"]);
}

// ── env overrides ─────────────────────────────────────────────────────────

#[test]
fn env_wins_over_plugin() {
    let plugin = json!({
        "agents": ["plugin-agent"],
        "redisUrl": "redis://plugin:6379",
        "rateLimitGlobalPerHour": 99,
    });
    let env = |key: &str| -> Option<String> {
        match key {
            "REDIS_BRIDGE_AGENTS" => Some("env-1,env-2".to_owned()),
            "REDIS_URL" => Some("redis://env:6379".to_owned()),
            "RATE_LIMIT_GLOBAL_PER_HOUR" => Some("7".to_owned()),
            _ => None,
        }
    };
    let cfg = BridgeConfig::resolve_with(&plugin, &env);
    assert_eq!(cfg.agents, vec!["env-1", "env-2"]);
    assert_eq!(cfg.redis_url, "redis://env:6379");
    assert_eq!(cfg.global_per_hour, 7);
}

#[test]
fn empty_env_falls_through_to_plugin() {
    let plugin = json!({"redisUrl": "redis://plugin:6379"});
    let env = |key: &str| (key == "REDIS_URL").then(String::new);
    let cfg = BridgeConfig::resolve_with(&plugin, &env);
    assert_eq!(cfg.redis_url, "redis://plugin:6379");
}

#[test]
fn unparseable_number_uses_default() {
    let plugin = json!({"timeoutSeconds": "soon"});
    let cfg = BridgeConfig::resolve_with(&plugin, &no_env);
    assert_eq!(cfg.timeout_seconds, 120);
}
