// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-facing data model: stream names, entry codecs, and the engine
//! response envelope. Every stream field is a string on the wire.

pub mod queue;
pub mod rpc;
pub mod supervisor;

use std::collections::HashMap;

use serde::Deserialize;

use crate::host::ChatEvent;

/// Requests from the gateway to the engine.
pub const STREAM_INBOUND: &str = "bridge:inbound";
/// Engine-originated messages fanned out to end users.
pub const STREAM_OUTBOUND: &str = "bridge:outbound";
/// Single-use rendezvous list keys, one per correlation id.
pub const RESPONSE_KEY_PREFIX: &str = "bridge:response:";
pub const PROTOCOL_VERSION: &str = "1";

pub fn response_key(correlation_id: &str) -> String {
    format!("{RESPONSE_KEY_PREFIX}{correlation_id}")
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One request appended to [`STREAM_INBOUND`].
#[derive(Debug, Clone)]
pub struct InboundEntry {
    pub correlation_id: String,
    pub message: String,
    pub from: String,
    pub agent: String,
    pub channel: String,
    pub account_id: String,
    pub sender_name: Option<String>,
    pub sender_username: Option<String>,
    pub sender_id: Option<String>,
    pub transcript: Option<String>,
    pub session_key: String,
    /// Millis since epoch, as a decimal string on the wire.
    pub timestamp: u64,
}

impl InboundEntry {
    /// Entry for a gateway chat message.
    pub fn from_event(event: &ChatEvent, correlation_id: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_owned(),
            message: event.body.clone(),
            from: event.from.clone(),
            agent: event.agent.clone(),
            channel: event.channel.clone(),
            account_id: event.account_id.clone(),
            sender_name: event.sender_name.clone(),
            sender_username: event.sender_username.clone(),
            sender_id: event.sender_id.clone(),
            transcript: event.transcript.clone(),
            session_key: event.session_key(),
            timestamp: epoch_ms(),
        }
    }

    /// Entry for an explicit tool invocation; sender is the proxy itself.
    pub fn proxy(agent: &str, message: &str, correlation_id: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_owned(),
            message: message.to_owned(),
            from: "proxy".to_owned(),
            agent: agent.to_owned(),
            channel: "proxy".to_owned(),
            account_id: String::new(),
            sender_name: None,
            sender_username: None,
            sender_id: None,
            transcript: None,
            session_key: format!("proxy::{agent}"),
            timestamp: epoch_ms(),
        }
    }

    /// Flat field/value pairs for XADD. The mandatory set is always present;
    /// optional fields are appended only when provided by the host.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("correlationId".to_owned(), self.correlation_id.clone()),
            ("message".to_owned(), self.message.clone()),
            ("from".to_owned(), self.from.clone()),
            ("agent".to_owned(), self.agent.clone()),
            ("channel".to_owned(), self.channel.clone()),
            ("accountId".to_owned(), self.account_id.clone()),
            ("sessionKey".to_owned(), self.session_key.clone()),
            ("timestamp".to_owned(), self.timestamp.to_string()),
            ("protocolVersion".to_owned(), PROTOCOL_VERSION.to_owned()),
        ];
        let optional = [
            ("senderName", &self.sender_name),
            ("senderUsername", &self.sender_username),
            ("senderId", &self.sender_id),
            ("transcript", &self.transcript),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                fields.push((key.to_owned(), value.clone()));
            }
        }
        fields
    }
}

/// One entry consumed from [`STREAM_OUTBOUND`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEntry {
    pub agent: String,
    pub channel: String,
    pub to: String,
    pub message: String,
    pub account_id: Option<String>,
    pub timestamp: Option<String>,
}

impl OutboundEntry {
    /// Decode the flat field map. `Err` names the first missing required
    /// field; the worker acknowledges and discards such entries.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, &'static str> {
        let required = |key: &'static str| -> Result<String, &'static str> {
            match fields.get(key).filter(|v| !v.is_empty()) {
                Some(value) => Ok(value.clone()),
                None => Err(key),
            }
        };
        Ok(Self {
            message: required("message")?,
            to: required("to")?,
            channel: required("channel")?,
            agent: fields.get("agent").cloned().unwrap_or_default(),
            account_id: fields.get("accountId").filter(|v| !v.is_empty()).cloned(),
            timestamp: fields.get("timestamp").cloned(),
        })
    }
}

/// Engine reply popped from a rendezvous key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResponse {
    pub text: String,
    pub error: Option<String>,
}

impl EngineResponse {
    /// Parse the raw list element: a JSON object `{"text", "error"?}` is
    /// preferred, anything else is treated as bare reply text.
    pub fn parse(raw: &str) -> Self {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            text: Option<String>,
            #[serde(default)]
            error: Option<String>,
        }

        match serde_json::from_str::<Wire>(raw) {
            Ok(wire) => Self {
                text: wire.text.unwrap_or_else(|| raw.to_owned()),
                error: wire.error,
            },
            Err(_) => Self { text: raw.to_owned(), error: None },
        }
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
