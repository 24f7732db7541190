// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway-host interface types.
//!
//! The gateway itself is an external collaborator; only the shapes it hands
//! to the `before_reply` hook (and expects back) live here.

use serde::{Deserialize, Serialize};

/// An incoming chat message as delivered by the gateway to the hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Identifier of the agent the message is addressed to.
    pub agent: String,
    /// Sender identifier within the channel.
    pub from: String,
    /// Chat channel name (e.g. "telegram", "discord").
    pub channel: String,
    /// Gateway account the message arrived on.
    pub account_id: String,
    /// The user's command body.
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Stable conversation identity. Derived from routing context when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

impl ChatEvent {
    /// Stable identity for the conversation: host-supplied key when present,
    /// otherwise `<channel>:<account_id>:<from>`.
    pub fn session_key(&self) -> String {
        match &self.session_key {
            Some(key) => key.clone(),
            None => format!("{}:{}:{}", self.channel, self.account_id, self.from),
        }
    }
}

/// Reply returned to the host to short-circuit its built-in model.
///
/// `None` from the hook means "pass through"; the host answers normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookReply {
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
}

impl HookReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}
