// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound bridging: the `before_reply` hook and the explicit tool form.

pub mod hook;
pub mod tool;

pub use hook::InboundBridge;
pub use tool::{bridge_tool, BridgeTool};

/// Gateway heartbeats are answered locally with exactly this text.
pub const HEARTBEAT_REPLY: &str = "HEARTBEAT_OK";

/// Substrings that mark a gateway heartbeat. These must never reach the
/// engine, which has no semantics for them and bills every call.
const HEARTBEAT_MARKERS: [&str; 2] = ["HEARTBEAT_OK", "Read HEARTBEAT.md"];

pub(crate) fn is_heartbeat(body: &str) -> bool {
    HEARTBEAT_MARKERS.iter().any(|marker| body.contains(marker))
}

/// User-visible reply when the breaker is open.
pub(crate) const MSG_ENGINE_UNAVAILABLE: &str =
    "⚠️ Le moteur est temporairement indisponible. Réessayez dans quelques instants.";
/// User-visible reply when the broker could not be repaired in time.
pub(crate) const MSG_CONNECTION_LOST: &str =
    "⚠️ Connexion au moteur perdue. Réessayez dans un instant.";
/// User-visible reply on rendezvous timeout.
pub(crate) const MSG_ENGINE_TIMEOUT: &str =
    "The engine did not respond in time. Please try again.";
/// User-visible reply for any unexpected failure in the hook.
pub(crate) const MSG_ENGINE_FAILURE: &str =
    "❌ Le moteur a rencontré une erreur. Réessayez plus tard.";
