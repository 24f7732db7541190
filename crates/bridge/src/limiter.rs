// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window rate limiter: one global 1-hour window plus one window per
//! agent, all guarded by a single mutex so a check+record pair for the same
//! request never interleaves with another task's.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::delivery::MessageSender;

/// Window length for both the global and per-agent limits.
const WINDOW: Duration = Duration::from_secs(3600);

/// Alerts are delivered to the operator chat over this channel.
const ALERT_CHANNEL: &str = "telegram";

/// Which limit a denied request hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitExceeded {
    Agent(String),
    Global,
}

impl LimitExceeded {
    /// User-facing reply text for a denied request.
    pub fn user_message(&self) -> String {
        match self {
            Self::Agent(agent) => {
                format!("⏳ Limite horaire atteinte pour {agent}. Réessayez plus tard.")
            }
            Self::Global => "⏳ Limite horaire globale atteinte. Réessayez plus tard.".to_owned(),
        }
    }

    /// Short reason used in operator alerts and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Agent(_) => "agent limit",
            Self::Global => "global limit",
        }
    }
}

/// Current window sizes, for logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStats {
    pub global_count: usize,
    /// Agents with a non-empty window only.
    pub per_agent: HashMap<String, usize>,
}

#[derive(Default)]
struct Windows {
    global: VecDeque<Instant>,
    per_agent: HashMap<String, VecDeque<Instant>>,
    last_alert: Option<Instant>,
}

impl Windows {
    /// Drop entries older than one hour from the global window and the given
    /// agent's window.
    fn prune(&mut self, agent: &str, now: Instant) {
        let cutoff = now.checked_sub(WINDOW);
        let expired = |ts: &Instant| cutoff.is_some_and(|c| *ts < c);
        while self.global.front().is_some_and(expired) {
            self.global.pop_front();
        }
        if let Some(window) = self.per_agent.get_mut(agent) {
            while window.front().is_some_and(expired) {
                window.pop_front();
            }
            if window.is_empty() {
                self.per_agent.remove(agent);
            }
        }
    }
}

/// Sliding-window rate limiter with rate-limited operator alerting.
pub struct RateLimiter {
    global_per_hour: usize,
    agent_per_hour: usize,
    alert_chat_id: String,
    alert_cooldown: Duration,
    state: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(
        global_per_hour: usize,
        agent_per_hour: usize,
        alert_chat_id: impl Into<String>,
        alert_cooldown: Duration,
    ) -> Self {
        Self {
            global_per_hour,
            agent_per_hour,
            alert_chat_id: alert_chat_id.into(),
            alert_cooldown,
            state: Mutex::new(Windows::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        // A poisoned limiter mutex only means a panicking test thread; the
        // window data is still sound.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_locked(
        &self,
        windows: &mut Windows,
        agent: &str,
        now: Instant,
    ) -> Option<LimitExceeded> {
        windows.prune(agent, now);
        let agent_count = windows.per_agent.get(agent).map_or(0, VecDeque::len);
        if agent_count >= self.agent_per_hour {
            return Some(LimitExceeded::Agent(agent.to_owned()));
        }
        if windows.global.len() >= self.global_per_hour {
            return Some(LimitExceeded::Global);
        }
        None
    }

    fn record_locked(windows: &mut Windows, agent: &str, now: Instant) {
        windows.global.push_back(now);
        windows.per_agent.entry(agent.to_owned()).or_default().push_back(now);
    }

    /// Prune and check without recording.
    pub fn check(&self, agent: &str) -> Option<LimitExceeded> {
        let mut windows = self.lock();
        self.check_locked(&mut windows, agent, Instant::now())
    }

    /// Charge one request to both windows. Call only after a successful check.
    pub fn record(&self, agent: &str) {
        let mut windows = self.lock();
        Self::record_locked(&mut windows, agent, Instant::now());
    }

    /// Check and, when allowed, record, under a single lock acquisition.
    pub fn acquire(&self, agent: &str) -> Option<LimitExceeded> {
        let now = Instant::now();
        let mut windows = self.lock();
        let denied = self.check_locked(&mut windows, agent, now);
        if denied.is_none() {
            Self::record_locked(&mut windows, agent, now);
        }
        denied
    }

    /// Snapshot of current window sizes.
    pub fn stats(&self) -> LimiterStats {
        let windows = self.lock();
        LimiterStats {
            global_count: windows.global.len(),
            per_agent: windows
                .per_agent
                .iter()
                .filter(|(_, w)| !w.is_empty())
                .map(|(agent, w)| (agent.clone(), w.len()))
                .collect(),
        }
    }

    /// Fire-and-forget operator alert, rate-limited by the alert cooldown.
    /// Failures are logged, never raised.
    pub fn spawn_alert(&self, sender: Arc<dyn MessageSender>, denied: &LimitExceeded, agent: &str) {
        if self.alert_chat_id.is_empty() {
            return;
        }
        {
            let mut windows = self.lock();
            let now = Instant::now();
            let cooled =
                windows.last_alert.is_none_or(|t| now.duration_since(t) >= self.alert_cooldown);
            if !cooled {
                return;
            }
            windows.last_alert = Some(now);
        }

        let chat_id = self.alert_chat_id.clone();
        let body = format!("⚠️ Limite de débit: {} (agent {agent})", denied.reason());
        tokio::spawn(async move {
            if let Err(e) = sender.send(ALERT_CHANNEL, &chat_id, &body, None).await {
                tracing::warn!(err = %e, "rate-limit alert delivery failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
