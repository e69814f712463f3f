//! Per-user "awaiting input" state.
//!
//! Commands such as `/brand` or `/feedback` arm a state; the next free-text
//! message is routed by it and the state returns to idle.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::favorites::UserId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingBrand,
    AwaitingFeedback,
}

/// Where a free-text message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRoute {
    /// Text is a brand name (after `/brand`).
    BrandSearch(String),
    /// Text is feedback for the operators (after `/feedback`).
    Feedback(String),
    /// Ordinary vehicle query.
    Search(String),
}

/// Message counters for `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationUsage {
    pub messages: u64,
    pub unique_users: usize,
}

#[derive(Debug, Default)]
pub struct ConversationTracker {
    states: Mutex<HashMap<UserId, ConversationState>>,
    users: Mutex<HashSet<UserId>>,
    messages: AtomicU64,
}

impl ConversationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, ConversationState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn state(&self, user: UserId) -> ConversationState {
        self.lock().get(&user).copied().unwrap_or_default()
    }

    /// Arm a state, replacing whatever was pending.
    pub fn set(&self, user: UserId, state: ConversationState) {
        let mut states = self.lock();
        if state == ConversationState::Idle {
            states.remove(&user);
        } else {
            states.insert(user, state);
        }
    }

    pub fn await_brand(&self, user: UserId) {
        self.set(user, ConversationState::AwaitingBrand);
    }

    pub fn await_feedback(&self, user: UserId) {
        self.set(user, ConversationState::AwaitingFeedback);
    }

    /// Route a message and consume the pending state.
    pub fn route_text(&self, user: UserId, text: &str) -> TextRoute {
        let text = text.trim().to_string();
        match self.lock().remove(&user).unwrap_or_default() {
            ConversationState::Idle => TextRoute::Search(text),
            ConversationState::AwaitingBrand => TextRoute::BrandSearch(text),
            ConversationState::AwaitingFeedback => TextRoute::Feedback(text),
        }
    }

    /// Count one incoming message from `user`.
    pub fn record(&self, user: UserId) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user);
    }

    #[must_use]
    pub fn usage(&self) -> ConversationUsage {
        ConversationUsage {
            messages: self.messages.load(Ordering::Relaxed),
            unique_users: self.users.lock().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }

    /// Clear the pending state, returning what was cancelled.
    pub fn cancel(&self, user: UserId) -> ConversationState {
        let previous = self.lock().remove(&user).unwrap_or_default();
        tracing::debug!(user, ?previous, "Conversation state cleared");
        previous
    }
}
