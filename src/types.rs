//! Core types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier a subscription is tracked under.
///
/// Either supplied by the caller or generated by the manager; unique within
/// the combined active and paused registries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        SubscriptionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        SubscriptionId(s.to_string())
    }
}

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        SubscriptionId(s)
    }
}

/// Raw lifecycle signal delivered by the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycleState {
    /// Visible and receiving input.
    Resumed,
    /// Visible but not receiving input (e.g. a system dialog on top).
    Inactive,
    /// Not visible, still running.
    Paused,
    /// Engine running without an attached view.
    Detached,
    /// All views hidden.
    Hidden,
}

impl AppLifecycleState {
    /// Coarse classification used by the subscription manager.
    pub fn phase(self) -> LifecyclePhase {
        match self {
            AppLifecycleState::Resumed => LifecyclePhase::Foreground,
            AppLifecycleState::Inactive
            | AppLifecycleState::Paused
            | AppLifecycleState::Detached
            | AppLifecycleState::Hidden => LifecyclePhase::Background,
        }
    }
}

/// Two-state view of the app lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Foreground,
    Background,
}

/// Diagnostic snapshot of a subscription manager.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStatus {
    /// Whether the manager is attached to a lifecycle source.
    pub initialized: bool,
    /// Last-known coarse lifecycle classification.
    pub backgrounded: bool,
    /// Whether a bulk pause is in effect.
    pub paused: bool,
    /// Subscriptions currently receiving events.
    pub active_count: usize,
    /// Subscriptions currently paused.
    pub paused_count: usize,
}

impl ManagerStatus {
    /// Total number of tracked subscriptions.
    pub fn tracked(&self) -> usize {
        self.active_count + self.paused_count
    }
}
