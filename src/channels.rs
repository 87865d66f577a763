//! Outbound messaging seam.
//!
//! The core never talks to a chat platform directly; it hands a
//! [`ChannelSink`] the user ids to mention and the dashboard text to
//! place, and the sink owns formatting and delivery.

use async_trait::async_trait;

/// Opaque handle to a previously published message, persisted by the
/// core so the dashboard can be edited in place across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// One bundled raid-day ping. All users due in the same tick share a
/// single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPing {
    pub user_ids: Vec<u64>,
}

/// Result of editing a previously published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The message is confirmed deleted; the caller posts a fresh one.
    Gone,
}

/// A chat platform the roster can speak through.
#[async_trait]
pub trait ChannelSink: Send + Sync {
    /// Stable identifier, used in logs.
    fn id(&self) -> &'static str;

    /// Delivers one bundled reminder.
    async fn send_reminder(&self, ping: ReminderPing) -> anyhow::Result<()>;

    /// Posts a new dashboard message and returns its reference.
    async fn publish_dashboard(&self, text: &str) -> anyhow::Result<MessageRef>;

    /// Replaces the text of an existing dashboard message. `Gone` is
    /// an expected outcome, not an error.
    async fn edit_dashboard(&self, message: &MessageRef, text: &str)
    -> anyhow::Result<EditOutcome>;
}
