//! Reminder subscriptions and the due-time decision.

pub mod dispatch;
pub mod registry;

pub use dispatch::{DuePing, due_users, resolve_zone};
pub use registry::Subscription;
