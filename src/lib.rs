//! Raid-day scheduling core.
//!
//! Keeps a rolling multi-month availability window on a spreadsheet-like
//! tabular store and reminds players on raid days, each in their own
//! timezone.
//!
//! # Architecture
//!
//! The pieces compose bottom-up:
//! - **Store**: the [`store::TabularStore`] seam over whatever holds the
//!   sheet, with an in-memory implementation for tests
//! - **Schedule**: window building, the override-preserving refresh and
//!   per-date edits in `schedule`
//! - **Reminders**: the subscription registry and the per-timezone due
//!   decision in `reminders`
//! - **Service**: one async method per user-facing command
//! - **Runtime**: a single-writer queue serializing every sheet
//!   operation, plus the tickers that feed it

pub mod channels;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod reminders;
pub mod runtime;
pub mod schedule;
pub mod service;
pub mod store;

pub use channels::{ChannelSink, EditOutcome, MessageRef, ReminderPing};
pub use config::RosterConfig;
pub use error::{Result, RosterError};
pub use runtime::{Command, Runtime, RuntimeHandle};
pub use service::RosterService;
pub use store::{CellRange, TabularStore, memory::MemoryStore};
