//! bossbot-sched: the schedule lifecycle core.
//!
//! Everything between an admin's command and a delivered announcement lives
//! here: the flat-file schedule store, the boss catalog, the command
//! interpreter, the daily trigger scheduler, and the engine tying them
//! together. The Discord surface plugs in through the [`notify::Notifier`]
//! trait so none of this depends on the chat SDK.

pub mod catalog;
pub mod command;
pub mod engine;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use catalog::Catalog;
pub use command::{Command, CommandError, CreateRequest};
pub use engine::Engine;
pub use notify::Notifier;
pub use scheduler::Scheduler;
pub use store::{ScheduleStore, StoreError};
