//! Replica core: run a queue of external media downloads off the caller's
//! thread and report progress, output and results as notifications.

pub mod config;
pub mod job;
pub mod logging;
pub mod request;
pub mod runner;

pub use job::Job;
pub use runner::{JobRunner, Notification, RunHandle, RunOptions, Tally};
