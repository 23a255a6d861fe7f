pub mod config;
pub mod logging;

pub mod connectivity;
pub mod control;
pub mod events;
pub mod executor;
pub mod job;
pub mod progress;
pub mod retry;
pub mod scan;
pub mod scheduler;
pub mod worker;
