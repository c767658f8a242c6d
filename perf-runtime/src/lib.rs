mod worker_thread;
pub mod message;
pub mod scheduler;
pub mod service;

pub use message::{SchedulerMessage, SchedulerSettings, SchedulerState};
pub use scheduler::spawn_scheduler;
pub use service::SchedulerService;
