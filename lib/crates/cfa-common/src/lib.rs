pub mod config;
pub mod task;

pub use config::{ConfigError, PlatformConfig, normalize_domain};
pub use task::{AppStartTask, HasProgress, Progress, ServiceProvisionTask, TaskState, TaskStatus};
