mod batch_service;
mod config;
mod context;
mod dataset_service;
mod error;
mod io_service;
mod report_service;
mod schedule;
mod session;

#[cfg(test)]
mod tests;

pub use batch_service::BatchService;
pub use config::{AppConfig, CONFIG_ENV};
pub use context::AppContext;
pub use dataset_service::{DatasetService, ImportSelection};
pub use error::{AppError, ConfigError, Result};
pub use io_service::IoService;
pub use report_service::ReportService;
pub use schedule::{Debouncer, JobGuard, JobKind, JobSlot};
pub use session::Session;
