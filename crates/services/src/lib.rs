#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod reports;
pub mod tracker;

pub use drivetrack_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ReportError, TrackingError};
pub use reports::ProgressReports;
pub use tracker::ProgressTracker;
