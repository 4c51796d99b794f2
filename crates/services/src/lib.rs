#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod progress_service;
pub mod streak_service;

pub use prep_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{AppServicesError, ProgressServiceError, StreakServiceError};
pub use progress_service::{PassOutcome, ProgressService};
pub use streak_service::StreakService;
