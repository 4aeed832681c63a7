pub mod config;
pub mod core;
pub mod services;

pub use crate::config::BuildConfig;
pub use crate::core::project::{BuildError, BuildSummary, SiteBuilder};
