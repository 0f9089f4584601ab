//! Builders to construct schedulers from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{build_scheduler, build_scheduler_from_env, build_scheduler_with};
