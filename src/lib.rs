//! Code runner
//!
//! Runs user code either in a local Python sandbox worker or on a remote
//! judge, and streams AI analysis of failed runs.

pub mod analyse;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod languages;
pub mod playground;
pub mod runner;
pub mod sandbox;
pub mod stream;

// Re-exports
pub use crate::config::AppConfig;
pub use crate::core::{Diagnostic, ExecutionResult, Status};
pub use crate::error::{Error, Result};
pub use crate::executor::Executor;
pub use crate::languages::{Code, Language};
