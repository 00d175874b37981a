pub mod status;
pub mod utils;

pub use status::{Diagnostic, ExecutionResult, Status};
