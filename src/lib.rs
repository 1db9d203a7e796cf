pub mod core;
pub mod edinet;
pub mod failures;
pub mod fetch;
pub mod register;
pub mod storage;
pub mod utils;

// Re-exports
pub use crate::core::RegisterConfig;
pub use register::{register_filing, run_batch, Execution, RunContext};
pub use utils::progress::ProgressTracker;
