pub mod config;

pub use config::RegisterConfig;
