pub mod agent;
pub mod artifacts;
pub mod cache;
pub mod cli;
pub mod config;
pub mod datasource;
pub mod llm;
pub mod viz;

// Re-export commonly used types
pub use agent::workflow::launch;
pub use config::Config;
