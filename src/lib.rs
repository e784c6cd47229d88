pub mod config;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod gate;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod pool;
pub mod provider;
pub mod task;
