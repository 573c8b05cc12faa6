pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod module;
pub mod orchestrator;
