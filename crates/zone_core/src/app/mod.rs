mod loop_runner;
mod metrics;

pub use loop_runner::{run_server, run_world, ServerConfig, ServerError, ServerSummary};
