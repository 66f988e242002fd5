use std::process::ExitCode;

use tracing::error;
use zone_core::run_server;

use super::bootstrap::ServerWiring;

pub(crate) fn run(server: ServerWiring) -> ExitCode {
    if let Err(err) = run_server(server.config) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
