use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Errors are logged where they surface; only the exit status is left.
    match swarm_visualizer::run_with_config().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
