use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use user_restapi::{CallerConfig, UserCreationCaller};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries only the created user.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match CallerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let caller = UserCreationCaller::new(config);
    match caller.run(&mut std::io::stdout()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(kind = ?err.kind(), status = ?err.status(), "{err}");
            ExitCode::FAILURE
        }
    }
}
