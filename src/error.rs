use thiserror::Error;

/// Startup and wiring failures. Ordinary HTTP, network and timeout outcomes
/// never show up here; those travel as `gateway::ApiResponse::Failure` values.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("internal error: {0}")]
    Internal(String),
}
