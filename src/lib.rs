use thiserror::Error;

pub mod auth_server;
pub mod config;
pub mod twitch;

#[derive(Error, Debug)]
pub enum TwitchProbeError {
    #[error("missing credential: set {0} in the environment or your secrets file")]
    MissingCredential(&'static str),

    #[error("parsing failure: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("token endpoint rejected the request: {0}")]
    ExchangeFailed(String),

    #[error("helix said no (status {status}): {body}")]
    HelixError { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("auth flow ended before a token arrived")]
    AuthFlowInterrupted,
}
