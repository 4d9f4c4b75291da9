use thiserror::Error;

/// Ways a single reputation source can fail. Every variant is recoverable at
/// the resolver level: it only advances the fallback chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("SDK script failed to load: {0}")]
    SdkLoad(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    /// Short stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SourceError::ConfigurationMissing(_) => "configuration_missing",
            SourceError::Transport(_) => "transport",
            SourceError::SdkLoad(_) => "sdk_load",
            SourceError::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Map a reqwest error, separating body decoding problems from transport
    /// problems.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::MalformedResponse(err.to_string())
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}
