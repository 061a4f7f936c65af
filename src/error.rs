use thiserror::Error;

/// Why a published chart or map is blank; carried with the output, never aborts an event
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeIssue {
    #[error("No city name given")]
    InputEmpty,

    #[error("City not found: {name}")]
    GeocodeNotFound { name: String },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed series: {0}")]
    MalformedSeries(String),
}

/// Rejects an event outright, leaving the session untouched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("No intermediate city with index {0}")]
    UnknownSlot(usize),

    #[error("Intermediate cities require an index")]
    MissingSlotIndex,

    #[error("Deep link was already applied to this session")]
    DeepLinkAlreadyApplied,

    #[error("Deep links are only accepted before the first edit")]
    SessionAlreadyStarted,
}
