//! Error types for submitting prompts and calling completion services

use thiserror::Error;

/// Why a submit was refused before any network call was made, or why it failed
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The draft was empty or whitespace only
    #[error("You must write something...!")]
    Validation,
    /// A request is already in flight
    #[error("still waiting for the previous reply")]
    Busy,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// A failed completion call, classified for display
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Auth, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimit, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidRequest, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Server, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Malformed, message)
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::MissingCredential, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from a provider
    pub fn from_status(provider: &str, status: u16, detail: &str) -> Self {
        match status {
            400 => Self::invalid_request(format!("{provider} rejected the request: {detail}")),
            401 | 403 => Self::auth(format!("{provider} authentication failed: {detail}")),
            429 => Self::rate_limit(format!("{provider} quota exceeded: {detail}")),
            500..=599 => Self::server(format!("{provider} server error {status}: {detail}")),
            _ => Self::unknown(format!("{provider} returned HTTP {status}: {detail}")),
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("{provider} request timed out: {err}"))
        } else if err.is_connect() {
            Self::network(format!("Could not connect to {provider}: {err}"))
        } else if err.is_decode() {
            Self::malformed(format!("{provider} sent an unreadable response: {err}"))
        } else {
            Self::network(format!("{provider} request failed: {err}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Network,
    Timeout,
    /// 401/403 or a rejected key
    Auth,
    /// 429, quota exhausted
    RateLimit,
    InvalidRequest,
    /// 5xx
    Server,
    /// Response body did not have the expected shape
    Malformed,
    /// No API key configured for the selected provider
    MissingCredential,
    Unknown,
}

impl ServiceErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceErrorKind::Network => "network error",
            ServiceErrorKind::Timeout => "timed out",
            ServiceErrorKind::Auth => "auth error",
            ServiceErrorKind::RateLimit => "quota exceeded",
            ServiceErrorKind::InvalidRequest => "bad request",
            ServiceErrorKind::Server => "server error",
            ServiceErrorKind::Malformed => "bad response",
            ServiceErrorKind::MissingCredential => "no API key",
            ServiceErrorKind::Unknown => "error",
        }
    }
}
