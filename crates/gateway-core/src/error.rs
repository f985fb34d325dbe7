//! Error types for the relay gateway.
//!
//! Every gateway-synthesized failure maps to a stable machine-readable code and
//! an HTTP status. Upstream errors are never represented here: a non-2xx
//! upstream response is relayed to the caller untouched.

/// Result alias used across the gateway crates
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Eligibility filtering left no channel to try
    #[error("no_available_channels")]
    NoAvailableChannels,

    /// Every attempt in every round failed at the network level
    #[error("upstream_unavailable")]
    UpstreamUnavailable {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// Missing or unknown caller token
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Human-readable reason
        message: String,
    },

    /// Caller token exists but is not active
    #[error("token_disabled")]
    TokenDisabled,

    /// Malformed inbound request
    #[error("invalid_request: {message}")]
    InvalidRequest {
        /// Human-readable reason
        message: String,
    },

    /// A collaborator store failed
    #[error("store error: {message}")]
    Store {
        /// Human-readable reason
        message: String,
    },

    /// Anything else
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable reason
        message: String,
    },
}

impl GatewayError {
    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAvailableChannels => "no_available_channels",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Unauthorized { .. } => "unauthorized",
            Self::TokenDisabled => "token_disabled",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Store { .. } => "store_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoAvailableChannels => 503,
            Self::UpstreamUnavailable { .. } => 502,
            Self::Unauthorized { .. } => 401,
            Self::TokenDisabled => 403,
            Self::InvalidRequest { .. } => 400,
            Self::Store { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Whether the caller may retry the same request later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoAvailableChannels | Self::UpstreamUnavailable { .. } | Self::Store { .. }
        )
    }
}
