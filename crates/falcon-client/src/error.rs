use falcon_core::FalconError;
use thiserror::Error;

/// Postgres SQLSTATE for a reference to a column that does not exist.
pub const UNDEFINED_COLUMN: &str = "42703";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the backend. Displays the remote message verbatim.
    #[error("{message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("unexpected response shape from {resource}: {source}")]
    Schema {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No organization found for user")]
    NoOrganization,

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error(transparent)]
    Falcon(#[from] FalconError),
}

impl GatewayError {
    /// The backend rejected a query because a column does not exist.
    pub fn is_undefined_column(&self) -> bool {
        matches!(self, GatewayError::Remote { code: Some(c), .. } if c == UNDEFINED_COLUMN)
    }

    /// Local validation failure; nothing was sent.
    pub fn is_rejection(&self) -> bool {
        matches!(self, GatewayError::Falcon(e) if e.is_rejection())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
