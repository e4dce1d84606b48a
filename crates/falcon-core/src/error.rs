use crate::types::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FalconError {
    #[error("invalid transition: {from} → {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("WIP limit reached for '{status}' ({limit} cards)")]
    WipLimitReached { status: OrderStatus, limit: u32 },

    #[error("order {order_id} is not in the '{status}' column")]
    CardNotFound { order_id: Uuid, status: OrderStatus },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid client kind: {0}")]
    InvalidClientKind(String),

    #[error("saved view not found: {0}")]
    ViewNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("home directory not found: set HOME or FALCON_CONFIG")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FalconError {
    /// True for errors raised by client-side validation, before any remote call.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FalconError::InvalidTransition { .. }
                | FalconError::WipLimitReached { .. }
                | FalconError::CardNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FalconError>;
