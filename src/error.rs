use thiserror::Error;

use crate::digest::DigestError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed manifest")]
    MalformedManifest(#[source] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid digest")]
    InvalidDigest(#[from] DigestError),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Artifact has no spec layer")]
    NoSpecLayer,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Transfer failed: {context}")]
    Transfer {
        context: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Transfer failure with an underlying I/O cause.
    pub(crate) fn transfer(context: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Transfer {
            context: context.into(),
            source: Some(source),
        }
    }

    /// Transfer failure reported by the remote (unexpected status, missing
    /// header) with no lower-level error to attach.
    pub(crate) fn transfer_msg(context: impl Into<String>) -> Self {
        Error::Transfer {
            context: context.into(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
