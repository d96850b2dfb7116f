use thiserror::Error;

use crate::render::RenderError;

/// Failure to produce part of a response.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Header name or value is not valid HTTP.
    #[error("invalid response header '{name}'")]
    InvalidHeader { name: String },

    /// JSON body could not be encoded.
    #[error("failed to encode JSON body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Template rendering failed.
    #[error("failed to render template: {0}")]
    Render(#[from] RenderError),
}
