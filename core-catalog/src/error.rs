use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An upstream fetch failed: transport error, non-2xx status, or a
    /// response body whose `code` is not 200.
    #[error("Remote request failed: {0}")]
    Remote(String),

    /// Nothing in the requested list can be played.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl From<BridgeError> for CatalogError {
    fn from(err: BridgeError) -> Self {
        CatalogError::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
