use crate::store::StoreError;
use trawl_common::error::PageError;

/// Session lifecycle errors surfaced to whoever drives the controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Scraping already in progress")]
    AlreadyActive,

    #[error("Invalid target URL {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("No selectors configured")]
    NoSelectors,

    #[error("Failed to open browser: {0}")]
    Launch(PageError),

    #[error("Could not reach {url}: {reason}")]
    TargetUnreachable { url: String, reason: PageError },

    #[error("Container not found: no element with class '{selector}'")]
    ContainerNotFound { selector: String },

    #[error("Extraction failed: {0}")]
    TransientExtraction(PageError),

    #[error("Browser session closed")]
    SessionClosedExternally,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<PageError> for SessionError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Closed => SessionError::SessionClosedExternally,
            other => SessionError::TransientExtraction(other),
        }
    }
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::AlreadyActive => "ALREADY_ACTIVE",
            SessionError::InvalidTarget { .. } => "INVALID_TARGET",
            SessionError::NoSelectors => "NO_SELECTORS",
            SessionError::Launch(_) => "LAUNCH_ERROR",
            SessionError::TargetUnreachable { .. } => "TARGET_UNREACHABLE",
            SessionError::ContainerNotFound { .. } => "CONTAINER_NOT_FOUND",
            SessionError::TransientExtraction(_) => "EXTRACTION_ERROR",
            SessionError::SessionClosedExternally => "SESSION_CLOSED",
            SessionError::Store(_) => "STORE_ERROR",
        }
    }
}
