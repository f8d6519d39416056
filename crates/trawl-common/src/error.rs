/// Errors raised by a page automation backend.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PageError {
    // ============================================================
    // Navigation Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // Element Errors
    // ============================================================
    #[error("No element matches selector {selector}")]
    ElementNotFound { selector: String },

    #[error("Timed out after {timeout_ms}ms waiting for {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    Script(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Page closed")]
    Closed,

    #[error("Other: {0}")]
    Other(String),
}

impl PageError {
    /// Stable error code, suitable for logs and machine consumers.
    pub fn code(&self) -> &'static str {
        match self {
            PageError::Navigation(_) => "NAVIGATION_ERROR",
            PageError::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            PageError::Timeout { .. } => "TIMEOUT",
            PageError::Capture(_) => "CAPTURE_ERROR",
            PageError::Script(_) => "SCRIPT_ERROR",
            PageError::Launch(_) => "LAUNCH_ERROR",
            PageError::Closed => "PAGE_CLOSED",
            PageError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the page or browser behind it is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, PageError::Closed)
    }
}
