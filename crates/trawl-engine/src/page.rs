use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
pub use trawl_common::error::PageError;

/// Element state awaited by [`Page::wait_for_selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorState {
    /// Present in the DOM.
    #[default]
    Attached,
    /// Present and rendered with a non-empty box.
    Visible,
}

/// A live browser page. Shared between the scrape worker and the controller,
/// so every operation takes `&self`.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// The URL currently shown by the page.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Idle for `duration`. Fails with [`PageError::Closed`] once the page or browser is gone.
    async fn wait(&self, duration: Duration) -> Result<(), PageError>;

    /// Wait until `selector` reaches `state`, failing with [`PageError::Timeout`].
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        state: SelectorState,
    ) -> Result<(), PageError>;

    /// All elements matching `selector`, in DOM order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError>;

    /// Replace the value of the input matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), PageError>;

    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Close the page and its browser. Safe to call more than once and from several tasks.
    async fn close(&self) -> Result<(), PageError>;

    fn is_closed(&self) -> bool;
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Rendered text of the element.
    async fn text(&self) -> Result<String, PageError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError>;

    /// Descendants matching a tag name, in DOM order.
    async fn children(&self, tag: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError>;

    /// PNG snapshot of just this element.
    async fn capture_png(&self) -> Result<Vec<u8>, PageError>;
}

/// Opens a fresh page for each session.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn Page>, PageError>;
}
