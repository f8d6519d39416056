use crate::cdp::CdpClient;
use crate::retry::{is_disconnect_error, retry_on_context_error};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use trawl_engine::page::{ElementHandle, Page, PageError, PageLauncher, SelectorState};

/// Interval between DOM probes while waiting for a selector.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches a dedicated Chromium per session.
pub struct ChromiumLauncher {
    visible: bool,
}

impl ChromiumLauncher {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }
}

#[async_trait]
impl PageLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn Page>, PageError> {
        info!("Launching Chromium for a new session...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| PageError::Launch(e.to_string()))?;
        Ok(Arc::new(ChromiumPage::new(client)))
    }
}

/// A single Chromium tab driven over CDP.
pub struct ChromiumPage {
    page: chromiumoxide::Page,
    client: Mutex<Option<CdpClient>>,
    connected: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl ChromiumPage {
    pub fn new(client: CdpClient) -> Self {
        Self {
            page: client.page.clone(),
            connected: client.connection(),
            client: Mutex::new(Some(client)),
            closed: AtomicBool::new(false),
        }
    }

    fn gone(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || !self.connected.load(Ordering::SeqCst)
    }

    /// Map a failure to [`PageError::Closed`] when the browser is gone, else via `other`.
    fn fail(&self, err: String, other: impl FnOnce(String) -> PageError) -> PageError {
        if self.gone() || is_disconnect_error(&err) {
            PageError::Closed
        } else {
            other(err)
        }
    }

    async fn find(&self, selector: &str) -> Result<Element, PageError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| {
                let err = e.to_string();
                self.fail(err, |_| PageError::ElementNotFound {
                    selector: selector.to_string(),
                })
            })
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, String> {
        let quoted = serde_json::to_string(selector).map_err(|e| e.to_string())?;
        let script = format!(
            "(() => {{ const el = document.querySelector({quoted}); \
             if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden'; }})()"
        );
        retry_on_context_error("Visibility check", || self.page.evaluate(script.as_str()))
            .await?
            .into_value::<bool>()
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        if self.gone() {
            return Err(PageError::Closed);
        }
        info!("Navigating to: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Navigation))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Navigation))?;
        Ok(url.unwrap_or_default())
    }

    async fn wait(&self, duration: Duration) -> Result<(), PageError> {
        tokio::time::sleep(duration).await;
        if self.gone() {
            return Err(PageError::Closed);
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        state: SelectorState,
    ) -> Result<(), PageError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.gone() {
                return Err(PageError::Closed);
            }
            let found = match state {
                SelectorState::Attached => {
                    retry_on_context_error("Selector probe", || self.page.find_elements(selector))
                        .await
                        .map(|elements| !elements.is_empty())
                }
                SelectorState::Visible => self.is_visible(selector).await,
            };
            match found {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) if self.gone() || is_disconnect_error(&e) => return Err(PageError::Closed),
                Err(e) => debug!("Probe for {} failed: {}", selector, e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PageError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        let elements = retry_on_context_error("Query", || self.page.find_elements(selector))
            .await
            .map_err(|e| self.fail(e, PageError::Script))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Script))?;
        element
            .click()
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Script))?;
        element
            .type_str(value)
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Script))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.find(selector)
            .await?
            .click()
            .await
            .map_err(|e| self.fail(e.to_string(), PageError::Script))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(client) = self.client.lock().await.take() {
            info!("Closing browser");
            if let Err(e) = client.close().await {
                debug!("Browser close reported: {}", e);
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.gone()
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<String, PageError> {
        let text = self
            .element
            .inner_text()
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        self.element
            .attribute(name)
            .await
            .map_err(|e| PageError::Script(e.to_string()))
    }

    async fn children(&self, tag: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        let elements = self
            .element
            .find_elements(tag)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn capture_png(&self) -> Result<Vec<u8>, PageError> {
        self.element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| PageError::Capture(e.to_string()))
    }
}
