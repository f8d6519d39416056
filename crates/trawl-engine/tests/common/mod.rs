#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trawl_engine::page::{ElementHandle, Page, PageError, PageLauncher, SelectorState};

#[derive(Debug, Clone, Default)]
pub struct MockElement {
    text: String,
    attrs: HashMap<String, String>,
    images: Vec<MockElement>,
    png: Option<Vec<u8>>,
}

impl MockElement {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// An `img` element. `png` is what a capture returns; `None` makes the capture fail.
    pub fn image(src: &str, png: Option<Vec<u8>>) -> Self {
        Self {
            attrs: HashMap::from([("src".to_string(), src.to_string())]),
            png,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: MockElement) -> Self {
        self.images.push(image);
        self
    }
}

#[derive(Default)]
struct MockState {
    url: String,
    dom: HashMap<String, HashMap<String, Vec<MockElement>>>,
    url_after_wait: VecDeque<String>,
    close_after_waits: Option<usize>,
    waits: usize,
    failing_clicks: bool,
    failing_queries: usize,
    unreachable: HashSet<String>,
    calls: Vec<String>,
    closed: bool,
}

/// Scripted page: a fixed DOM per URL, optional URL changes after each wait.
#[derive(Default)]
pub struct MockPage {
    state: Mutex<MockState>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(self, url: &str, css: &str, elements: Vec<MockElement>) -> Self {
        self.state
            .lock()
            .unwrap()
            .dom
            .entry(url.to_string())
            .or_default()
            .insert(css.to_string(), elements);
        self
    }

    /// The next unscripted wait moves the page to `url`, as if the user clicked a link.
    pub fn navigate_after_wait(self, url: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .url_after_wait
            .push_back(url.to_string());
        self
    }

    /// The `n`-th wait fails because the browser went away.
    pub fn close_after_waits(self, n: usize) -> Self {
        self.state.lock().unwrap().close_after_waits = Some(n);
        self
    }

    pub fn failing_clicks(self) -> Self {
        self.state.lock().unwrap().failing_clicks = true;
        self
    }

    /// The next `n` element queries fail with a script error.
    pub fn failing_queries(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_queries = n;
        self
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn elements(&self, css: &str) -> Result<Vec<MockElement>, PageError> {
        let state = self.state.lock().unwrap();
        if state.closed {
            return Err(PageError::Closed);
        }
        Ok(state
            .dom
            .get(&state.url)
            .and_then(|page| page.get(css))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl Page for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.record(format!("navigate:{url}"));
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(PageError::Closed);
        }
        if state.unreachable.contains(url) {
            return Err(PageError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED {url}")));
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let state = self.state.lock().unwrap();
        if state.closed {
            return Err(PageError::Closed);
        }
        Ok(state.url.clone())
    }

    async fn wait(&self, duration: Duration) -> Result<(), PageError> {
        self.record(format!("wait:{}", duration.as_millis()));
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(PageError::Closed);
        }
        state.waits += 1;
        let waits = state.waits;
        if state.close_after_waits.is_some_and(|n| waits >= n) {
            state.closed = true;
            return Err(PageError::Closed);
        }
        if let Some(url) = state.url_after_wait.pop_front() {
            state.url = url;
        }
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        _state: SelectorState,
    ) -> Result<(), PageError> {
        self.record(format!("wait_for:{selector}"));
        if self.elements(selector)?.is_empty() {
            return Err(PageError::Timeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        {
            let mut state = self.state.lock().unwrap();
            if !state.closed && state.failing_queries > 0 {
                state.failing_queries -= 1;
                return Err(PageError::Script(format!(
                    "Execution context was destroyed while querying {selector}"
                )));
            }
        }
        Ok(self
            .elements(selector)?
            .into_iter()
            .map(|element| Box::new(MockHandle(element)) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), PageError> {
        self.record(format!("fill:{selector}={value}"));
        if self.is_closed() {
            return Err(PageError::Closed);
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.record(format!("click:{selector}"));
        let state = self.state.lock().unwrap();
        if state.closed {
            return Err(PageError::Closed);
        }
        if state.failing_clicks {
            return Err(PageError::Script("element click intercepted".into()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

struct MockHandle(MockElement);

#[async_trait]
impl ElementHandle for MockHandle {
    async fn text(&self) -> Result<String, PageError> {
        Ok(self.0.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        Ok(self.0.attrs.get(name).cloned())
    }

    async fn children(&self, tag: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        if tag != "img" {
            return Ok(Vec::new());
        }
        Ok(self
            .0
            .images
            .iter()
            .cloned()
            .map(|image| Box::new(MockHandle(image)) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn capture_png(&self) -> Result<Vec<u8>, PageError> {
        self.0
            .png
            .clone()
            .ok_or_else(|| PageError::Capture("node is detached".into()))
    }
}

/// Hands out pre-built pages, one per launch.
#[derive(Default)]
pub struct MockLauncher {
    pages: Mutex<VecDeque<Arc<MockPage>>>,
    launches: AtomicUsize,
}

impl MockLauncher {
    pub fn new(pages: Vec<Arc<MockPage>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn Page>, PageError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let page: Arc<dyn Page> = self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PageError::Launch("no browser available".into()))?;
        Ok(page)
    }
}

pub fn texts(records: &[trawl_engine::model::Record]) -> Vec<String> {
    records.iter().map(|r| r.content().join("\n")).collect()
}
