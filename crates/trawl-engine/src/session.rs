//! Incremental scrape sessions.
//!
//! A [`SessionController`] runs at most one session at a time. The session's worker task
//! owns the page loop, the working batch and the deduplicator; callers only interact
//! through `start`, `stop`, `status` and the [`DeliveryQueue`].

use crate::auth::{LoginConfig, LoginWorkflow};
use crate::config::schema::{LoginTiming, TrawlConfig};
use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::extract::{ClassSelector, await_container, extract_selector, parse_selectors};
use crate::page::{Page, PageLauncher};
use crate::queue::DeliveryQueue;
use crate::store::BatchStore;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trawl_common::model::{Batch, Record};

/// What to scrape.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub target_url: String,
    pub selectors: Vec<ClassSelector>,
    pub want_images: bool,
    /// Present when the target requires a login first.
    pub login: Option<LoginConfig>,
}

impl SessionRequest {
    /// `selectors` is a comma-separated list of class names.
    pub fn new(target_url: impl Into<String>, selectors: &str) -> Self {
        Self {
            target_url: target_url.into(),
            selectors: parse_selectors(selectors),
            want_images: false,
            login: None,
        }
    }

    pub fn with_images(mut self, want_images: bool) -> Self {
        self.want_images = want_images;
        self
    }

    pub fn with_login(mut self, login: LoginConfig) -> Self {
        self.login = Some(login);
        self
    }

    fn validate(&self) -> Result<(), SessionError> {
        url::Url::parse(&self.target_url).map_err(|e| SessionError::InvalidTarget {
            url: self.target_url.clone(),
            reason: e.to_string(),
        })?;
        if self.selectors.is_empty() {
            return Err(SessionError::NoSelectors);
        }
        Ok(())
    }
}

/// Pacing for the scrape loop and login workflow.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub container_timeout: Duration,
    pub login: LoginTiming,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&TrawlConfig::default())
    }
}

impl From<&TrawlConfig> for SessionSettings {
    fn from(config: &TrawlConfig) -> Self {
        Self {
            poll_interval: config.session.poll_interval(),
            container_timeout: config.session.container_timeout(),
            login: config.login.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub is_active: bool,
    pub has_open_resource: bool,
}

#[derive(Default)]
struct Shared {
    active: bool,
    cancel: CancellationToken,
    page: Option<Arc<dyn Page>>,
    worker: Option<JoinHandle<()>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct SessionController {
    launcher: Arc<dyn PageLauncher>,
    store: Arc<dyn BatchStore>,
    queue: DeliveryQueue,
    settings: SessionSettings,
    shared: Arc<Mutex<Shared>>,
}

impl SessionController {
    pub fn new(
        launcher: Arc<dyn PageLauncher>,
        store: Arc<dyn BatchStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            launcher,
            store,
            queue: DeliveryQueue::new(),
            settings,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Handle for pollers; batches appear here as pages are completed.
    pub fn queue(&self) -> DeliveryQueue {
        self.queue.clone()
    }

    pub fn drain_all(&self) -> Vec<Batch> {
        self.queue.drain_all()
    }

    pub fn status(&self) -> SessionStatus {
        let shared = lock(&self.shared);
        SessionStatus {
            is_active: shared.active,
            has_open_resource: shared.page.as_ref().is_some_and(|page| !page.is_closed()),
        }
    }

    /// Open the browser, log in if required, reach the target and start the scrape loop.
    ///
    /// Returns once the loop is running. Rejects with [`SessionError::AlreadyActive`]
    /// while another session is in progress.
    pub async fn start(&self, request: SessionRequest) -> Result<(), SessionError> {
        let cancel = {
            let mut shared = lock(&self.shared);
            if shared.active {
                return Err(SessionError::AlreadyActive);
            }
            request.validate()?;
            shared.active = true;
            shared.cancel = CancellationToken::new();
            shared.cancel.clone()
        };

        let (page, last_url) = match self.open(&request, &cancel).await {
            Ok(opened) => opened,
            Err(e) => {
                self.abandon().await;
                return Err(e);
            }
        };

        let worker = ScrapeWorker {
            page,
            selectors: request.selectors,
            want_images: request.want_images,
            poll_interval: self.settings.poll_interval,
            container_timeout: self.settings.container_timeout,
            queue: self.queue.clone(),
            store: self.store.clone(),
            cancel,
            shared: self.shared.clone(),
            dedup: Deduplicator::new(),
            pending: Vec::new(),
            last_url,
        };

        let mut shared = lock(&self.shared);
        shared.worker = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    async fn open(
        &self,
        request: &SessionRequest,
        cancel: &CancellationToken,
    ) -> Result<(Arc<dyn Page>, String), SessionError> {
        self.store.clear().await?;

        info!("Launching browser for {}", request.target_url);
        let page = self.launcher.launch().await.map_err(SessionError::Launch)?;
        lock(&self.shared).page = Some(page.clone());
        if cancel.is_cancelled() {
            return Err(SessionError::SessionClosedExternally);
        }

        let target = request.target_url.as_str();
        let reached = match &request.login {
            Some(login) => LoginWorkflow::new(page.as_ref(), login, &self.settings.login, target)
                .run()
                .await
                .map(|_| ()),
            None => page.navigate(target).await,
        };
        reached.map_err(|reason| SessionError::TargetUnreachable {
            url: target.to_string(),
            reason,
        })?;

        let last_url = page
            .current_url()
            .await
            .unwrap_or_else(|_| target.to_string());
        Ok((page, last_url))
    }

    /// Undo a start that failed before the loop was spawned.
    async fn abandon(&self) {
        let page = lock(&self.shared).page.take();
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                debug!("Ignoring close error: {}", e);
            }
        }
        lock(&self.shared).active = false;
    }

    /// Ask the running session to finish and wait until its last batch is flushed.
    ///
    /// Always succeeds, also when nothing is running.
    pub async fn stop(&self) {
        let (page, worker) = {
            let mut shared = lock(&self.shared);
            shared.cancel.cancel();
            (shared.page.clone(), shared.worker.take())
        };

        if let Some(page) = page {
            info!("Stopping scrape session");
            if let Err(e) = page.close().await {
                debug!("Ignoring close error: {}", e);
            }
        }
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Scrape worker ended abnormally: {}", e);
                lock(&self.shared).active = false;
            }
        }
    }

    /// Wait for the current session to end on its own.
    pub async fn join(&self) {
        let worker = lock(&self.shared).worker.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Scrape worker ended abnormally: {}", e);
                lock(&self.shared).active = false;
            }
        }
    }
}

struct ScrapeWorker {
    page: Arc<dyn Page>,
    selectors: Vec<ClassSelector>,
    want_images: bool,
    poll_interval: Duration,
    container_timeout: Duration,
    queue: DeliveryQueue,
    store: Arc<dyn BatchStore>,
    cancel: CancellationToken,
    shared: Arc<Mutex<Shared>>,
    dedup: Deduplicator,
    pending: Vec<Record>,
    last_url: String,
}

impl ScrapeWorker {
    async fn run(mut self) {
        info!("Scrape session started on {}", self.last_url);

        while !self.cancel.is_cancelled() {
            match self.iterate().await {
                Ok(()) => {}
                Err(SessionError::SessionClosedExternally) => {
                    info!("Browser closed, ending session");
                    break;
                }
                Err(e) => warn!("Scraping error [{}]: {}", e.code(), e),
            }

            if let Err(e) = self.page.wait(self.poll_interval).await {
                info!("Page no longer available, ending session: {}", e);
                break;
            }
        }

        self.flush().await;
        if let Err(e) = self.page.close().await {
            debug!("Ignoring close error: {}", e);
        }

        let mut shared = lock(&self.shared);
        shared.page = None;
        shared.active = false;
        info!("Scrape session ended ({} unique records)", self.dedup.len());
    }

    async fn iterate(&mut self) -> Result<(), SessionError> {
        let url = self.page.current_url().await?;
        if url != self.last_url {
            debug!("Navigation detected: {} -> {}", self.last_url, url);
            self.flush().await;
            self.last_url = url;
        }

        for selector in &self.selectors {
            match await_container(self.page.as_ref(), selector, self.container_timeout).await {
                Ok(()) => {}
                Err(SessionError::ContainerNotFound { selector }) => {
                    debug!("Container for class {} not on page yet", selector);
                    continue;
                }
                Err(e) => return Err(e),
            }

            let records = extract_selector(self.page.as_ref(), selector, self.want_images).await?;
            for record in records {
                if self.dedup.is_new(&record) {
                    self.pending.push(record);
                }
            }
        }

        if !self.pending.is_empty() {
            let batch = Batch::new(self.last_url.clone(), self.pending.clone());
            self.store.checkpoint(&batch).await?;
        }
        Ok(())
    }

    /// Hand the working batch to the queue and the store, then clear it.
    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = Batch::new(self.last_url.clone(), std::mem::take(&mut self.pending));
        info!(
            "Batch complete for {} ({} records)",
            batch.page_url,
            batch.items.len()
        );

        self.queue.push(batch.clone());
        if let Err(e) = self.store.append_batch(&batch).await {
            warn!("Failed to persist batch: {}", e);
        }
    }
}
