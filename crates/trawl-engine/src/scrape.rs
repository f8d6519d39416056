//! Single-shot scraping: one pass over a page, failing loudly when a container is missing.

use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::extract::{ClassSelector, await_container, extract_selector};
use crate::page::Page;
use std::time::Duration;
use tracing::info;
use trawl_common::model::{Batch, Record};

/// Extract unique records from the page as it is now.
///
/// Each selector must match within `timeout`, otherwise the call fails with
/// [`SessionError::ContainerNotFound`] naming that class.
pub async fn scrape_once(
    page: &dyn Page,
    selectors: &[ClassSelector],
    want_images: bool,
    timeout: Duration,
) -> Result<Vec<Record>, SessionError> {
    if selectors.is_empty() {
        return Err(SessionError::NoSelectors);
    }

    let mut dedup = Deduplicator::new();
    let mut records = Vec::new();
    for selector in selectors {
        await_container(page, selector, timeout).await?;
        let found = extract_selector(page, selector, want_images).await?;
        records.extend(found.into_iter().filter(|record| dedup.is_new(record)));
    }
    Ok(records)
}

/// Navigate to `url` and scrape it once into a batch.
pub async fn scrape_url(
    page: &dyn Page,
    url: &str,
    selectors: &[ClassSelector],
    want_images: bool,
    timeout: Duration,
) -> Result<Batch, SessionError> {
    page.navigate(url)
        .await
        .map_err(|reason| SessionError::TargetUnreachable {
            url: url.to_string(),
            reason,
        })?;

    let records = scrape_once(page, selectors, want_images, timeout).await?;
    let page_url = page.current_url().await.unwrap_or_else(|_| url.to_string());
    info!("Scraped {} records from {}", records.len(), page_url);
    Ok(Batch::new(page_url, records))
}
