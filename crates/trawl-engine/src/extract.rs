//! Turns matched containers into [`Record`]s.

use crate::error::SessionError;
use crate::page::{ElementHandle, Page, PageError, SelectorState};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use trawl_common::model::{Record, is_data_uri, png_data_uri};

/// A configured container class, e.g. `product-card` or the compound `card big`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSelector {
    name: String,
}

impl ClassSelector {
    /// Normalize one configured class. Leading dots are dropped and inner whitespace
    /// collapses to single spaces; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw
            .trim()
            .trim_start_matches('.')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(Self { name })
    }

    /// The class name as configured; used as the record's `source_selector`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CSS selector matching elements that carry every listed class.
    pub fn css(&self) -> String {
        self.name
            .split_whitespace()
            .map(|class| format!(".{}", class.trim_start_matches('.')))
            .collect()
    }
}

impl fmt::Display for ClassSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Split a comma-separated selector list, keeping configured order.
pub fn parse_selectors(raw: &str) -> Vec<ClassSelector> {
    raw.split(',').filter_map(ClassSelector::parse).collect()
}

/// Extract records for every selector, in selector order then DOM order.
pub async fn extract(
    page: &dyn Page,
    selectors: &[ClassSelector],
    want_images: bool,
) -> Result<Vec<Record>, PageError> {
    let mut records = Vec::new();
    for selector in selectors {
        records.extend(extract_selector(page, selector, want_images).await?);
    }
    Ok(records)
}

/// Extract records for the elements matching one selector.
///
/// Elements without visible text are skipped.
pub async fn extract_selector(
    page: &dyn Page,
    selector: &ClassSelector,
    want_images: bool,
) -> Result<Vec<Record>, PageError> {
    let elements = page.query_all(&selector.css()).await?;
    let mut records = Vec::with_capacity(elements.len());

    for element in elements {
        let text = element.text().await?;
        let images = if want_images {
            collect_images(element.as_ref()).await
        } else {
            Vec::new()
        };
        match Record::from_text(&text, images, selector.name()) {
            Some(record) => records.push(record),
            None => debug!("Skipping container without text for class {}", selector),
        }
    }

    Ok(records)
}

/// Image references for the `img` descendants of a container.
///
/// Inline data URIs pass through; anything else is captured as a PNG. Failures only
/// drop the affected image.
async fn collect_images(element: &dyn ElementHandle) -> Vec<String> {
    let images = match element.children("img").await {
        Ok(images) => images,
        Err(e) => {
            warn!("Failed to list images: {}", e);
            return Vec::new();
        }
    };

    let mut refs = Vec::with_capacity(images.len());
    for image in images {
        let src = match image.attribute("src").await {
            Ok(Some(src)) if !src.trim().is_empty() => src,
            Ok(_) => continue,
            Err(e) => {
                warn!("Failed to read image src: {}", e);
                continue;
            }
        };

        if is_data_uri(&src) {
            refs.push(src);
            continue;
        }

        match image.capture_png().await {
            Ok(bytes) => refs.push(png_data_uri(&bytes)),
            Err(e) => warn!("Image capture failed for {}, skipping: {}", src, e),
        }
    }
    refs
}

/// Wait for a container to attach, reporting a missing one as [`SessionError::ContainerNotFound`].
pub async fn await_container(
    page: &dyn Page,
    selector: &ClassSelector,
    timeout: Duration,
) -> Result<(), SessionError> {
    match page
        .wait_for_selector(&selector.css(), timeout, SelectorState::Attached)
        .await
    {
        Ok(()) => Ok(()),
        Err(PageError::Timeout { .. }) => Err(SessionError::ContainerNotFound {
            selector: selector.name().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}
