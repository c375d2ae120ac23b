//! The browser seam.
//!
//! Helpers only talk to a [`Page`]: locator-level operations that re-query
//! the DOM every time, so no element handle ever goes stale between awaits.
//! [`WebDriverPage`] drives a real browser through fantoccini; tests use the
//! scripted page from `test-helpers`.

use std::path::Path;

use async_trait::async_trait;
use derive_more::Display;
use fantoccini::Client;
use fantoccini::elements::Element;
use serde_json::json;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::locator::Selector;

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> HarnessResult<()>;

    async fn current_url(&self) -> HarnessResult<String>;

    /// Number of visible elements matching `selector`.
    async fn count(&self, selector: &Selector) -> HarnessResult<usize>;

    /// Click the `nth` visible match.
    async fn click(&self, selector: &Selector, nth: usize) -> HarnessResult<()>;

    /// Replace the value of the first visible match.
    async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()>;

    /// Visible text of every visible match, in document order.
    async fn texts(&self, selector: &Selector) -> HarnessResult<Vec<String>>;

    /// Current `value` of the first visible match (empty if none is set).
    async fn value(&self, selector: &Selector) -> HarnessResult<String>;

    /// Texts of the visible `selector` matches inside the `nth` visible
    /// match of `scope`. Indexing agrees with [`Page::texts`] on `scope`.
    async fn texts_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<Vec<String>>;

    /// Click the first visible `selector` inside the `nth` visible match of
    /// `scope`.
    async fn click_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<()>;

    /// Hand one file to a file input. The input may be hidden.
    async fn upload(&self, selector: &Selector, file: &Path) -> HarnessResult<()>;

    /// Pointer click at an offset from the top-left corner of the first
    /// visible match.
    async fn click_at(
        &self,
        selector: &Selector,
        x: i64,
        y: i64,
    ) -> HarnessResult<()>;

    /// PNG of the whole document, not only the visible viewport.
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// End the browser session.
    async fn close(&self) -> HarnessResult<()>;
}

/// Something to click, addressed the same way the visible texts were read.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Target {
    #[display("{selector} #{nth}")]
    Nth { selector: Selector, nth: usize },
    /// A control inside one visible match of `scope`, such as the approve
    /// button of one table row.
    #[display("{selector} in {scope} #{nth}")]
    Within {
        scope: Selector,
        nth: usize,
        selector: Selector,
    },
}

impl Target {
    pub async fn click(&self, page: &dyn Page) -> HarnessResult<()> {
        match self {
            Target::Nth { selector, nth } => page.click(selector, *nth).await,
            Target::Within {
                scope,
                nth,
                selector,
            } => page.click_within(scope, *nth, selector).await,
        }
    }
}

impl From<Selector> for Target {
    fn from(selector: Selector) -> Self {
        Target::Nth { selector, nth: 0 }
    }
}

/// Largest window edge requested for a full-page capture.
const MAX_CAPTURE_EDGE: u32 = 16_384;

/// Window size that shows the whole document: the scroll size plus the
/// browser chrome around the viewport, never smaller than `window`.
///
/// `metrics` is `[scrollWidth, scrollHeight, chromeWidth, chromeHeight]`.
fn full_page_window(window: (u64, u64), metrics: &serde_json::Value) -> (u32, u32) {
    let metric = |i: usize| {
        metrics
            .get(i)
            .and_then(serde_json::Value::as_f64)
            .map_or(0, |v| v.max(0.0).ceil() as u32)
    };
    let edge = |current: u64, content: u32, chrome: u32| {
        let current = u32::try_from(current).unwrap_or(MAX_CAPTURE_EDGE);
        content
            .saturating_add(chrome)
            .max(current)
            .min(MAX_CAPTURE_EDGE)
    };
    (
        edge(window.0, metric(0), metric(2)),
        edge(window.1, metric(1), metric(3)),
    )
}

pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        WebDriverPage { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn find_all(&self, selector: &Selector) -> HarnessResult<Vec<Element>> {
        let query = selector.to_query()?;
        Ok(self.client.find_all(query.as_locator()).await?)
    }

    async fn visible(&self, selector: &Selector) -> HarnessResult<Vec<Element>> {
        let mut visible = Vec::new();
        for element in self.find_all(selector).await? {
            if element.is_displayed().await? {
                visible.push(element);
            }
        }
        Ok(visible)
    }

    async fn nth_visible(
        &self,
        selector: &Selector,
        nth: usize,
    ) -> HarnessResult<Element> {
        let mut visible = self.visible(selector).await?;
        if nth >= visible.len() {
            return Err(HarnessError::ElementNotFound {
                chain: selector.clone().into(),
            });
        }
        Ok(visible.swap_remove(nth))
    }

    async fn visible_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<Vec<Element>> {
        let parent = self.nth_visible(scope, nth).await?;
        let query = selector.to_relative_query()?;
        let mut visible = Vec::new();
        for element in parent.find_all(query.as_locator()).await? {
            if element.is_displayed().await? {
                visible.push(element);
            }
        }
        Ok(visible)
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> HarnessResult<()> {
        debug!("goto {url}");
        Ok(self.client.goto(url).await?)
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn count(&self, selector: &Selector) -> HarnessResult<usize> {
        Ok(self.visible(selector).await?.len())
    }

    async fn click(&self, selector: &Selector, nth: usize) -> HarnessResult<()> {
        debug!("click {selector} #{nth}");
        let element = self.nth_visible(selector, nth).await?;
        Ok(element.click().await?)
    }

    async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
        debug!("fill {selector}");
        let element = self.nth_visible(selector, 0).await?;
        element.click().await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn texts(&self, selector: &Selector) -> HarnessResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.visible(selector).await? {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn value(&self, selector: &Selector) -> HarnessResult<String> {
        let element = self.nth_visible(selector, 0).await?;
        Ok(element.prop("value").await?.unwrap_or_default())
    }

    async fn texts_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.visible_within(scope, nth, selector).await? {
            texts.push(element.text().await?);
        }
        Ok(texts)
    }

    async fn click_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<()> {
        debug!("click {selector} in {scope} #{nth}");
        let element = self
            .visible_within(scope, nth, selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarnessError::ElementNotFound {
                chain: selector.clone().within(scope.clone()).into(),
            })?;
        Ok(element.click().await?)
    }

    async fn upload(&self, selector: &Selector, file: &Path) -> HarnessResult<()> {
        debug!("upload {} into {selector}", file.display());
        let element = self
            .find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarnessError::ElementNotFound {
                chain: selector.clone().into(),
            })?;
        element.send_keys(&file.to_string_lossy()).await?;
        Ok(())
    }

    async fn click_at(
        &self,
        selector: &Selector,
        x: i64,
        y: i64,
    ) -> HarnessResult<()> {
        debug!("click {selector} at ({x}, {y})");
        let element = self.nth_visible(selector, 0).await?;
        let target = serde_json::to_value(&element)
            .map_err(|e| HarnessError::UnexpectedState(e.to_string()))?;
        // Map widgets read clientX/clientY off the event, so synthesize the
        // full down/up/click sequence at absolute coordinates.
        self.client
            .execute(
                "const el = arguments[0];
                 const rect = el.getBoundingClientRect();
                 const init = {
                     bubbles: true,
                     cancelable: true,
                     view: window,
                     clientX: rect.left + arguments[1],
                     clientY: rect.top + arguments[2],
                 };
                 for (const kind of ['mousedown', 'mouseup', 'click']) {
                     el.dispatchEvent(new MouseEvent(kind, init));
                 }",
                vec![target, json!(x), json!(y)],
            )
            .await?;
        Ok(())
    }

    /// WebDriver only captures the viewport, so the window is grown to the
    /// document size for the capture and restored afterwards.
    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        let window = self.client.get_window_size().await?;
        let metrics = self
            .client
            .execute(
                "const doc = document.documentElement;
                 const body = document.body || doc;
                 return [
                     Math.max(doc.scrollWidth, body.scrollWidth),
                     Math.max(doc.scrollHeight, body.scrollHeight),
                     window.outerWidth - window.innerWidth,
                     window.outerHeight - window.innerHeight,
                 ];",
                vec![],
            )
            .await?;
        let (width, height) = full_page_window(window, &metrics);
        debug!("full-page capture at {width}x{height}");
        self.client.set_window_size(width, height).await?;
        let png = self.client.screenshot().await;
        let (old_width, old_height) = (
            u32::try_from(window.0).unwrap_or(width),
            u32::try_from(window.1).unwrap_or(height),
        );
        self.client.set_window_size(old_width, old_height).await?;
        Ok(png?)
    }

    async fn close(&self) -> HarnessResult<()> {
        Ok(self.client.clone().close().await?)
    }
}
