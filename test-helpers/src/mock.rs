//! Scripted in-memory page.
//!
//! The DOM is a map from [`Selector`] to the elements it matches. Elements
//! can be hidden, which keeps them out of every visible-only query, and can
//! carry children of their own (the cells and buttons of one table row).
//! Tests register elements and reactions (on click, fill, upload), and can
//! schedule effects to land a few queries later, which is how the slow,
//! asynchronous re-rendering of the real application is imitated. Queries
//! (`count`, `texts`, `value`, `current_url`) each advance the clock by one
//! tick.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use harness::error::{HarnessError, HarnessResult};
use harness::{Page, Selector};

pub type ClickReaction = Arc<dyn Fn(&mut MockDom, usize) + Send + Sync>;
pub type FillReaction = Arc<dyn Fn(&mut MockDom, &str) + Send + Sync>;
pub type UploadReaction = Arc<dyn Fn(&mut MockDom, &Path) + Send + Sync>;
type Effect = Box<dyn FnOnce(&mut MockDom) + Send>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    pub text: String,
    pub value: String,
    pub hidden: bool,
    pub children: HashMap<Selector, Vec<MockElement>>,
}

impl MockElement {
    pub fn text(text: impl Into<String>) -> Self {
        MockElement {
            text: text.into(),
            ..MockElement::default()
        }
    }
}

fn visible(elements: &[MockElement]) -> impl Iterator<Item = &MockElement> {
    elements.iter().filter(|e| !e.hidden)
}

#[derive(Default)]
pub struct MockDom {
    pub url: String,
    elements: HashMap<Selector, Vec<MockElement>>,
    on_click: HashMap<Selector, ClickReaction>,
    on_fill: HashMap<Selector, FillReaction>,
    on_upload: HashMap<Selector, UploadReaction>,
    pending: Vec<(u32, Effect)>,
    /// Every action performed through the page, for assertions.
    pub actions: Vec<String>,
    pub uploads: Vec<PathBuf>,
    pub closed: bool,
}

impl MockDom {
    /// Replace whatever `selector` matched with one element per text.
    pub fn set(&mut self, selector: &Selector, texts: &[&str]) {
        self.elements.insert(
            selector.clone(),
            texts.iter().map(|t| MockElement::text(*t)).collect(),
        );
    }

    /// Make `selector` match exactly one element with `text`.
    pub fn show(&mut self, selector: &Selector, text: &str) {
        self.set(selector, &[text]);
    }

    pub fn hide(&mut self, selector: &Selector) {
        self.elements.remove(selector);
    }

    pub fn push(&mut self, selector: &Selector, text: &str) {
        self.elements
            .entry(selector.clone())
            .or_default()
            .push(MockElement::text(text));
    }

    /// Append an element that is in the DOM but not displayed.
    pub fn push_hidden(&mut self, selector: &Selector, text: &str) {
        self.elements
            .entry(selector.clone())
            .or_default()
            .push(MockElement {
                hidden: true,
                ..MockElement::text(text)
            });
    }

    /// Remove the `nth` visible match.
    pub fn remove_nth(&mut self, selector: &Selector, nth: usize) {
        if let Some(elements) = self.elements.get_mut(selector) {
            let position = elements
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.hidden)
                .nth(nth)
                .map(|(i, _)| i);
            if let Some(i) = position {
                elements.remove(i);
            }
        }
    }

    /// Give the `index`th match of `scope` (hidden ones included) one child
    /// per text under `selector`.
    pub fn set_within(&mut self, scope: &Selector, index: usize, selector: &Selector, texts: &[&str]) {
        if let Some(parent) = self
            .elements
            .get_mut(scope)
            .and_then(|elements| elements.get_mut(index))
        {
            parent.children.insert(
                selector.clone(),
                texts.iter().map(|t| MockElement::text(*t)).collect(),
            );
        }
    }

    pub fn count(&self, selector: &Selector) -> usize {
        self.elements
            .get(selector)
            .map_or(0, |elements| visible(elements).count())
    }

    pub fn texts(&self, selector: &Selector) -> Vec<String> {
        self.elements
            .get(selector)
            .map(|elements| visible(elements).map(|e| e.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Visible children under `selector` of the `nth` visible `scope`, or
    /// `None` when there is no such scope.
    pub fn texts_within(&self, scope: &Selector, nth: usize, selector: &Selector) -> Option<Vec<String>> {
        let parent = visible(self.elements.get(scope)?).nth(nth)?;
        Some(
            parent
                .children
                .get(selector)
                .map(|children| visible(children).map(|e| e.text.clone()).collect())
                .unwrap_or_default(),
        )
    }

    /// Value of the first visible match, empty when nothing matches.
    pub fn value(&self, selector: &Selector) -> String {
        self.elements
            .get(selector)
            .and_then(|elements| visible(elements).next())
            .map(|e| e.value.clone())
            .unwrap_or_default()
    }

    /// Set the value of the first visible match, creating the element if
    /// needed.
    pub fn set_value(&mut self, selector: &Selector, value: &str) {
        let elements = self.elements.entry(selector.clone()).or_default();
        let position = match elements.iter().position(|e| !e.hidden) {
            Some(i) => i,
            None => {
                elements.push(MockElement::default());
                elements.len() - 1
            }
        };
        elements[position].value = value.to_string();
    }

    /// Run `effect` once `ticks` more queries have been made.
    pub fn after(&mut self, ticks: u32, effect: impl FnOnce(&mut MockDom) + Send + 'static) {
        self.pending.push((ticks, Box::new(effect)));
    }

    fn tick(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut ready = Vec::new();
        for (ticks, effect) in pending {
            if ticks <= 1 {
                ready.push(effect);
            } else {
                self.pending.push((ticks - 1, effect));
            }
        }
        for effect in ready {
            effect(self);
        }
    }
}

/// Cheap to clone; clones share one DOM.
#[derive(Clone, Default)]
pub struct MockPage {
    dom: Arc<Mutex<MockDom>>,
}

impl MockPage {
    pub fn new() -> Self {
        MockPage::default()
    }

    /// Lock the DOM to script or inspect it. Do not hold across an await.
    pub fn dom(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn on_click(
        &self,
        selector: &Selector,
        reaction: impl Fn(&mut MockDom, usize) + Send + Sync + 'static,
    ) {
        self.dom()
            .on_click
            .insert(selector.clone(), Arc::new(reaction));
    }

    pub fn on_fill(
        &self,
        selector: &Selector,
        reaction: impl Fn(&mut MockDom, &str) + Send + Sync + 'static,
    ) {
        self.dom().on_fill.insert(selector.clone(), Arc::new(reaction));
    }

    pub fn on_upload(
        &self,
        selector: &Selector,
        reaction: impl Fn(&mut MockDom, &Path) + Send + Sync + 'static,
    ) {
        self.dom()
            .on_upload
            .insert(selector.clone(), Arc::new(reaction));
    }

    pub fn actions(&self) -> Vec<String> {
        self.dom().actions.clone()
    }

    fn query<T>(&self, read: impl FnOnce(&MockDom) -> T) -> T {
        let mut dom = self.dom();
        dom.tick();
        read(&dom)
    }

    fn missing(selector: &Selector) -> HarnessError {
        HarnessError::ElementNotFound {
            chain: selector.clone().into(),
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str) -> HarnessResult<()> {
        let mut dom = self.dom();
        dom.actions.push(format!("goto {url}"));
        dom.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.query(|dom| dom.url.clone()))
    }

    async fn count(&self, selector: &Selector) -> HarnessResult<usize> {
        Ok(self.query(|dom| dom.count(selector)))
    }

    async fn click(&self, selector: &Selector, nth: usize) -> HarnessResult<()> {
        let mut dom = self.dom();
        if dom.count(selector) <= nth {
            return Err(Self::missing(selector));
        }
        dom.actions.push(format!("click {selector} #{nth}"));
        if let Some(reaction) = dom.on_click.get(selector).cloned() {
            reaction(&mut *dom, nth);
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> HarnessResult<()> {
        let mut dom = self.dom();
        if dom.count(selector) == 0 {
            return Err(Self::missing(selector));
        }
        dom.actions.push(format!("fill {selector} = {value}"));
        dom.set_value(selector, value);
        if let Some(reaction) = dom.on_fill.get(selector).cloned() {
            reaction(&mut *dom, value);
        }
        Ok(())
    }

    async fn texts(&self, selector: &Selector) -> HarnessResult<Vec<String>> {
        Ok(self.query(|dom| dom.texts(selector)))
    }

    async fn value(&self, selector: &Selector) -> HarnessResult<String> {
        let mut dom = self.dom();
        dom.tick();
        if dom.count(selector) == 0 {
            return Err(Self::missing(selector));
        }
        Ok(dom.value(selector))
    }

    async fn texts_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<Vec<String>> {
        self.query(|dom| dom.texts_within(scope, nth, selector))
            .ok_or_else(|| Self::missing(scope))
    }

    /// Runs the click reaction registered for `selector` with the scope
    /// index, so a script knows which row was hit.
    async fn click_within(
        &self,
        scope: &Selector,
        nth: usize,
        selector: &Selector,
    ) -> HarnessResult<()> {
        let mut dom = self.dom();
        let found = dom
            .texts_within(scope, nth, selector)
            .is_some_and(|children| !children.is_empty());
        if !found {
            return Err(Self::missing(&selector.clone().within(scope.clone())));
        }
        dom.actions.push(format!("click {selector} in {scope} #{nth}"));
        if let Some(reaction) = dom.on_click.get(selector).cloned() {
            reaction(&mut *dom, nth);
        }
        Ok(())
    }

    async fn upload(&self, selector: &Selector, file: &Path) -> HarnessResult<()> {
        let mut dom = self.dom();
        dom.actions.push(format!("upload {}", file.display()));
        dom.uploads.push(file.to_path_buf());
        if let Some(reaction) = dom.on_upload.get(selector).cloned() {
            reaction(&mut *dom, file);
        }
        Ok(())
    }

    async fn click_at(&self, selector: &Selector, x: i64, y: i64) -> HarnessResult<()> {
        let mut dom = self.dom();
        if dom.count(selector) == 0 {
            return Err(Self::missing(selector));
        }
        dom.actions.push(format!("click {selector} at ({x}, {y})"));
        if let Some(reaction) = dom.on_click.get(selector).cloned() {
            reaction(&mut *dom, 0);
        }
        Ok(())
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\nmock".to_vec())
    }

    async fn close(&self) -> HarnessResult<()> {
        self.dom().closed = true;
        Ok(())
    }
}
