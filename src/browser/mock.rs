//! In-memory browser for exercising widgets, views and navigation without a
//! driver.
//!
//! Pages are trees of [`MockNode`]s keyed by URL path; locators match by
//! equality rather than by evaluating CSS or XPath. Nodes registered with
//! [`MockBrowser::global`] are present on every page (portal chrome).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::widget::table::{CELL_XPATH, ROW_XPATH};

use super::{Browser, ElementRef, Locator};

/// What a click does besides recording itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Loads another portal path.
    Navigate(String),
    /// Removes the ancestor this many levels up (1 = parent).
    RemoveAncestor(usize),
    /// Opens a confirmation dialog; the effects run once it is accepted.
    Confirm(Vec<ClickEffect>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Element,
    Option,
    Radio,
}

/// Builder for one element of a mock page.
#[derive(Debug, Clone)]
pub struct MockNode {
    locator: Locator,
    kind: NodeKind,
    text: String,
    value: String,
    displayed: bool,
    checked: bool,
    children: Vec<MockNode>,
    on_click: Vec<ClickEffect>,
}

impl MockNode {
    /// A visible element found by `locator`.
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            kind: NodeKind::Element,
            text: String::new(),
            value: String::new(),
            displayed: true,
            checked: false,
            children: Vec::new(),
            on_click: Vec::new(),
        }
    }

    /// A `<option>` that sets its parent's value when clicked.
    pub fn option(value: &str, text: &str) -> Self {
        let mut node = Self::new(Locator::option_value(value))
            .text(text)
            .value(value);
        node.kind = NodeKind::Option;
        node
    }

    /// A radio input; clicking checks it and unchecks its siblings.
    pub fn radio(value: &str) -> Self {
        let mut node = Self::new(Locator::input_value(value))
            .value(value);
        node.kind = NodeKind::Radio;
        node
    }

    /// A table cell with the given text.
    pub fn cell(text: &str) -> Self {
        Self::new(Locator::xpath(CELL_XPATH)).text(text)
    }

    /// A table whose rows are made of the given cells.
    pub fn table(locator: Locator, rows: Vec<Vec<MockNode>>) -> Self {
        rows.into_iter().fold(Self::new(locator), |table, cells| {
            let row = cells
                .into_iter()
                .fold(Self::new(Locator::xpath(ROW_XPATH)), MockNode::child);
            table.child(row)
        })
    }

    /// Sets rendered text.
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Sets the `value` property.
    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Marks the element as present but not rendered.
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Marks a radio as checked.
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Adds a child element.
    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    /// Adds a click effect.
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }
}

#[derive(Debug)]
struct Node {
    locator: Locator,
    kind: NodeKind,
    text: String,
    value: String,
    displayed: bool,
    checked: bool,
    removed: bool,
    page: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
    on_click: Vec<ClickEffect>,
}

#[derive(Debug, Default)]
struct Dom {
    url: String,
    nodes: Vec<Node>,
    pages: HashMap<String, Vec<usize>>,
    globals: Vec<usize>,
    pending_alert: Option<(usize, Vec<ClickEffect>)>,
    clicks: Vec<String>,
    opened: Vec<String>,
}

fn path_of(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Dom {
    fn insert(&mut self, node: MockNode, page: Option<String>, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            locator: node.locator,
            kind: node.kind,
            text: node.text,
            value: node.value,
            displayed: node.displayed,
            checked: node.checked,
            removed: false,
            page: page.clone(),
            parent,
            children: Vec::new(),
            on_click: node.on_click,
        });
        for child in node.children {
            let child_idx = self.insert(child, page.clone(), Some(idx));
            self.nodes[idx].children.push(child_idx);
        }
        idx
    }

    fn current_page(&self) -> String {
        path_of(&self.url)
    }

    /// Attached to the current document and not removed.
    fn alive(&self, idx: usize) -> bool {
        let page = self.current_page();
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            let node = &self.nodes[i];
            if node.removed {
                return false;
            }
            if node.parent.is_none() {
                return node.page.as_ref().map_or(true, |p| *p == page);
            }
            cursor = node.parent;
        }
        false
    }

    fn visible(&self, idx: usize) -> bool {
        if !self.alive(idx) {
            return false;
        }
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            if !self.nodes[i].displayed {
                return false;
            }
            cursor = self.nodes[i].parent;
        }
        true
    }

    fn resolve(&self, element: &ElementRef) -> Result<usize> {
        element
            .0
            .strip_prefix("node-")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|idx| *idx < self.nodes.len() && self.alive(*idx))
            .ok_or_else(|| Error::ElementNotFound(format!("stale element {}", element.0)))
    }

    fn collect(&self, idx: usize, locator: &Locator, out: &mut Vec<usize>) {
        for &child in &self.nodes[idx].children {
            if self.nodes[child].removed {
                continue;
            }
            if self.nodes[child].locator == *locator {
                out.push(child);
            }
            self.collect(child, locator, out);
        }
    }

    fn find(&self, scope: Option<usize>, locator: &Locator) -> Vec<usize> {
        let mut found = Vec::new();
        match scope {
            Some(idx) => self.collect(idx, locator, &mut found),
            None => {
                let page = self.current_page();
                let roots = self
                    .globals
                    .iter()
                    .chain(self.pages.get(&page).into_iter().flatten());
                for &root in roots {
                    if self.nodes[root].removed {
                        continue;
                    }
                    if self.nodes[root].locator == *locator {
                        found.push(root);
                    }
                    self.collect(root, locator, &mut found);
                }
            }
        }
        found
    }

    fn navigate(&mut self, url: String) {
        self.opened.push(url.clone());
        self.url = url;
    }

    fn apply(&mut self, origin: &str, idx: usize, effect: ClickEffect) {
        match effect {
            ClickEffect::Navigate(path) => self.navigate(format!("{}{}", origin, path)),
            ClickEffect::RemoveAncestor(levels) => {
                let mut target = idx;
                for _ in 0..levels {
                    match self.nodes[target].parent {
                        Some(parent) => target = parent,
                        None => break,
                    }
                }
                self.nodes[target].removed = true;
            }
            ClickEffect::Confirm(effects) => self.pending_alert = Some((idx, effects)),
        }
    }
}

/// In-memory [`Browser`].
pub struct MockBrowser {
    origin: String,
    dom: Mutex<Dom>,
}

impl MockBrowser {
    /// Creates a browser serving pages under `origin` (e.g. `https://admin.test`).
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            dom: Mutex::new(Dom {
                url: "about:blank".to_string(),
                ..Dom::default()
            }),
        }
    }

    fn dom(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Origin pages are served under.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Adds elements to the page at `path`.
    pub fn page(&self, path: &str, nodes: Vec<MockNode>) -> &Self {
        let page = path_of(path);
        let mut dom = self.dom();
        for node in nodes {
            let idx = dom.insert(node, Some(page.clone()), None);
            dom.pages.entry(page.clone()).or_default().push(idx);
        }
        self
    }

    /// Adds an element present on every page.
    pub fn global(&self, node: MockNode) -> &Self {
        let mut dom = self.dom();
        let idx = dom.insert(node, None, None);
        dom.globals.push(idx);
        self
    }

    /// Current URL path.
    pub fn current_path(&self) -> String {
        self.dom().current_page()
    }

    /// URLs loaded so far, by `open` or by navigating clicks.
    pub fn opened(&self) -> Vec<String> {
        self.dom().opened.clone()
    }

    /// Locators of clicked elements, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.dom().clicks.clone()
    }

    /// Value of the first element on the current page matching `locator`.
    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        let dom = self.dom();
        dom.find(None, locator)
            .first()
            .map(|idx| dom.nodes[*idx].value.clone())
    }

    /// Shows or hides every element on the current page matching `locator`.
    pub fn set_displayed(&self, locator: &Locator, displayed: bool) {
        let mut dom = self.dom();
        for idx in dom.find(None, locator) {
            dom.nodes[idx].displayed = displayed;
        }
    }

    /// Whether a confirmation dialog is open.
    pub fn alert_open(&self) -> bool {
        self.dom().pending_alert.is_some()
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        self.dom().navigate(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.dom().url.clone())
    }

    async fn find_all(
        &self,
        scope: Option<&ElementRef>,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>> {
        let dom = self.dom();
        let scope = scope.map(|element| dom.resolve(element)).transpose()?;
        Ok(dom
            .find(scope, locator)
            .into_iter()
            .map(|idx| ElementRef(format!("node-{}", idx)))
            .collect())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let dom = self.dom();
        let idx = dom.resolve(element)?;
        Ok(dom.visible(idx))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let mut dom = self.dom();
        let idx = dom.resolve(element)?;
        if !dom.visible(idx) {
            return Err(Error::NotInteractable(dom.nodes[idx].locator.to_string()));
        }
        if dom.pending_alert.is_some() {
            return Err(Error::WebDriver("unexpected alert open".to_string()));
        }

        let locator = dom.nodes[idx].locator.to_string();
        dom.clicks.push(locator);

        match dom.nodes[idx].kind {
            NodeKind::Option => {
                if let Some(parent) = dom.nodes[idx].parent {
                    dom.nodes[parent].value = dom.nodes[idx].value.clone();
                }
            }
            NodeKind::Radio => {
                if let Some(parent) = dom.nodes[idx].parent {
                    let siblings = dom.nodes[parent].children.clone();
                    for sibling in siblings {
                        if dom.nodes[sibling].kind == NodeKind::Radio {
                            dom.nodes[sibling].checked = false;
                        }
                    }
                }
                dom.nodes[idx].checked = true;
            }
            NodeKind::Element => {}
        }

        let effects = dom.nodes[idx].on_click.clone();
        for effect in effects {
            dom.apply(&self.origin, idx, effect);
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<()> {
        let mut dom = self.dom();
        let idx = dom.resolve(element)?;
        dom.nodes[idx].value.clear();
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        let mut dom = self.dom();
        let idx = dom.resolve(element)?;
        if !dom.visible(idx) {
            return Err(Error::NotInteractable(dom.nodes[idx].locator.to_string()));
        }
        dom.nodes[idx].value.push_str(text);
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let dom = self.dom();
        let idx = dom.resolve(element)?;
        Ok(dom.nodes[idx].text.clone())
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let dom = self.dom();
        let idx = dom.resolve(element)?;
        let node = &dom.nodes[idx];
        Ok(match name {
            "value" => Some(node.value.clone()),
            "checked" => Some(node.checked.to_string()),
            _ => None,
        })
    }

    async fn accept_alert(&self) -> Result<()> {
        let mut dom = self.dom();
        let (idx, effects) = dom
            .pending_alert
            .take()
            .ok_or_else(|| Error::WebDriver("no such alert".to_string()))?;
        for effect in effects {
            dom.apply(&self.origin, idx, effect);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
