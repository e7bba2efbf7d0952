//! Scripted in-memory browser used by the engine tests.
//!
//! Pages are trees of nodes whose children are keyed by the exact
//! [`Locator`] the crawler asks for, so fixtures only describe what the
//! crawler actually looks up. Clicks apply scripted mutations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::classifier::search_url;
use crate::error::PortError;
use crate::port::{AutomationPort, ElementRef, Frame, Locator, PortFactory};
use crate::selectors::{self, scripts};

pub(crate) type NodeId = usize;

#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    SetChildren {
        parent: NodeId,
        locator: Locator,
        children: Vec<NodeId>,
    },
    SetAttr {
        node: NodeId,
        name: String,
        value: String,
    },
}

#[derive(Debug, Default)]
struct Node {
    text: String,
    attrs: HashMap<String, String>,
    children: HashMap<Locator, Vec<NodeId>>,
    frame: Option<NodeId>,
    on_click: Vec<Mutation>,
    poisoned: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    routes: HashMap<String, NodeId>,
    scripts: HashMap<String, Value>,
    top: Option<NodeId>,
    current: Option<NodeId>,
    navigations: Vec<String>,
    frame_entries: usize,
    failing_urls: HashSet<String>,
    closed: bool,
}

impl State {
    fn add(&mut self, text: &str) -> NodeId {
        self.nodes.push(Node {
            text: text.to_string(),
            ..Node::default()
        });
        self.nodes.len() - 1
    }

    fn resolve(&self, element: &ElementRef) -> Result<NodeId, PortError> {
        element
            .id()
            .strip_prefix("node-")
            .and_then(|n| n.parse::<NodeId>().ok())
            .filter(|id| *id < self.nodes.len())
            .ok_or_else(|| PortError::NotFound(format!("stale element {}", element.id())))
    }

    fn check_alive(&self, scope: Option<NodeId>) -> Result<(), PortError> {
        if self.closed {
            return Err(PortError::Transport("session closed".to_string()));
        }
        let poisoned = |id: Option<NodeId>| id.is_some_and(|id| self.nodes[id].poisoned);
        if poisoned(self.current) || poisoned(scope) {
            return Err(PortError::Transport("browser crashed".to_string()));
        }
        Ok(())
    }

    fn apply(&mut self, mutations: Vec<Mutation>) {
        for mutation in mutations {
            match mutation {
                Mutation::SetChildren {
                    parent,
                    locator,
                    children,
                } => {
                    self.nodes[parent].children.insert(locator, children);
                }
                Mutation::SetAttr { node, name, value } => {
                    self.nodes[node].attrs.insert(name, value);
                }
            }
        }
    }
}

fn element(id: NodeId) -> ElementRef {
    ElementRef::new(format!("node-{id}"))
}

/// Clones share one page model, so a test can keep a handle after giving the
/// browser to a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBrowser {
    state: Arc<Mutex<State>>,
}

impl FakeBrowser {
    pub(crate) fn new() -> Self {
        let browser = Self::default();
        browser.script(scripts::ELEMENT_SCROLL_HEIGHT, Value::from(1200));
        browser.script(scripts::SCROLL_PAGE_TO_BOTTOM, Value::from(4800));
        browser
    }

    pub(crate) fn node(&self, text: &str) -> NodeId {
        self.state.lock().unwrap().add(text)
    }

    /// Create a node with `text` and attach it under `parent` at `locator`.
    pub(crate) fn add(&self, parent: NodeId, locator: &Locator, text: &str) -> NodeId {
        let mut state = self.state.lock().unwrap();
        let child = state.add(text);
        state.nodes[parent]
            .children
            .entry(locator.clone())
            .or_default()
            .push(child);
        child
    }

    pub(crate) fn attach(&self, parent: NodeId, locator: &Locator, child: NodeId) {
        self.state.lock().unwrap().nodes[parent]
            .children
            .entry(locator.clone())
            .or_default()
            .push(child);
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str, value: &str) {
        self.state.lock().unwrap().nodes[node]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub(crate) fn frame(&self, iframe: NodeId, root: NodeId) {
        self.state.lock().unwrap().nodes[iframe].frame = Some(root);
    }

    pub(crate) fn on_click(&self, node: NodeId, mutation: Mutation) {
        self.state.lock().unwrap().nodes[node].on_click.push(mutation);
    }

    pub(crate) fn poison(&self, node: NodeId) {
        self.state.lock().unwrap().nodes[node].poisoned = true;
    }

    pub(crate) fn route(&self, url: &str, root: NodeId) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(url.to_string(), root);
    }

    pub(crate) fn script(&self, script: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(script.to_string(), value);
    }

    pub(crate) fn fail_navigation(&self, url: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_urls
            .insert(url.to_string());
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    /// Number of switches into an iframe so far.
    pub(crate) fn frame_entries(&self) -> usize {
        self.state.lock().unwrap().frame_entries
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn click_node(&self, id: NodeId) {
        let mut state = self.state.lock().unwrap();
        let mutations = state.nodes[id].on_click.clone();
        state.apply(mutations);
    }
}

#[async_trait]
impl AutomationPort for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(PortError::Transport("session closed".to_string()));
        }
        if state.failing_urls.contains(url) {
            return Err(PortError::Transport(format!("navigation to {url} failed")));
        }
        state.navigations.push(url.to_string());
        let root = match state.routes.get(url) {
            Some(root) => *root,
            None => state.add(""),
        };
        state.top = Some(root);
        state.current = Some(root);
        Ok(())
    }

    async fn switch_to_frame(&self, frame: Frame<'_>) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(PortError::Transport("session closed".to_string()));
        }
        match frame {
            Frame::Default => state.current = state.top,
            Frame::Element(el) => {
                let id = state.resolve(el)?;
                let root = state.nodes[id]
                    .frame
                    .ok_or_else(|| PortError::NotFound("no such frame".to_string()))?;
                state.current = Some(root);
                state.frame_entries += 1;
            }
        }
        Ok(())
    }

    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Option<ElementRef>, PortError> {
        Ok(self.find_elements(locator, scope).await?.into_iter().next())
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, PortError> {
        let state = self.state.lock().unwrap();
        let scope_id = scope.map(|s| state.resolve(s)).transpose()?;
        state.check_alive(scope_id)?;
        let Some(parent) = scope_id.or(state.current) else {
            return Ok(Vec::new());
        };
        Ok(state.nodes[parent]
            .children
            .get(locator)
            .map(|ids| ids.iter().copied().map(element).collect())
            .unwrap_or_default())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), PortError> {
        let id = {
            let state = self.state.lock().unwrap();
            state.check_alive(None)?;
            state.resolve(element)?
        };
        self.click_node(id);
        Ok(())
    }

    async fn run_script(&self, script: &str, args: &[&ElementRef]) -> Result<Value, PortError> {
        let target = {
            let state = self.state.lock().unwrap();
            state.check_alive(None)?;
            args.first().map(|a| state.resolve(a)).transpose()?
        };
        match (script, target) {
            (scripts::CLICK, Some(id)) => {
                self.click_node(id);
                Ok(Value::Null)
            }
            (scripts::SCROLL_INTO_VIEW, _) => Ok(Value::Null),
            (scripts::TEXT_CONTENT, Some(id)) => {
                let state = self.state.lock().unwrap();
                Ok(Value::from(state.nodes[id].text.clone()))
            }
            _ => {
                let state = self.state.lock().unwrap();
                Ok(state.scripts.get(script).cloned().unwrap_or(Value::Null))
            }
        }
    }

    async fn text(&self, element: &ElementRef) -> Result<String, PortError> {
        let state = self.state.lock().unwrap();
        let id = state.resolve(element)?;
        state.check_alive(Some(id))?;
        Ok(state.nodes[id].text.clone())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, PortError> {
        let state = self.state.lock().unwrap();
        let id = state.resolve(element)?;
        state.check_alive(Some(id))?;
        Ok(state.nodes[id].attrs.get(name).cloned())
    }

    async fn close(&self) -> Result<(), PortError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Builds map-site shaped fixtures on top of a [`FakeBrowser`].
pub(crate) struct FakeSite {
    pub(crate) browser: FakeBrowser,
}

/// One row of a fake candidate list.
pub(crate) struct FakeCandidate {
    pub(crate) name: &'static str,
    pub(crate) address: &'static str,
    /// Detail page opened when the row is clicked.
    pub(crate) detail: Option<DetailPage>,
}

#[derive(Debug, Clone)]
pub(crate) struct DetailPage {
    pub(crate) url: String,
    pub(crate) root: NodeId,
}

impl FakeSite {
    pub(crate) fn new() -> Self {
        let site = Self {
            browser: FakeBrowser::new(),
        };
        let home = site.document();
        site.browser.route(selectors::HOME_URL, home);
        site
    }

    fn document(&self) -> NodeId {
        let root = self.browser.node("");
        self.browser.add(root, &selectors::ROOT, "");
        root
    }

    fn entry_iframe(&self, detail: &DetailPage) -> NodeId {
        let iframe = self.browser.node("");
        self.browser.attr(iframe, "src", &detail.url);
        self.browser.frame(iframe, detail.root);
        iframe
    }

    /// An empty detail page for `/place/<id>`; tests add fields to `root`.
    pub(crate) fn detail(&self, id: u64) -> DetailPage {
        DetailPage {
            url: format!("https://pcmap.place.naver.com/place/{id}/home?from=map"),
            root: self.browser.node(""),
        }
    }

    /// Detail page with a title, for tests that only care about identity.
    pub(crate) fn titled_detail(&self, id: u64, name: &str) -> DetailPage {
        let detail = self.detail(id);
        self.browser.add(detail.root, &selectors::TITLE_SPANS, name);
        self.browser.add(detail.root, &selectors::TITLE_SPANS, "Restaurant");
        detail
    }

    pub(crate) fn single_result(&self, query: &str, detail: &DetailPage) {
        let doc = self.document();
        let iframe = self.entry_iframe(detail);
        self.browser.attach(doc, &selectors::ENTRY_IFRAME, iframe);
        self.browser.route(&search_url(query), doc);
    }

    pub(crate) fn no_results(&self, query: &str) {
        let doc = self.document();
        let iframe = self.browser.add(doc, &selectors::SEARCH_IFRAME, "");
        let list = self.browser.node("");
        self.browser.frame(iframe, list);
        self.browser.add(
            list,
            &selectors::NO_RESULT_MARKER,
            &format!("{}.", selectors::NO_RESULT_TEXT),
        );
        self.browser.route(&search_url(query), doc);
    }

    /// A paginated candidate list; `pages[0]` is shown first.
    pub(crate) fn candidate_list(&self, query: &str, pages: Vec<Vec<FakeCandidate>>) {
        let doc = self.document();
        let iframe = self.browser.add(doc, &selectors::SEARCH_IFRAME, "");
        let list = self.browser.node("");
        self.browser.frame(iframe, list);
        self.browser.add(list, &selectors::LIST_CONTAINER, "");

        let mut page_rows = Vec::new();
        for page in pages {
            let mut rows = Vec::new();
            for candidate in page {
                let row = self.browser.node("");
                let name = self.browser.add(row, &selectors::CANDIDATE_NAME, candidate.name);
                self.browser
                    .add(row, &selectors::CANDIDATE_ADDRESS, candidate.address);
                if let Some(detail) = &candidate.detail {
                    let entry = self.entry_iframe(detail);
                    self.browser.on_click(
                        name,
                        Mutation::SetChildren {
                            parent: doc,
                            locator: selectors::ENTRY_IFRAME,
                            children: vec![entry],
                        },
                    );
                }
                rows.push(row);
            }
            page_rows.push(rows);
        }

        let links: Vec<NodeId> = (1..=page_rows.len())
            .map(|n| self.browser.add(list, &selectors::page_link(n), &n.to_string()))
            .collect();
        for (idx, link) in links.iter().enumerate() {
            self.browser.on_click(
                *link,
                Mutation::SetChildren {
                    parent: list,
                    locator: selectors::CANDIDATE_ROWS,
                    children: page_rows[idx].clone(),
                },
            );
            for (other, other_link) in links.iter().enumerate() {
                self.browser.on_click(
                    *link,
                    Mutation::SetChildren {
                        parent: list,
                        locator: selectors::active_page_link(other + 1),
                        children: if other == idx { vec![*other_link] } else { Vec::new() },
                    },
                );
            }
        }

        if let Some(first) = page_rows.first() {
            for row in first {
                self.browser.attach(list, &selectors::CANDIDATE_ROWS, *row);
            }
        }
        if let Some(first_link) = links.first() {
            self.browser
                .attach(list, &selectors::active_page_link(1), *first_link);
        }
        self.browser.route(&search_url(query), doc);
    }
}

/// Hands out pre-built fake browsers by worker id; unknown ids fail like a
/// browser that would not start.
#[derive(Default)]
pub(crate) struct FakeFactory {
    pub(crate) browsers: Mutex<HashMap<usize, FakeBrowser>>,
}

#[async_trait]
impl PortFactory for FakeFactory {
    async fn open(&self, worker_id: usize) -> Result<Box<dyn AutomationPort>, PortError> {
        self.browsers
            .lock()
            .unwrap()
            .remove(&worker_id)
            .map(|b| Box::new(b) as Box<dyn AutomationPort>)
            .ok_or_else(|| PortError::Transport(format!("no browser for worker {worker_id}")))
    }
}
