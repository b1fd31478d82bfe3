#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use kuchiki::traits::*;
use kuchiki::NodeRef;
use outrigger::{dom, HookError, LoadState, PageRuntime, Rect, RenderHost, Size};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

/// Scriptable stand-in for the rendering engine. Tests seed it with layout
/// rectangles and let it record the popover and dialog calls the hooks make.
pub struct StubHost {
    viewport: Cell<Size>,
    rects: RefCell<HashMap<usize, (NodeRef, Rect)>>,
    open_popovers: RefCell<HashSet<usize>>,
    show_calls: Cell<u32>,
    hide_calls: Cell<u32>,
    modal_refusals: Cell<u32>,
    modal_calls: Cell<u32>,
    closed: RefCell<Vec<Option<String>>>,
}

impl StubHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            viewport: Cell::new(Size::new(1024.0, 768.0)),
            rects: RefCell::new(HashMap::new()),
            open_popovers: RefCell::new(HashSet::new()),
            show_calls: Cell::new(0),
            hide_calls: Cell::new(0),
            modal_refusals: Cell::new(0),
            modal_calls: Cell::new(0),
            closed: RefCell::new(Vec::new()),
        })
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.viewport.set(Size::new(width, height));
    }

    /// Gives `node` a layout rectangle, as if the engine had painted it.
    pub fn put_rect(&self, node: &NodeRef, rect: Rect) {
        self.rects
            .borrow_mut()
            .insert(dom::node_key(node), (node.clone(), rect));
    }

    /// Makes the next `times` show_modal calls fail, as an engine does while
    /// the dialog element is not yet in its tree.
    pub fn refuse_modal(&self, times: u32) {
        self.modal_refusals.set(times);
    }

    pub fn show_calls(&self) -> u32 {
        self.show_calls.get()
    }

    pub fn hide_calls(&self) -> u32 {
        self.hide_calls.get()
    }

    pub fn modal_calls(&self) -> u32 {
        self.modal_calls.get()
    }

    pub fn closed(&self) -> Vec<Option<String>> {
        self.closed.borrow().clone()
    }
}

impl RenderHost for StubHost {
    fn viewport(&self) -> Size {
        self.viewport.get()
    }

    fn bounding_rect(&self, node: &NodeRef) -> Option<Rect> {
        self.rects
            .borrow()
            .get(&dom::node_key(node))
            .map(|(_, rect)| *rect)
    }

    fn popover_open(&self, node: &NodeRef) -> bool {
        self.open_popovers.borrow().contains(&dom::node_key(node))
    }

    fn show_popover(&self, node: &NodeRef) {
        self.open_popovers.borrow_mut().insert(dom::node_key(node));
        self.show_calls.set(self.show_calls.get() + 1);
    }

    fn hide_popover(&self, node: &NodeRef) {
        self.open_popovers.borrow_mut().remove(&dom::node_key(node));
        self.hide_calls.set(self.hide_calls.get() + 1);
    }

    fn show_modal(&self, _node: &NodeRef) -> Result<(), HookError> {
        let refusals = self.modal_refusals.get();
        if refusals > 0 {
            self.modal_refusals.set(refusals - 1);
            return Err(HookError::ModalRefused {
                reason: "element is not connected".to_string(),
            });
        }
        self.modal_calls.set(self.modal_calls.get() + 1);
        Ok(())
    }

    fn close_dialog(&self, _node: &NodeRef, return_value: Option<&str>) {
        self.closed
            .borrow_mut()
            .push(return_value.map(str::to_string));
    }
}

pub fn parse(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

pub fn by_id(document: &NodeRef, id: &str) -> NodeRef {
    document
        .select_first(&format!("#{id}"))
        .unwrap_or_else(|_| panic!("fixture should contain #{id}"))
        .as_node()
        .clone()
}

pub fn body(document: &NodeRef) -> NodeRef {
    document
        .select_first("body")
        .expect("parsed document should have a body")
        .as_node()
        .clone()
}

/// Parses `html` and returns its first element, detached from any document.
pub fn element(html: &str) -> NodeRef {
    let document = parse(&format!("<body>{html}</body>"));
    let node = body(&document)
        .children()
        .find(|child| child.as_element().is_some())
        .expect("fragment should contain an element");
    node.detach();
    node
}

pub fn runtime_for(document: &NodeRef, host: Rc<StubHost>, state: LoadState) -> PageRuntime {
    init_tracing();
    PageRuntime::new(document.clone(), host, state)
}
