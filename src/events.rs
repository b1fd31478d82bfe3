use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::error;

use crate::dom;
use crate::error::HookError;

/// Interaction events the positioner wires up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseOver,
    MouseOut,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::MouseOver => "mouseover",
            EventKind::MouseOut => "mouseout",
        }
    }
}

type Listener = Rc<dyn Fn() -> Result<(), HookError>>;

struct ListenerEntry {
    // Held so the address keying this entry cannot be reused while the
    // entry lives.
    #[allow(dead_code)]
    node: NodeRef,
    callbacks: Vec<Listener>,
}

/// What one dispatch did.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub listeners_run: usize,
    pub errors: Vec<HookError>,
}

/// Per-runtime listener registry keyed by node identity and event kind.
/// Registration is append-only: repeated binds accumulate, and the
/// open-state guards in the listeners keep duplicates inert.
#[derive(Default)]
pub struct EventTargets {
    entries: RefCell<HashMap<(usize, EventKind), ListenerEntry>>,
}

impl EventTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        node: &NodeRef,
        kind: EventKind,
        listener: impl Fn() -> Result<(), HookError> + 'static,
    ) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .entry((dom::node_key(node), kind))
            .or_insert_with(|| ListenerEntry {
                node: node.clone(),
                callbacks: Vec::new(),
            });
        entry.callbacks.push(Rc::new(listener));
    }

    pub fn is_listening(&self, node: &NodeRef, kind: EventKind) -> bool {
        self.entries
            .borrow()
            .get(&(dom::node_key(node), kind))
            .map(|entry| !entry.callbacks.is_empty())
            .unwrap_or(false)
    }

    /// Run every listener registered for the pair, in registration order.
    /// A failing listener is logged and collected; the rest still run.
    pub fn dispatch(&self, node: &NodeRef, kind: EventKind) -> DispatchOutcome {
        let callbacks: Vec<Listener> = self
            .entries
            .borrow()
            .get(&(dom::node_key(node), kind))
            .map(|entry| entry.callbacks.clone())
            .unwrap_or_default();

        let mut outcome = DispatchOutcome::default();
        for callback in callbacks {
            outcome.listeners_run += 1;
            if let Err(err) = callback() {
                error!(target: "events", kind = kind.name(), error = %err, "listener failed");
                outcome.errors.push(err);
            }
        }
        outcome
    }
}
