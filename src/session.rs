use std::rc::Rc;

use kuchiki::NodeRef;
use tracing::info;

use crate::dialog;
use crate::dom;
use crate::error::HookError;
use crate::events::{DispatchOutcome, EventKind, EventTargets};
use crate::host::RenderHost;
use crate::portal::{Portal, Portals, PORTAL_TAG};
use crate::position;
use crate::properties::PropertyWrite;
use crate::schedule::{FrameClock, FrameOutcome, LoadState, Scheduler};

/// Owns the behavior runtime for one page and coordinates the component
/// hooks: readiness, frame pacing, portals, placement, and dialog glue.
pub struct PageRuntime {
    document: NodeRef,
    host: Rc<dyn RenderHost>,
    clock: Rc<FrameClock>,
    scheduler: Rc<Scheduler>,
    portals: Rc<Portals>,
    targets: Rc<EventTargets>,
}

/// What a connect scan found and did.
#[derive(Debug, Default)]
pub struct AdoptSummary {
    pub portals_connected: usize,
    /// Per-element configuration errors; the scan continues past them.
    pub errors: Vec<HookError>,
}

impl PageRuntime {
    pub fn new(document: NodeRef, host: Rc<dyn RenderHost>, load_state: LoadState) -> Self {
        let clock = Rc::new(FrameClock::new());
        let scheduler = Rc::new(Scheduler::new(Rc::clone(&clock), load_state));
        let portals = Rc::new(Portals::new(Rc::clone(&clock)));
        Self {
            document,
            host,
            clock,
            scheduler,
            portals,
            targets: Rc::new(EventTargets::new()),
        }
    }

    pub fn document(&self) -> &NodeRef {
        &self.document
    }

    pub fn is_ready(&self) -> bool {
        self.scheduler.is_ready()
    }

    pub fn pending_frame_tasks(&self) -> usize {
        self.clock.pending()
    }

    /// Structural parse finished: release everything parked behind the gate.
    pub fn document_ready(&self) {
        info!(target: "session", "document structure ready");
        self.scheduler.mark_ready();
    }

    /// Pump one animation frame.
    pub fn run_frame(&self) -> FrameOutcome {
        self.clock.run_frame()
    }

    /// Scan `root` and its subtree in tree order for portal elements
    /// entering the document and run their connect transitions.
    /// Configuration errors are collected per element, not propagated.
    pub fn connect_tree(&self, root: &NodeRef) -> AdoptSummary {
        let mut summary = AdoptSummary::default();
        for node in portal_hosts(root) {
            match Portals::connected(&self.portals, &node) {
                Ok(_) => summary.portals_connected += 1,
                Err(err) => summary.errors.push(err),
            }
        }
        summary
    }

    /// Run the disconnect transition for every portal element in `root`'s
    /// subtree, releasing anchor bindings and back-references.
    pub fn disconnect_tree(&self, root: &NodeRef) {
        for node in portal_hosts(root) {
            self.portals.disconnected(&node);
        }
    }

    pub fn portal(&self, host: &NodeRef) -> Option<Rc<Portal>> {
        self.portals.get(host)
    }

    pub fn portal_for_anchor(&self, anchor: &NodeRef) -> Option<Rc<Portal>> {
        self.portals.portal_for_anchor(anchor)
    }

    /// Apply one framework property write to a node.
    pub fn assign(&self, node: &NodeRef, write: PropertyWrite) -> Result<(), HookError> {
        match write {
            PropertyWrite::Open { value } => {
                dialog::set_open(&self.scheduler, &self.host, node, value)
            }
            PropertyWrite::Tooltip => {
                position::bind_tooltip(&self.scheduler, &self.targets, &self.host, node);
                Ok(())
            }
            PropertyWrite::SelectList(config) => {
                position::open_select_list(&self.clock, &self.scheduler, &self.host, node, config);
                Ok(())
            }
        }
    }

    /// Apply a property write shipped as JSON text.
    pub fn assign_json(&self, node: &NodeRef, payload: &str) -> Result<(), HookError> {
        let write: PropertyWrite = serde_json::from_str(payload)?;
        self.assign(node, write)
    }

    pub fn is_listening(&self, node: &NodeRef, kind: EventKind) -> bool {
        self.targets.is_listening(node, kind)
    }

    /// Deliver an interaction event to the listeners bound on `node`.
    pub fn dispatch(&self, node: &NodeRef, kind: EventKind) -> DispatchOutcome {
        self.targets.dispatch(node, kind)
    }
}

fn portal_hosts(root: &NodeRef) -> Vec<NodeRef> {
    root.inclusive_descendants()
        .filter(|node| dom::is_element_named(node, PORTAL_TAG))
        .collect()
}
