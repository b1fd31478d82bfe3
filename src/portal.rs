use std::cell::{Cell, RefCell};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use kuchiki::NodeRef;
use tracing::debug;

use crate::dom::{self, Container};
use crate::error::HookError;
use crate::schedule::FrameClock;

/// Tag the markup uses to instantiate a portal.
pub const PORTAL_TAG: &str = "elm-portal";
/// Required on the portal: names the anchor to re-parent into.
pub const PORTAL_TARGET_ATTR: &str = "data-elm-portal-target-id";
/// Required on the anchor to be matched.
pub const PORTAL_ANCHOR_ATTR: &str = "data-elm-portal-id";

// Frame-paced attempts after the synchronous one at connect.
const MOUNT_RETRIES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalState {
    Unconnected,
    Connecting,
    Mounted,
}

/// One `<elm-portal>` instance. The portal element never holds its logical
/// children directly: everything lives in the shadow content node, which is
/// appended to the resolved anchor while mounted. The instance survives
/// disconnect/reconnect cycles so its content does too.
pub struct Portal {
    host: NodeRef,
    content: NodeRef,
    clock: Rc<FrameClock>,
    state: Cell<PortalState>,
    anchor: RefCell<Option<NodeRef>>,
}

impl Portal {
    fn new(host: NodeRef, clock: Rc<FrameClock>) -> Rc<Self> {
        Rc::new(Self {
            host,
            content: dom::new_div(),
            clock,
            state: Cell::new(PortalState::Unconnected),
            anchor: RefCell::new(None),
        })
    }

    pub fn state(&self) -> PortalState {
        self.state.get()
    }

    pub fn host(&self) -> &NodeRef {
        &self.host
    }

    /// The shadow content node all delegated operations apply to.
    pub fn content(&self) -> &NodeRef {
        &self.content
    }

    pub fn anchor(&self) -> Option<NodeRef> {
        self.anchor.borrow().clone()
    }

    fn target_id(&self) -> Result<String, HookError> {
        dom::attr(&self.host, PORTAL_TARGET_ATTR).ok_or(HookError::MissingAttribute {
            tag: PORTAL_TAG,
            attribute: PORTAL_TARGET_ATTR,
        })
    }
}

impl Container for Portal {
    fn child_nodes(&self) -> Vec<NodeRef> {
        self.content.child_nodes()
    }

    /// Deferred one frame: the framework may still be mid-patch on the node
    /// it handed over.
    fn append_child(&self, child: NodeRef) {
        let content = self.content.clone();
        self.clock.request(move |_| content.append(child));
    }

    fn insert_child_before(
        &self,
        child: NodeRef,
        reference: Option<&NodeRef>,
    ) -> Result<(), HookError> {
        self.content.insert_child_before(child, reference)
    }

    fn remove_child(&self, child: &NodeRef) -> Result<(), HookError> {
        self.content.remove_child(child)
    }

    fn replace_data(&self, offset: usize, count: usize, data: &str) -> Result<(), HookError> {
        self.content.replace_data(offset, count, data)
    }
}

/// Registry of portal instances for one document, keyed by host node
/// identity, plus the anchor-to-portal back-references for mounted portals.
pub struct Portals {
    clock: Rc<FrameClock>,
    instances: RefCell<HashMap<usize, Rc<Portal>>>,
    by_anchor: RefCell<HashMap<usize, Weak<Portal>>>,
}

impl Portals {
    pub fn new(clock: Rc<FrameClock>) -> Self {
        Self {
            clock,
            instances: RefCell::new(HashMap::new()),
            by_anchor: RefCell::new(HashMap::new()),
        }
    }

    /// Connect transition for a portal host entering the document: validate
    /// the target attribute (loud, never retried), then try to mount now and
    /// fall back to frame-paced attempts. A portal whose anchor never
    /// appears stays unmounted silently.
    pub fn connected(registry: &Rc<Self>, host: &NodeRef) -> Result<Rc<Portal>, HookError> {
        let portal = {
            let mut instances = registry.instances.borrow_mut();
            match instances.entry(dom::node_key(host)) {
                Entry::Occupied(entry) => Rc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    let portal = Portal::new(host.clone(), Rc::clone(&registry.clock));
                    entry.insert(Rc::clone(&portal));
                    portal
                }
            }
        };

        if portal.state.get() != PortalState::Unconnected {
            return Ok(portal);
        }

        let target_id = portal.target_id()?;
        portal.state.set(PortalState::Connecting);
        if !registry.try_mount(&portal, &target_id) {
            debug!(target: "portal", %target_id, "anchor not found at connect; retrying");
            Self::schedule_attempt(registry, Rc::clone(&portal), target_id, MOUNT_RETRIES);
        }
        Ok(portal)
    }

    /// Disconnect transition: unmount the content from the cached anchor and
    /// release the binding and back-reference. Never fails; a mount attempt
    /// still pending simply finds nothing when it runs.
    pub fn disconnected(&self, host: &NodeRef) {
        let Some(portal) = self.get(host) else {
            return;
        };
        if let Some(anchor) = portal.anchor.borrow_mut().take() {
            self.by_anchor.borrow_mut().remove(&dom::node_key(&anchor));
            portal.content.detach();
        }
        portal.state.set(PortalState::Unconnected);
    }

    pub fn get(&self, host: &NodeRef) -> Option<Rc<Portal>> {
        self.instances.borrow().get(&dom::node_key(host)).cloned()
    }

    /// Non-owning lookup from a mounted anchor back to its portal.
    pub fn portal_for_anchor(&self, anchor: &NodeRef) -> Option<Rc<Portal>> {
        self.by_anchor
            .borrow()
            .get(&dom::node_key(anchor))
            .and_then(Weak::upgrade)
    }

    fn try_mount(&self, portal: &Rc<Portal>, target_id: &str) -> bool {
        let Some(anchor) = nearest_anchor(&portal.host, target_id) else {
            return false;
        };
        anchor.append(portal.content.clone());
        self.by_anchor
            .borrow_mut()
            .insert(dom::node_key(&anchor), Rc::downgrade(portal));
        *portal.anchor.borrow_mut() = Some(anchor);
        portal.state.set(PortalState::Mounted);
        true
    }

    fn schedule_attempt(registry: &Rc<Self>, portal: Rc<Portal>, target_id: String, retries: u32) {
        let weak_registry = Rc::downgrade(registry);
        registry.clock.request(move |_| {
            let Some(registry) = weak_registry.upgrade() else {
                return;
            };
            if portal.state.get() != PortalState::Connecting {
                return;
            }
            if registry.try_mount(&portal, &target_id) {
                return;
            }
            if retries > 1 {
                Self::schedule_attempt(&registry, portal, target_id, retries - 1);
            } else {
                debug!(target: "portal", %target_id, "anchor never appeared; portal stays unmounted");
            }
        });
    }
}

/// Walk outward from `start`: scan the parent's element children (the start
/// node included), then the grandparent's, ascending until a carrier of the
/// matching id attribute is found or the children of the first non-element
/// ancestor have been scanned. A detached start fails immediately.
pub fn nearest_anchor(start: &NodeRef, target_id: &str) -> Option<NodeRef> {
    let mut level = start.clone();
    loop {
        let parent = level.parent()?;
        for child in parent.children() {
            if child.as_element().is_some()
                && dom::attr(&child, PORTAL_ANCHOR_ATTR).as_deref() == Some(target_id)
            {
                return Some(child);
            }
        }
        if parent.as_element().is_none() {
            return None;
        }
        level = parent;
    }
}

#[cfg(test)]
mod tests {
    use kuchiki::traits::*;

    use super::*;

    fn fixture(html: &str) -> NodeRef {
        kuchiki::parse_html().one(html)
    }

    fn by_id(document: &NodeRef, id: &str) -> NodeRef {
        document
            .select_first(&format!("#{id}"))
            .expect("fixture node")
            .as_node()
            .clone()
    }

    #[test]
    fn nearer_anchor_wins() {
        let document = fixture(
            r#"<body>
                <div data-elm-portal-id="overlay" id="far">
                    <div>
                        <div data-elm-portal-id="overlay" id="near"></div>
                        <div><elm-portal id="portal"></elm-portal></div>
                    </div>
                </div>
            </body>"#,
        );
        let portal = by_id(&document, "portal");
        let found = nearest_anchor(&portal, "overlay").expect("anchor");
        assert_eq!(dom::attr(&found, "id").as_deref(), Some("near"));
    }

    #[test]
    fn ascends_to_outer_levels() {
        let document = fixture(
            r#"<body>
                <div data-elm-portal-id="overlay" id="anchor"></div>
                <div><div><elm-portal id="portal"></elm-portal></div></div>
            </body>"#,
        );
        let portal = by_id(&document, "portal");
        let found = nearest_anchor(&portal, "overlay").expect("anchor");
        assert_eq!(dom::attr(&found, "id").as_deref(), Some("anchor"));
    }

    #[test]
    fn id_must_match_exactly() {
        let document = fixture(
            r#"<body>
                <div data-elm-portal-id="other"></div>
                <elm-portal id="portal"></elm-portal>
            </body>"#,
        );
        let portal = by_id(&document, "portal");
        assert!(nearest_anchor(&portal, "overlay").is_none());
    }

    #[test]
    fn detached_start_resolves_nothing() {
        let document = fixture(r#"<body><elm-portal id="portal"></elm-portal></body>"#);
        let portal = by_id(&document, "portal");
        portal.detach();
        assert!(nearest_anchor(&portal, "overlay").is_none());
    }
}
