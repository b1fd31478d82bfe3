//! Browser-side behavioral glue for declaratively rendered overlays:
//! portals, tooltips, select listboxes, and modal dialogs. The embedding
//! engine owns layout and painting; this crate owns the deferred-execution
//! scheduling those components rely on, plus the portal re-parenting and
//! placement math they need once the document is live.

pub mod dialog;
pub mod dom;
pub mod error;
pub mod events;
pub mod geometry;
pub mod host;
pub mod portal;
pub mod position;
pub mod properties;
pub mod schedule;
pub mod session;

pub use dom::Container;
pub use error::HookError;
pub use events::{DispatchOutcome, EventKind};
pub use geometry::{Rect, Size};
pub use host::RenderHost;
pub use portal::{Portal, PortalState, PORTAL_ANCHOR_ATTR, PORTAL_TAG, PORTAL_TARGET_ATTR};
pub use properties::{PropertyWrite, SelectListConfig};
pub use schedule::{FrameOutcome, LoadState, DEFAULT_RETRY_BUDGET};
pub use session::{AdoptSummary, PageRuntime};
