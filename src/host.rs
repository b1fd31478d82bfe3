use kuchiki::NodeRef;

use crate::error::HookError;
use crate::geometry::{Rect, Size};

/// Layout and overlay primitives owned by the embedding engine.
///
/// The hooks treat this surface as trusted: rects are read fresh on every
/// placement pass and never retained across frames.
pub trait RenderHost {
    /// Viewport dimensions in CSS px.
    fn viewport(&self) -> Size;

    /// Border-box rect of a node, or `None` while it has no layout box yet.
    fn bounding_rect(&self, node: &NodeRef) -> Option<Rect>;

    fn popover_open(&self, node: &NodeRef) -> bool;

    fn show_popover(&self, node: &NodeRef);

    fn hide_popover(&self, node: &NodeRef);

    /// Open a modal dialog. A refusal is treated as transient (the element
    /// may not be fully in the tree yet) and retried by the caller.
    fn show_modal(&self, node: &NodeRef) -> Result<(), HookError>;

    fn close_dialog(&self, node: &NodeRef, return_value: Option<&str>);
}
