use std::rc::Rc;

use kuchiki::NodeRef;

use crate::dom;
use crate::error::HookError;
use crate::host::RenderHost;
use crate::schedule::Scheduler;

const DIALOG_TAG: &str = "dialog";
const RETURN_VALUE_ATTR: &str = "returnvalue";

/// Bridge the framework's `open` property to modal dialog calls: a truthy
/// write shows the modal once the document is ready, retrying while the
/// host refuses; a falsy write closes immediately, forwarding the element's
/// return value, and is never deferred.
pub fn set_open(
    scheduler: &Rc<Scheduler>,
    host: &Rc<dyn RenderHost>,
    dialog: &NodeRef,
    open: bool,
) -> Result<(), HookError> {
    if !dom::is_element_named(dialog, DIALOG_TAG) {
        return Err(HookError::NotADialog);
    }
    if open {
        let host = Rc::clone(host);
        let dialog = dialog.clone();
        scheduler.run_when_ready(move || host.show_modal(&dialog));
    } else {
        let return_value = dom::attr(dialog, RETURN_VALUE_ATTR);
        host.close_dialog(dialog, return_value.as_deref());
    }
    Ok(())
}
