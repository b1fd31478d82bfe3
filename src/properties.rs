use serde::{Deserialize, Serialize};

/// One framework property write, as shipped over the embedder's patch
/// protocol. The tag preserves the upstream contract: truthy `open` opens
/// (deferred and retried), falsy closes immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property", rename_all = "snake_case")]
pub enum PropertyWrite {
    /// `open` on a `<dialog>` element.
    Open { value: bool },
    /// Hover-driven tooltip behavior on a floating element.
    Tooltip,
    /// Select/listbox placement on list open.
    SelectList(SelectListConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectListConfig {
    pub is_popover_style: bool,
    /// Value of the currently selected option, used to center it on the
    /// trigger in the non-popover mode.
    #[serde(default)]
    pub value: Option<String>,
}
