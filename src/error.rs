use thiserror::Error;

/// Failures surfaced by the component hooks.
///
/// Configuration errors (`MissingAttribute`, `NotADialog`) are final and never
/// retried. Layout-dependent failures (`NotLaidOut`, `MissingTrigger`,
/// `MissingArrow`, `ModalRefused`) are transient and eligible for frame-paced
/// retry. The remaining variants are contract violations reported straight to
/// the caller.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("<{tag}> is missing its {attribute} attribute")]
    MissingAttribute {
        tag: &'static str,
        attribute: &'static str,
    },

    #[error("the open property only applies to <dialog> elements")]
    NotADialog,

    #[error("floating element has no preceding trigger element")]
    MissingTrigger,

    #[error("floating element has no arrow child")]
    MissingArrow,

    #[error("node has no layout box yet")]
    NotLaidOut,

    #[error("modal open refused: {reason}")]
    ModalRefused { reason: String },

    #[error("container holds no text to splice")]
    NotAText,

    #[error("text splice offset {offset} exceeds length {len}")]
    SpliceOutOfRange { offset: usize, len: usize },

    #[error("reference node is not a child of this container")]
    NotAChild,

    #[error("malformed property write: {0}")]
    Protocol(#[from] serde_json::Error),
}
