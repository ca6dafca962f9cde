use thiserror::Error;

/// Errors raised while setting up controllers or the element tree.
///
/// Runtime paths (mutation handling, target reads, attribute sync) never
/// return these; they degrade to no-ops and emit diagnostics instead.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Failed to parse HTML: {0}")]
    Parse(#[from] std::io::Error),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid target declarations: {0}")]
    InvalidTargets(#[from] serde_json::Error),

    #[error("<{tag}> has no shadow root")]
    NoShadowRoot { tag: String },

    #[error("Node is not an element")]
    NotAnElement,
}

pub type Result<T> = std::result::Result<T, ControllerError>;
