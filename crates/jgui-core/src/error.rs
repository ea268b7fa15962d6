#![forbid(unsafe_code)]

//! Error taxonomy shared by the composer, router and binding engine.
//!
//! | Variant | Raised when | Scope |
//! |---------|-------------|-------|
//! | `Configuration` | malformed event spec or viewlet descriptor | that registration only |
//! | `NotFound` | unknown module or viewlet name | the call |
//! | `Lifecycle` | composer unbound, or no container to render into | the call |
//!
//! Remote (RPC) failures are not part of this enum: they are delivered as
//! data to a notification sink and never surface as `Err`.

use std::fmt;

use crate::selector::SelectorError;

/// What kind of name a [`ComposeError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Module,
    Viewlet,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => f.write_str("module"),
            Self::Viewlet => f.write_str("viewlet"),
        }
    }
}

/// Errors from composition, routing and binding operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// A declarative spec was rejected at registration time.
    Configuration { owner: String, reason: String },
    /// No module/viewlet is registered under this name.
    NotFound { kind: NameKind, name: String },
    /// The operation is not valid in the current lifecycle state.
    Lifecycle(&'static str),
}

impl ComposeError {
    pub fn configuration(owner: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            owner: owner.into(),
            reason: reason.into(),
        }
    }

    pub fn module_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: NameKind::Module,
            name: name.into(),
        }
    }

    pub fn viewlet_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: NameKind::Viewlet,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { owner, reason } => {
                write!(f, "invalid configuration for '{owner}': {reason}")
            }
            Self::NotFound { kind, name } => write!(f, "no {kind} named '{name}'"),
            Self::Lifecycle(msg) => write!(f, "lifecycle error: {msg}"),
        }
    }
}

impl std::error::Error for ComposeError {}

impl From<SelectorError> for ComposeError {
    fn from(err: SelectorError) -> Self {
        Self::Configuration {
            owner: err.input.clone(),
            reason: err.reason.to_string(),
        }
    }
}
