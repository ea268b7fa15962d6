#![forbid(unsafe_code)]

//! User-facing notifications and the remote-failure record they are built
//! from.

use std::fmt;

use jgui_runtime::{Observable, Subscription};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    #[default]
    Info,
    Error,
}

/// One message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: Level,
    /// Where the user can go to inspect the problem.
    pub link: Option<String>,
    /// Id of the model the notification is about.
    pub model_id: Option<String>,
}

impl Notification {
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: Level::Error,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, id: impl Into<String>) -> Self {
        self.model_id = Some(id.into());
        self
    }
}

/// A failed RPC, described for the user.
///
/// Remote failures are data: they end up in [`Notifications`], never in an
/// `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOperationError {
    pub title: String,
    pub message: String,
    /// Raw error text from the environment.
    pub cause: String,
    pub link: Option<String>,
    pub model_id: Option<String>,
}

impl RemoteOperationError {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            cause: cause.into(),
            link: None,
            model_id: None,
        }
    }

    #[must_use]
    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn model(mut self, id: impl Into<String>) -> Self {
        self.model_id = Some(id.into());
        self
    }
}

impl fmt::Display for RemoteOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.title, self.message, self.cause)
    }
}

impl std::error::Error for RemoteOperationError {}

impl From<RemoteOperationError> for Notification {
    fn from(err: RemoteOperationError) -> Self {
        Self {
            title: err.title,
            message: err.message,
            level: Level::Error,
            link: err.link,
            model_id: err.model_id,
        }
    }
}

/// Observable, append-only notification log.
#[derive(Clone, Default)]
pub struct Notifications {
    items: Observable<Vec<Notification>>,
}

impl Notifications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, notification: impl Into<Notification>) {
        let notification = notification.into();
        tracing::debug!(
            title = %notification.title,
            level = ?notification.level,
            "notification"
        );
        self.items.update(|items| items.push(notification));
    }

    /// Record a remote failure.
    pub fn report(&self, err: RemoteOperationError) {
        tracing::warn!(error = %err, "remote operation failed");
        self.add(err);
    }

    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.items.get()
    }

    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.items.with(|items| items.last().cloned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called with the full log after each addition.
    pub fn subscribe(&self, callback: impl Fn(&Vec<Notification>) + 'static) -> Subscription {
        self.items.subscribe(callback)
    }
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications")
            .field("len", &self.len())
            .finish()
    }
}
