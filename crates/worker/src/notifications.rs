use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use shared::notification::{Notification, NotificationPermission};
use tokio::sync::watch;
use tracing::{info, warn};

/// The surface notifications end up on.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: &Notification) -> Result<()>;
}

/// Logs notifications instead of displaying them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            title = %notification.title,
            body = %notification.body,
            tag = notification.tag.as_deref().unwrap_or_default(),
            "notification"
        );
        Ok(())
    }
}

/// Notification permission as granted by the host environment. Both the page
/// and the worker hold a clone; neither owns it.
#[derive(Clone)]
pub struct NotificationPermissions {
    tx: Arc<watch::Sender<NotificationPermission>>,
}

impl NotificationPermissions {
    pub fn new(initial: NotificationPermission) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> NotificationPermission {
        *self.tx.borrow()
    }

    pub fn set(&self, permission: NotificationPermission) {
        self.tx.send_replace(permission);
    }
}

impl Default for NotificationPermissions {
    fn default() -> Self {
        Self::new(NotificationPermission::Default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    Shown,
    /// An active notification with the same tag was replaced.
    Replaced,
    PermissionDenied,
}

/// Active notifications, keyed by tag, owned by the worker task.
pub struct NotificationCenter {
    notifier: Arc<dyn Notifier>,
    permissions: NotificationPermissions,
    active: HashMap<String, Notification>,
    untagged: usize,
}

impl NotificationCenter {
    pub fn new(notifier: Arc<dyn Notifier>, permissions: NotificationPermissions) -> Self {
        Self {
            notifier,
            permissions,
            active: HashMap::new(),
            untagged: 0,
        }
    }

    pub fn display(&mut self, notification: Notification) -> Result<DisplayOutcome> {
        if !self.permissions.current().is_granted() {
            warn!(
                title = %notification.title,
                permission = ?self.permissions.current(),
                "notification permission not granted, dropping notification"
            );
            return Ok(DisplayOutcome::PermissionDenied);
        }

        self.notifier.show(&notification)?;

        let Some(tag) = notification.tag.clone() else {
            self.untagged += 1;
            return Ok(DisplayOutcome::Shown);
        };
        match self.active.insert(tag, notification) {
            Some(_) => Ok(DisplayOutcome::Replaced),
            None => Ok(DisplayOutcome::Shown),
        }
    }

    pub fn active(&self, tag: &str) -> Option<&Notification> {
        self.active.get(tag)
    }

    /// Number of notifications currently on screen.
    pub fn visible(&self) -> usize {
        self.active.len() + self.untagged
    }
}
