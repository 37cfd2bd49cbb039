use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::Species,
    notification::{Notification, NotificationPayload, NotificationPermission},
    protocol::{PostedMessage, WorkerMessage},
};
use tracing::{debug, error, info};
use worker::{NotificationPermissions, Notifier, WorkerHandle};

use crate::{
    browse::{reduce, Action, BrowseState, Screen},
    loader::SpeciesLoader,
};

pub const PERMISSION_CONFIRMATION_TITLE: &str = "PokéPWA";
pub const PERMISSION_CONFIRMATION_BODY: &str = "Notifications enabled!";

/// The host environment's notification authorization prompt.
#[async_trait]
pub trait PermissionHost: Send + Sync {
    async fn request_permission(&self) -> NotificationPermission;
}

pub fn species_viewed_message(name: &str) -> WorkerMessage {
    WorkerMessage::ShowNotification(NotificationPayload {
        title: Some(format!("{name} viewed!")),
        body: Some(format!("You viewed {name}. Browse more now!")),
        icon: None,
    })
}

/// Page-side controller. Owns the browse state and is the only thing that
/// replaces it.
pub struct Pokedex {
    state: BrowseState,
    loader: SpeciesLoader,
    worker: Option<WorkerHandle>,
    notifier: Arc<dyn Notifier>,
    permissions: NotificationPermissions,
}

impl Pokedex {
    pub fn new(
        loader: SpeciesLoader,
        worker: Option<WorkerHandle>,
        notifier: Arc<dyn Notifier>,
        permissions: NotificationPermissions,
    ) -> Self {
        Self {
            state: BrowseState::Loading,
            loader,
            worker,
            notifier,
            permissions,
        }
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen()
    }

    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    /// Discards the current collection and loads the listing again.
    pub async fn load(&mut self) {
        self.dispatch(Action::Reload);
        match self.loader.load().await {
            Ok(collection) => self.dispatch(Action::Loaded(collection)),
            Err(err) => {
                error!(error = %err, "failed to load species");
                self.dispatch(Action::LoadFailed(err.to_string()));
            }
        }
    }

    pub fn search(&mut self, term: impl Into<String>) {
        self.dispatch(Action::SearchChanged(term.into()));
    }

    pub fn next_page(&mut self) {
        self.dispatch(Action::NextPage);
    }

    pub fn previous_page(&mut self) {
        self.dispatch(Action::PreviousPage);
    }

    /// Selects the card at `slot` (1-based) on the current page and tells the
    /// worker it was viewed.
    pub async fn select_card(&self, slot: usize) -> Option<Species> {
        let BrowseState::Ready(catalog) = &self.state else {
            return None;
        };
        let species = catalog
            .page_window()
            .get(slot.checked_sub(1)?)
            .map(|species| (*species).clone())?;
        self.notify_species_viewed(&species.name).await;
        Some(species)
    }

    /// Best-effort: returns whether the message was handed to the worker.
    pub async fn notify_species_viewed(&self, name: &str) -> bool {
        let Some(worker) = self.worker.as_ref().filter(|w| w.is_active()) else {
            debug!(%name, "no active worker registration, skipping notification");
            return false;
        };
        let message = PostedMessage::new(&species_viewed_message(name));
        match worker.post_message(message).await {
            Ok(()) => {
                debug!(%name, "posted species-viewed message to worker");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to post message to worker");
                false
            }
        }
    }

    /// Asks the host for notification permission unless it already decided,
    /// and confirms with a notification when it is granted.
    pub async fn request_notification_permission(
        &self,
        host: &dyn PermissionHost,
    ) -> NotificationPermission {
        let permission = match self.permissions.current() {
            NotificationPermission::Default => host.request_permission().await,
            decided => decided,
        };
        self.permissions.set(permission);
        info!(?permission, "notification permission");

        if permission.is_granted() {
            let confirmation =
                Notification::simple(PERMISSION_CONFIRMATION_TITLE, PERMISSION_CONFIRMATION_BODY);
            if let Err(err) = self.notifier.show(&confirmation) {
                error!(error = %err, "failed to show confirmation notification");
            }
        }
        permission
    }
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
