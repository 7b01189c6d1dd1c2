//! Application state shared by every view.
//!
//! [`AppState`] is built once at start-up and handed to consumers by
//! reference. It owns the storage handle, the notification bus and one store
//! per entity, and keeps the role-scoped views in step with the session.

use chrono::Utc;

use nexa_shared::CrmError;
use nexa_store::{Storage, User};

use crate::conversations::ConversationStore;
use crate::dashboard::DashboardSummary;
use crate::deals::DealStore;
use crate::events::Notifier;
use crate::session::SessionStore;
use crate::settings::ClientSettings;
use crate::tasks::TaskStore;

pub struct AppState {
    pub storage: Storage,
    pub notifier: Notifier,
    pub session: SessionStore,
    pub conversations: ConversationStore,
    pub tasks: TaskStore,
    pub deals: DealStore,
}

impl AppState {
    pub fn new(storage: Storage, settings: ClientSettings) -> Self {
        let notifier = Notifier::new();
        let session = SessionStore::new(storage.clone(), notifier.clone());
        let conversations =
            ConversationStore::new(storage.clone(), session.clone(), notifier.clone(), settings);
        let tasks = TaskStore::new(storage.clone(), session.clone(), notifier.clone());
        let deals = DealStore::new(storage.clone(), session.clone(), notifier.clone());

        Self {
            storage,
            notifier,
            session,
            conversations,
            tasks,
            deals,
        }
    }

    /// Seed if needed, load the persisted session and compute every view.
    pub fn initialize(&self) -> Result<(), CrmError> {
        self.session.initialize()?;
        self.refresh_views();
        Ok(())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<User, CrmError> {
        let user = self.session.login(email, password)?;
        self.conversations.teardown();
        self.refresh_views();
        Ok(user)
    }

    pub fn logout(&self) {
        self.conversations.teardown();
        self.session.logout();
        self.refresh_views();
    }

    /// Recompute all role-scoped views for the current session user.
    pub fn refresh_views(&self) {
        self.conversations.refresh();
        self.tasks.refresh();
        self.deals.refresh();
    }

    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary::compute(
            &self.conversations.conversations(),
            &self.tasks.tasks(),
            &self.deals.deals(),
            Utc::now(),
        )
    }

    /// Stop background work before the state is dropped.
    pub fn shutdown(&self) {
        self.conversations.teardown();
        tracing::info!("Client state shut down");
    }
}
