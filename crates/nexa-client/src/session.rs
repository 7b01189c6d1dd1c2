//! Identity and user administration.
//!
//! Login matches on e-mail only; the password placeholder is never checked.
//! Role checks exposed here are advisory gating for the view layer.
//!
//! Every change of the session user is published on a `watch` channel; the
//! role-scoped stores hold a receiver and re-filter on the next read.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use nexa_shared::types::{Role, UserId};
use nexa_shared::validation;
use nexa_shared::CrmError;
use nexa_store::{seed, NewUser, Storage, StorageKey, User, UserPatch};

use crate::collection::lock;
use crate::events::Notifier;

#[derive(Debug, Default)]
struct SessionState {
    current: Option<User>,
    users: Vec<User>,
    loading: bool,
    initialized: bool,
}

struct SessionInner {
    storage: Storage,
    notifier: Notifier,
    state: Mutex<SessionState>,
    viewer: watch::Sender<Option<User>>,
}

/// The current session and the user collection.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    pub fn new(storage: Storage, notifier: Notifier) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                storage,
                notifier,
                state: Mutex::new(SessionState::default()),
                viewer: watch::Sender::new(None),
            }),
        }
    }

    /// Receiver that observes every change of the session user.
    pub(crate) fn watch(&self) -> watch::Receiver<Option<User>> {
        self.inner.viewer.subscribe()
    }

    fn set_current(&self, state: &mut SessionState, user: Option<User>) -> Option<User> {
        self.inner.viewer.send_replace(user.clone());
        std::mem::replace(&mut state.current, user)
    }

    /// Seed an empty store, then load the persisted session and users.
    /// Later calls do nothing.
    pub fn initialize(&self) -> Result<(), CrmError> {
        {
            let mut state = lock(&self.inner.state);
            if state.initialized {
                return Ok(());
            }
            state.loading = true;
        }

        let seeded = seed::ensure_seeded(&self.inner.storage);
        let mut state = lock(&self.inner.state);
        state.loading = false;
        let seeded = seeded?;

        let persisted: Option<User> = self.inner.storage.get(StorageKey::CurrentUser, None);
        // Prefer the live record in case the session copy went stale.
        let current = persisted.map(|session| {
            seeded
                .users
                .iter()
                .find(|u| u.id == session.id)
                .cloned()
                .unwrap_or(session)
        });
        self.set_current(&mut state, current);
        state.users = seeded.users;
        state.initialized = true;

        tracing::info!(
            users = state.users.len(),
            logged_in = state.current.is_some(),
            "Session initialized"
        );
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner.state).loading
    }

    pub fn current_user(&self) -> Option<User> {
        lock(&self.inner.state).current.clone()
    }

    /// Every user, regardless of the viewer's role.
    pub fn users(&self) -> Vec<User> {
        lock(&self.inner.state).users.clone()
    }

    pub fn can_manage_users(&self) -> bool {
        lock(&self.inner.state)
            .current
            .as_ref()
            .is_some_and(User::is_admin)
    }

    /// Log in by case-insensitive e-mail match. The password is ignored.
    pub fn login(&self, email: &str, _password: &str) -> Result<User, CrmError> {
        let users: Vec<User> = self.inner.storage.get(StorageKey::Users, Vec::new());
        let Some(user) = users.into_iter().find(|u| validation::same_email(&u.email, email)) else {
            tracing::info!(email, "Login rejected: unknown e-mail");
            let err = CrmError::UnknownEmail(email.to_string());
            self.inner.notifier.error(err.to_string());
            return Err(err);
        };

        self.inner.storage.set(StorageKey::CurrentUser, &user);
        self.set_current(&mut lock(&self.inner.state), Some(user.clone()));

        tracing::info!(user_id = %user.id, role = ?user.role, "Logged in");
        self.inner.notifier.success(format!("Bem-vindo, {}!", user.name));
        Ok(user)
    }

    pub fn logout(&self) {
        self.inner.storage.remove(StorageKey::CurrentUser);
        let previous = self.set_current(&mut lock(&self.inner.state), None);
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, "Logged out");
        }
        self.inner.notifier.info("Sessão encerrada");
    }

    pub fn create_user(&self, draft: NewUser) -> Result<User, CrmError> {
        self.report(self.try_create_user(draft), "Usuário criado com sucesso")
    }

    fn try_create_user(&self, draft: NewUser) -> Result<User, CrmError> {
        draft.validate()?;
        let mut users: Vec<User> = self.inner.storage.get(StorageKey::Users, Vec::new());
        if users.iter().any(|u| validation::same_email(&u.email, &draft.email)) {
            return Err(CrmError::DuplicateEmail(draft.email.trim().to_string()));
        }

        let user = draft.into_user();
        users.push(user.clone());
        self.inner.storage.set(StorageKey::Users, &users);
        lock(&self.inner.state).users = users;

        tracing::info!(user_id = %user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Merge `patch` into the user with `id`. Unknown ids are a silent no-op
    /// and yield `Ok(None)`.
    pub fn update_user(&self, id: &UserId, patch: UserPatch) -> Result<Option<User>, CrmError> {
        self.report(self.try_update_user(id, patch), "Usuário atualizado com sucesso")
    }

    fn try_update_user(&self, id: &UserId, patch: UserPatch) -> Result<Option<User>, CrmError> {
        patch.validate()?;
        let mut users: Vec<User> = self.inner.storage.get(StorageKey::Users, Vec::new());

        if let Some(email) = &patch.email {
            if users
                .iter()
                .any(|u| &u.id != id && validation::same_email(&u.email, email))
            {
                return Err(CrmError::DuplicateEmail(email.trim().to_string()));
            }
        }

        let Some(index) = users.iter().position(|u| &u.id == id) else {
            tracing::debug!(user_id = %id, "Update for unknown user ignored");
            return Ok(None);
        };

        if patch.role == Some(Role::Agent) && users[index].is_admin() && admin_count(&users) == 1 {
            return Err(CrmError::LastAdmin);
        }

        patch.apply(&mut users[index]);
        let updated = users[index].clone();
        self.inner.storage.set(StorageKey::Users, &users);

        let mut state = lock(&self.inner.state);
        state.users = users;
        if state.current.as_ref().is_some_and(|c| &c.id == id) {
            self.inner.storage.set(StorageKey::CurrentUser, &updated);
            self.set_current(&mut state, Some(updated.clone()));
        }

        tracing::info!(user_id = %id, "User updated");
        Ok(Some(updated))
    }

    /// Remove the user with `id`. Records assigned to them keep the now
    /// dangling reference. Returns whether a user was removed.
    pub fn delete_user(&self, id: &UserId) -> Result<bool, CrmError> {
        self.report(self.try_delete_user(id), "Usuário excluído com sucesso")
    }

    fn try_delete_user(&self, id: &UserId) -> Result<bool, CrmError> {
        if self.current_user().is_some_and(|c| &c.id == id) {
            return Err(CrmError::SelfDeletion);
        }

        let mut users: Vec<User> = self.inner.storage.get(StorageKey::Users, Vec::new());
        let Some(target) = users.iter().find(|u| &u.id == id) else {
            tracing::debug!(user_id = %id, "Delete for unknown user ignored");
            return Ok(false);
        };
        if target.is_admin() && admin_count(&users) == 1 {
            return Err(CrmError::LastAdmin);
        }

        users.retain(|u| &u.id != id);
        self.inner.storage.set(StorageKey::Users, &users);
        lock(&self.inner.state).users = users;

        tracing::info!(user_id = %id, "User deleted");
        Ok(true)
    }

    /// Publish the outcome of a user-administration operation.
    fn report<T>(&self, result: Result<T, CrmError>, success: &str) -> Result<T, CrmError> {
        match &result {
            Ok(_) => self.inner.notifier.success(success),
            Err(e) => {
                tracing::warn!(error = %e, "User operation rejected");
                self.inner.notifier.error(e.to_string());
            }
        }
        result
    }
}

fn admin_count(users: &[User]) -> usize {
    users.iter().filter(|u| u.is_admin()).count()
}
