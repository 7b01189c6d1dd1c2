//! Persisted collections and the generic role-scoped store built on them.
//!
//! Every mutation reads the full collection from [`Storage`], changes it and
//! writes it back, then recomputes the in-memory role-scoped view. The view
//! is also recomputed on the first read after the session user changes.
//! Stale ids match nothing and leave the collection untouched.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use nexa_shared::types::{ConversationId, DealId, TaskId};
use nexa_store::{Assigned, Conversation, Deal, Storage, StorageKey, Task, User};

use crate::session::SessionStore;
use crate::visibility;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether the session user changed since the receiver last published.
pub(crate) fn viewer_changed(viewer: &Mutex<watch::Receiver<Option<User>>>) -> bool {
    lock(viewer).has_changed().unwrap_or(false)
}

/// A record kept as one element of a persisted JSON array.
pub(crate) trait Entity: Assigned + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: PartialEq + std::fmt::Display + Clone + Send + Sync;

    const KEY: StorageKey;

    fn id(&self) -> &Self::Id;
}

impl Entity for Conversation {
    type Id = ConversationId;
    const KEY: StorageKey = StorageKey::Conversations;

    fn id(&self) -> &ConversationId {
        &self.id
    }
}

impl Entity for Task {
    type Id = TaskId;
    const KEY: StorageKey = StorageKey::Tasks;

    fn id(&self) -> &TaskId {
        &self.id
    }
}

impl Entity for Deal {
    type Id = DealId;
    const KEY: StorageKey = StorageKey::Deals;

    fn id(&self) -> &DealId {
        &self.id
    }
}

/// Typed access to one persisted array.
pub(crate) struct Collection<T> {
    storage: Storage,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Collection<T> {
    pub(crate) fn new(storage: Storage) -> Self {
        Self {
            storage,
            _entity: PhantomData,
        }
    }

    pub(crate) fn load(&self) -> Vec<T> {
        self.storage.get(T::KEY, Vec::new())
    }

    pub(crate) fn save(&self, all: &[T]) {
        self.storage.set(T::KEY, all);
    }

    pub(crate) fn insert(&self, record: T) -> Vec<T> {
        let mut all = self.load();
        all.push(record);
        self.save(&all);
        all
    }

    /// Apply `f` to the record with `id`. Returns the updated record and the
    /// full collection, or `None` (and writes nothing) for an unknown id.
    pub(crate) fn update<F>(&self, id: &T::Id, f: F) -> Option<(T, Vec<T>)>
    where
        F: FnOnce(&mut T),
    {
        let mut all = self.load();
        let record = all.iter_mut().find(|r| r.id() == id)?;
        f(record);
        let updated = record.clone();
        self.save(&all);
        Some((updated, all))
    }

    /// Remove the record with `id`. Returns the remaining collection, or
    /// `None` for an unknown id.
    pub(crate) fn remove(&self, id: &T::Id) -> Option<Vec<T>> {
        let mut all = self.load();
        let before = all.len();
        all.retain(|r| r.id() != id);
        if all.len() == before {
            return None;
        }
        self.save(&all);
        Some(all)
    }
}

struct ScopedInner<T> {
    collection: Collection<T>,
    viewer: Mutex<watch::Receiver<Option<User>>>,
    visible: Mutex<Vec<T>>,
}

/// A persisted collection plus the current user's view of it.
pub(crate) struct ScopedStore<T> {
    inner: Arc<ScopedInner<T>>,
}

impl<T> Clone for ScopedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> ScopedStore<T> {
    pub(crate) fn new(storage: Storage, session: SessionStore) -> Self {
        let store = Self {
            inner: Arc::new(ScopedInner {
                collection: Collection::new(storage),
                viewer: Mutex::new(session.watch()),
                visible: Mutex::new(Vec::new()),
            }),
        };
        store.refresh();
        store
    }

    /// Recompute the view from storage for the current session user.
    pub(crate) fn refresh(&self) {
        let all = self.inner.collection.load();
        self.publish(&all);
    }

    fn publish(&self, all: &[T]) {
        let viewer = lock(&self.inner.viewer).borrow_and_update().clone();
        let view = visibility::scoped(viewer.as_ref(), all);
        *lock(&self.inner.visible) = view;
    }

    pub(crate) fn visible(&self) -> Vec<T> {
        if viewer_changed(&self.inner.viewer) {
            self.refresh();
        }
        lock(&self.inner.visible).clone()
    }

    pub(crate) fn insert(&self, record: T) {
        let all = self.inner.collection.insert(record);
        self.publish(&all);
    }

    pub(crate) fn update<F>(&self, id: &T::Id, f: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let (updated, all) = self.inner.collection.update(id, f)?;
        self.publish(&all);
        Some(updated)
    }

    pub(crate) fn remove(&self, id: &T::Id) -> bool {
        match self.inner.collection.remove(id) {
            Some(all) => {
                self.publish(&all);
                true
            }
            None => false,
        }
    }
}
