//! Conversations, their messages and the active-conversation workflow.
//!
//! All appends go through [`ConversationInner::append_locked`], which keeps
//! each conversation's `lastMessage`/`lastMessageTime` equal to its newest
//! message. The state lock is held for the whole append so the simulator can
//! re-check the active selection atomically before delivering.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use nexa_shared::constants::{ASSISTANT_NAME, ASSISTANT_REPLY, SYSTEM_SENDER_NAME};
use nexa_shared::types::{AiStatus, ConversationId, ConversationStatus, MessageSender, UserId};
use nexa_shared::CrmError;
use nexa_store::{Conversation, Message, Storage, StorageKey, User};

use crate::collection::{lock, viewer_changed, Collection};
use crate::events::Notifier;
use crate::session::SessionStore;
use crate::settings::ClientSettings;
use crate::simulator::SimulatorHandle;
use crate::visibility;

#[derive(Default)]
struct ConversationState {
    /// Role-scoped view of the collection.
    conversations: Vec<Conversation>,
    active: Option<Conversation>,
    /// Messages of the active conversation, oldest first.
    messages: Vec<Message>,
    loading_messages: bool,
    sends_in_flight: u32,
    ai_in_flight: u32,
    simulator: Option<SimulatorHandle>,
}

impl ConversationState {
    fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref().map(|c| &c.id)
    }

    /// Drop the selection and stop its simulator.
    fn clear_selection(&mut self) {
        self.simulator = None;
        self.active = None;
        self.messages.clear();
    }
}

/// Point-in-time copy of the store state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub conversations: Vec<Conversation>,
    pub active: Option<Conversation>,
    pub messages: Vec<Message>,
    pub loading_messages: bool,
    pub sending_message: bool,
    pub ai_processing: bool,
    pub simulator_running: bool,
}

#[derive(Clone, Copy)]
enum Flight {
    Send,
    Ai,
}

/// Clears an in-flight flag when dropped, including when the awaiting future
/// is cancelled.
struct InFlight {
    inner: Arc<ConversationInner>,
    flight: Flight,
}

impl InFlight {
    fn start(inner: &Arc<ConversationInner>, flight: Flight) -> Self {
        let mut state = lock(&inner.state);
        match flight {
            Flight::Send => state.sends_in_flight += 1,
            Flight::Ai => state.ai_in_flight += 1,
        }
        Self {
            inner: Arc::clone(inner),
            flight,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = lock(&self.inner.state);
        let counter = match self.flight {
            Flight::Send => &mut state.sends_in_flight,
            Flight::Ai => &mut state.ai_in_flight,
        };
        *counter = counter.saturating_sub(1);
    }
}

pub(crate) struct ConversationInner {
    collection: Collection<Conversation>,
    storage: Storage,
    session: SessionStore,
    viewer: Mutex<watch::Receiver<Option<User>>>,
    notifier: Notifier,
    settings: ClientSettings,
    state: Mutex<ConversationState>,
}

impl ConversationInner {
    fn load_messages(&self) -> Vec<Message> {
        self.storage.get(StorageKey::Messages, Vec::new())
    }

    fn messages_of(&self, conversation_id: &ConversationId) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .load_messages()
            .into_iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        messages
    }

    /// Recompute the scoped list and the active record from `all`.
    fn publish_locked(&self, state: &mut ConversationState, all: &[Conversation]) {
        let viewer = lock(&self.viewer).borrow_and_update().clone();
        state.conversations = visibility::scoped(viewer.as_ref(), all);
        if let Some(active) = state.active.as_mut() {
            if let Some(fresh) = all.iter().find(|c| c.id == active.id) {
                *active = fresh.clone();
            }
        }
    }

    /// Persist `message`, refresh its conversation's last-message cache and
    /// apply `update` to the conversation. Nothing is written when the
    /// conversation no longer exists.
    fn append_locked<F>(
        &self,
        state: &mut ConversationState,
        message: Message,
        update: F,
    ) -> Option<Conversation>
    where
        F: FnOnce(&mut Conversation),
    {
        let mut all = self.collection.load();
        let conversation = all.iter_mut().find(|c| c.id == message.conversation_id)?;

        if message.timestamp >= conversation.last_message_time {
            conversation.last_message = message.content.clone();
            conversation.last_message_time = message.timestamp;
        }
        update(conversation);
        let updated = conversation.clone();

        let mut messages = self.load_messages();
        messages.push(message.clone());
        self.storage.set(StorageKey::Messages, &messages);
        self.collection.save(&all);

        if state.active_id() == Some(&message.conversation_id) {
            state.messages.push(message.clone());
            state.messages.sort_by_key(|m| m.timestamp);
        }
        self.publish_locked(state, &all);

        tracing::debug!(
            conversation_id = %message.conversation_id,
            sender = ?message.sender,
            "Message appended"
        );
        Some(updated)
    }

    fn mark_read_locked(&self, state: &mut ConversationState, conversation_id: &ConversationId) {
        let Some((_, all)) = self.collection.update(conversation_id, |c| c.unread_count = 0) else {
            return;
        };

        let mut messages = self.load_messages();
        for message in messages.iter_mut().filter(|m| &m.conversation_id == conversation_id) {
            message.is_read = true;
        }
        self.storage.set(StorageKey::Messages, &messages);

        if state.active_id() == Some(conversation_id) {
            for message in &mut state.messages {
                message.is_read = true;
            }
        }
        self.publish_locked(state, &all);
    }

    /// Simulator delivery. Appends only if `token` is live and
    /// `conversation_id` is still the active conversation; returns whether the
    /// message was delivered.
    pub(crate) fn deliver_simulated(
        &self,
        conversation_id: &ConversationId,
        token: &CancellationToken,
        content: &str,
    ) -> bool {
        let mut state = lock(&self.state);
        if token.is_cancelled() || state.active_id() != Some(conversation_id) {
            return false;
        }
        let Some(contact) = state.active.as_ref().map(|c| c.contact_name.clone()) else {
            return false;
        };

        let message = Message::new(
            conversation_id.clone(),
            MessageSender::Contact,
            contact.as_str(),
            content,
            Utc::now(),
            false,
        );
        let delivered = self
            .append_locked(&mut state, message, |c| {
                c.unread_count = c.unread_count.saturating_add(1);
            })
            .is_some();
        drop(state);

        if delivered {
            self.notifier.incoming(format!("Nova mensagem de {contact}"));
        }
        delivered
    }
}

/// The conversation inbox of the logged-in user.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<ConversationInner>,
}

impl ConversationStore {
    pub fn new(
        storage: Storage,
        session: SessionStore,
        notifier: Notifier,
        settings: ClientSettings,
    ) -> Self {
        let store = Self {
            inner: Arc::new(ConversationInner {
                collection: Collection::new(storage.clone()),
                storage,
                viewer: Mutex::new(session.watch()),
                session,
                notifier,
                settings,
                state: Mutex::new(ConversationState::default()),
            }),
        };
        store.refresh();
        store
    }

    /// Recompute the role-scoped list. Reads do this on their own after the
    /// session user changes.
    pub fn refresh(&self) {
        let all = self.inner.collection.load();
        let mut state = lock(&self.inner.state);
        self.inner.publish_locked(&mut state, &all);
    }

    fn follow_session(&self) {
        if viewer_changed(&self.inner.viewer) {
            self.refresh();
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.follow_session();
        lock(&self.inner.state).conversations.clone()
    }

    pub fn active(&self) -> Option<Conversation> {
        lock(&self.inner.state).active.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.inner.state).messages.clone()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.follow_session();
        let state = lock(&self.inner.state);
        ConversationSnapshot {
            conversations: state.conversations.clone(),
            active: state.active.clone(),
            messages: state.messages.clone(),
            loading_messages: state.loading_messages,
            sending_message: state.sends_in_flight > 0,
            ai_processing: state.ai_in_flight > 0,
            simulator_running: state
                .simulator
                .as_ref()
                .is_some_and(|s| !s.is_cancelled()),
        }
    }

    /// Make `conversation_id` the active conversation, or clear the selection
    /// with `None`.
    ///
    /// The previous simulator loop is cancelled first. Selecting loads the
    /// conversation's messages, marks it read and starts a new loop. The id is
    /// resolved against the full collection, not the scoped view; an unknown
    /// id clears the selection.
    pub fn select_conversation(&self, conversation_id: Option<&ConversationId>) {
        let mut state = lock(&self.inner.state);
        state.clear_selection();

        let Some(id) = conversation_id else {
            tracing::debug!("Selection cleared");
            return;
        };
        let all = self.inner.collection.load();
        let Some(conversation) = all.into_iter().find(|c| &c.id == id) else {
            tracing::debug!(conversation_id = %id, "Selected conversation does not exist");
            return;
        };

        state.loading_messages = true;
        state.messages = self.inner.messages_of(id);
        state.active = Some(conversation);
        self.inner.mark_read_locked(&mut state, id);
        state.loading_messages = false;

        state.simulator = SimulatorHandle::spawn(
            Arc::downgrade(&self.inner),
            id.clone(),
            self.inner.settings.simulator.clone(),
        );
        tracing::debug!(conversation_id = %id, "Conversation selected");
    }

    /// Reply as the logged-in operator. Blank text, no selection or no session
    /// is a no-op returning `None`.
    ///
    /// The message is appended right away and the conversation is forced back
    /// to active; the call then holds `sending_message` for the configured
    /// delay.
    pub async fn send_message(&self, text: &str) -> Option<Message> {
        if text.trim().is_empty() {
            return None;
        }
        let user = self.inner.session.current_user()?;

        let message = {
            let mut state = lock(&self.inner.state);
            let conversation_id = state.active_id()?.clone();
            let message = Message::new(
                conversation_id,
                MessageSender::Operator,
                user.name.as_str(),
                text,
                Utc::now(),
                true,
            );
            self.inner.append_locked(&mut state, message.clone(), |c| {
                c.status = ConversationStatus::Active;
            })?;
            message
        };

        let _flight = InFlight::start(&self.inner, Flight::Send);
        tokio::time::sleep(self.inner.settings.send_delay()).await;
        Some(message)
    }

    /// Ask the assistant to answer in the active conversation. After the
    /// configured delay a fixed reply is appended to the conversation that was
    /// active when the call started.
    pub async fn trigger_ai(&self) -> Option<Message> {
        self.inner.session.current_user()?;
        let conversation_id = lock(&self.inner.state).active_id()?.clone();

        let _flight = InFlight::start(&self.inner, Flight::Ai);
        tokio::time::sleep(self.inner.settings.ai_delay()).await;

        let message = Message::new(
            conversation_id,
            MessageSender::Assistant,
            ASSISTANT_NAME,
            ASSISTANT_REPLY,
            Utc::now(),
            true,
        );
        {
            let mut state = lock(&self.inner.state);
            self.inner.append_locked(&mut state, message.clone(), |_| {})?;
        }

        self.inner.notifier.success("IA ativada para esta conversa!");
        Some(message)
    }

    /// Reassign the active conversation to `target`.
    ///
    /// A system message announces the transfer. A non-admin who hands the
    /// conversation to someone else loses the selection.
    pub fn transfer_conversation(&self, target: &UserId) -> Result<Option<Conversation>, CrmError> {
        let mut state = lock(&self.inner.state);
        let Some(conversation_id) = state.active_id().cloned() else {
            return Ok(None);
        };

        let users: Vec<User> = self.inner.storage.get(StorageKey::Users, Vec::new());
        let Some(target_user) = users.into_iter().find(|u| &u.id == target) else {
            drop(state);
            let err = CrmError::UserNotFound(target.clone());
            tracing::warn!(conversation_id = %conversation_id, target_user_id = %target, "Transfer target does not exist");
            self.inner.notifier.error(err.to_string());
            return Err(err);
        };

        let notice = Message::new(
            conversation_id.clone(),
            MessageSender::Operator,
            SYSTEM_SENDER_NAME,
            format!("Conversa transferida para {}", target_user.name),
            Utc::now(),
            true,
        );
        let updated = self.inner.append_locked(&mut state, notice, |c| {
            c.assigned_to_id = target_user.id.clone();
        });

        let keeps_selection = self
            .inner
            .session
            .current_user()
            .is_some_and(|me| me.is_admin() || &me.id == target);
        if !keeps_selection {
            state.clear_selection();
        }
        drop(state);

        tracing::info!(conversation_id = %conversation_id, target_user_id = %target, "Conversation transferred");
        self.inner
            .notifier
            .success(format!("Conversa transferida para {}", target_user.name));
        Ok(updated)
    }

    /// Zero the unread counter and mark every message read. Idempotent.
    pub fn mark_read(&self, conversation_id: &ConversationId) {
        let mut state = lock(&self.inner.state);
        self.inner.mark_read_locked(&mut state, conversation_id);
    }

    pub fn set_status(
        &self,
        conversation_id: &ConversationId,
        status: ConversationStatus,
    ) -> Option<Conversation> {
        let updated = self.update(conversation_id, |c| c.status = status)?;
        self.inner.notifier.success("Status da conversa atualizado");
        Some(updated)
    }

    pub fn set_ai_status(&self, conversation_id: &ConversationId, mode: AiStatus) -> Option<Conversation> {
        let updated = self.update(conversation_id, |c| c.ai_status = mode)?;
        self.inner.notifier.success("Modo do assistente atualizado");
        Some(updated)
    }

    fn update<F>(&self, conversation_id: &ConversationId, f: F) -> Option<Conversation>
    where
        F: FnOnce(&mut Conversation),
    {
        let mut state = lock(&self.inner.state);
        let (updated, all) = self.inner.collection.update(conversation_id, f)?;
        self.inner.publish_locked(&mut state, &all);
        Some(updated)
    }

    /// Stop the simulator and drop the selection, for when the owning view
    /// goes away.
    pub fn teardown(&self) {
        lock(&self.inner.state).clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nexa_shared::types::Role;

    use super::*;
    use crate::events::NotificationKind;
    use crate::settings::SimulatorSettings;

    struct Fixture {
        storage: Storage,
        session: SessionStore,
        notifier: Notifier,
        store: ConversationStore,
    }

    fn fixture_with(simulator: SimulatorSettings, email: &str) -> Fixture {
        let storage = Storage::in_memory();
        let notifier = Notifier::new();
        let session = SessionStore::new(storage.clone(), notifier.clone());
        session.initialize().unwrap();
        session.login(email, "").unwrap();
        let settings = ClientSettings {
            simulator,
            ..ClientSettings::default()
        };
        let store = ConversationStore::new(storage.clone(), session.clone(), notifier.clone(), settings);
        Fixture {
            storage,
            session,
            notifier,
            store,
        }
    }

    fn fixture(email: &str) -> Fixture {
        let quiet = SimulatorSettings {
            message_probability: 0.0,
            ..SimulatorSettings::default()
        };
        fixture_with(quiet, email)
    }

    fn always(secs: u64) -> SimulatorSettings {
        SimulatorSettings {
            min_delay_secs: secs,
            max_delay_secs: secs,
            message_probability: 1.0,
        }
    }

    /// The cached last message matches the newest stored message everywhere.
    fn assert_cache_consistent(storage: &Storage) {
        let conversations: Vec<Conversation> = storage.get(StorageKey::Conversations, Vec::new());
        let messages: Vec<Message> = storage.get(StorageKey::Messages, Vec::new());
        for conv in conversations {
            let newest = messages
                .iter()
                .filter(|m| m.conversation_id == conv.id)
                .max_by_key(|m| m.timestamp)
                .unwrap();
            assert_eq!(newest.content, conv.last_message, "{}", conv.contact_name);
            assert_eq!(newest.timestamp, conv.last_message_time);
        }
    }

    fn with_unread(store: &ConversationStore) -> Conversation {
        store
            .conversations()
            .into_iter()
            .find(|c| c.unread_count > 0)
            .unwrap()
    }

    #[test]
    fn agent_sees_only_assigned_conversations() {
        let f = fixture("maria@nexaautomations.com");
        let me = f.session.current_user().unwrap();
        let visible = f.store.conversations();

        assert!(!visible.is_empty());
        assert!(visible.iter().all(|c| c.assigned_to_id == me.id));
    }

    #[test]
    fn admin_sees_full_collection() {
        let f = fixture("admin@nexaautomations.com");
        let all: Vec<Conversation> = f.storage.get(StorageKey::Conversations, Vec::new());
        assert_eq!(f.store.conversations(), all);
    }

    #[test]
    fn selecting_marks_read_and_loads_sorted_messages() {
        let f = fixture("admin@nexaautomations.com");
        let target = with_unread(&f.store);

        f.store.select_conversation(Some(&target.id));

        let snapshot = f.store.snapshot();
        assert_eq!(snapshot.active.as_ref().unwrap().unread_count, 0);
        assert!(!snapshot.messages.is_empty());
        assert!(snapshot.messages.iter().all(|m| m.is_read && m.conversation_id == target.id));
        assert!(snapshot.messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        // No runtime in a plain test, so no loop.
        assert!(!snapshot.simulator_running);
    }

    #[test]
    fn mark_read_is_idempotent() {
        let f = fixture("admin@nexaautomations.com");
        let target = with_unread(&f.store);

        for _ in 0..2 {
            f.store.mark_read(&target.id);
            let conversations: Vec<Conversation> = f.storage.get(StorageKey::Conversations, Vec::new());
            let conv = conversations.iter().find(|c| c.id == target.id).unwrap();
            assert_eq!(conv.unread_count, 0);

            let messages: Vec<Message> = f.storage.get(StorageKey::Messages, Vec::new());
            assert!(messages
                .iter()
                .filter(|m| m.conversation_id == target.id)
                .all(|m| m.is_read));
        }
    }

    #[test]
    fn unknown_selection_clears() {
        let f = fixture("admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));

        f.store.select_conversation(Some(&ConversationId::new()));
        assert!(f.store.active().is_none());
        assert!(f.store.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_message_is_ignored() {
        let f = fixture("admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));
        let raw_before = f.storage.raw(StorageKey::Messages);

        let store = f.store.clone();
        let send = tokio::spawn(async move { store.send_message("  ").await });
        tokio::task::yield_now().await;
        assert!(!f.store.snapshot().sending_message);

        assert!(send.await.unwrap().is_none());
        assert!(!f.store.snapshot().sending_message);
        assert_eq!(f.storage.raw(StorageKey::Messages), raw_before);
    }

    #[tokio::test(start_paused = true)]
    async fn send_appends_reactivates_and_holds_flag() {
        let f = fixture("admin@nexaautomations.com");
        let closed = f
            .store
            .conversations()
            .into_iter()
            .find(|c| c.status == ConversationStatus::Closed)
            .unwrap();
        f.store.select_conversation(Some(&closed.id));

        let store = f.store.clone();
        let send = tokio::spawn(async move { store.send_message("Podemos conversar amanhã?").await });
        tokio::task::yield_now().await;

        let during = f.store.snapshot();
        assert!(during.sending_message);
        assert_eq!(during.messages.last().unwrap().content, "Podemos conversar amanhã?");
        let active = during.active.unwrap();
        assert_eq!(active.status, ConversationStatus::Active);
        assert_eq!(active.last_message, "Podemos conversar amanhã?");

        let sent = send.await.unwrap().unwrap();
        assert_eq!(sent.sender, MessageSender::Operator);
        assert_eq!(sent.sender_name, "Admin User");
        assert!(!f.store.snapshot().sending_message);
        assert_cache_consistent(&f.storage);
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_selection_is_noop() {
        let f = fixture("admin@nexaautomations.com");
        assert!(f.store.send_message("olá").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_send_still_clears_flag() {
        let f = fixture("admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));

        let store = f.store.clone();
        let send = tokio::spawn(async move { store.send_message("teste").await });
        tokio::task::yield_now().await;
        assert!(f.store.snapshot().sending_message);

        send.abort();
        let _ = send.await;
        assert!(!f.store.snapshot().sending_message);
    }

    #[tokio::test(start_paused = true)]
    async fn ai_reply_arrives_after_delay() {
        let f = fixture("admin@nexaautomations.com");
        let mut rx = f.notifier.subscribe();
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));

        let store = f.store.clone();
        let ai = tokio::spawn(async move { store.trigger_ai().await });
        tokio::task::yield_now().await;
        assert!(f.store.snapshot().ai_processing);
        assert_ne!(f.store.messages().last().unwrap().content, ASSISTANT_REPLY);

        let reply = ai.await.unwrap().unwrap();
        let snapshot = f.store.snapshot();
        assert!(!snapshot.ai_processing);
        assert_eq!(reply.sender, MessageSender::Assistant);
        assert_eq!(snapshot.messages.last().unwrap().content, ASSISTANT_REPLY);
        assert_eq!(snapshot.active.unwrap().status, first.status);
        assert_cache_consistent(&f.storage);

        let toast = rx.try_recv().unwrap();
        assert_eq!(toast.text, "IA ativada para esta conversa!");
    }

    #[tokio::test(start_paused = true)]
    async fn ai_reply_lands_in_original_conversation_after_switch() {
        let f = fixture("admin@nexaautomations.com");
        let conversations = f.store.conversations();
        let (a, b) = (conversations[0].clone(), conversations[1].clone());
        f.store.select_conversation(Some(&a.id));

        let store = f.store.clone();
        let ai = tokio::spawn(async move { store.trigger_ai().await });
        tokio::task::yield_now().await;
        f.store.select_conversation(Some(&b.id));

        let reply = ai.await.unwrap().unwrap();
        assert_eq!(reply.conversation_id, a.id);
        assert!(f.store.messages().iter().all(|m| m.conversation_id == b.id));
        assert_cache_consistent(&f.storage);
    }

    #[test]
    fn transfer_away_clears_agent_selection() {
        let f = fixture("maria@nexaautomations.com");
        let joao = f
            .session
            .users()
            .into_iter()
            .find(|u| u.name == "João Santos")
            .unwrap();
        let mine = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&mine.id));

        let updated = f.store.transfer_conversation(&joao.id).unwrap().unwrap();

        assert_eq!(updated.assigned_to_id, joao.id);
        assert_eq!(updated.last_message, "Conversa transferida para João Santos");
        assert!(f.store.active().is_none());
        assert!(!f.store.conversations().iter().any(|c| c.id == mine.id));
        assert_cache_consistent(&f.storage);
    }

    #[test]
    fn forced_selection_of_foreign_conversation_then_transfer_clears() {
        let f = fixture("maria@nexaautomations.com");
        let me = f.session.current_user().unwrap();
        let all: Vec<Conversation> = f.storage.get(StorageKey::Conversations, Vec::new());
        let foreign = all.iter().find(|c| c.assigned_to_id != me.id).unwrap();
        let owner = foreign.assigned_to_id.clone();

        f.store.select_conversation(Some(&foreign.id));
        assert!(f.store.active().is_some());

        f.store.transfer_conversation(&owner).unwrap();
        assert!(f.store.active().is_none());
    }

    #[test]
    fn admin_keeps_selection_after_transfer() {
        let f = fixture("admin@nexaautomations.com");
        let agent = f
            .session
            .users()
            .into_iter()
            .find(|u| u.role == Role::Agent)
            .unwrap();
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));

        f.store.transfer_conversation(&agent.id).unwrap();

        let active = f.store.active().unwrap();
        assert_eq!(active.assigned_to_id, agent.id);
        let notice = f.store.messages().last().cloned().unwrap();
        assert_eq!(notice.sender, MessageSender::Operator);
        assert_eq!(notice.sender_name, "Sistema");
    }

    #[test]
    fn transfer_without_selection_is_noop() {
        let f = fixture("admin@nexaautomations.com");
        let agent = f
            .session
            .users()
            .into_iter()
            .find(|u| u.role == Role::Agent)
            .unwrap();
        let mut rx = f.notifier.subscribe();
        let conversations_before = f.storage.raw(StorageKey::Conversations);
        let messages_before = f.storage.raw(StorageKey::Messages);

        assert_eq!(f.store.transfer_conversation(&agent.id), Ok(None));

        assert_eq!(f.storage.raw(StorageKey::Conversations), conversations_before);
        assert_eq!(f.storage.raw(StorageKey::Messages), messages_before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn transfer_to_unknown_user_changes_nothing() {
        let f = fixture("admin@nexaautomations.com");
        let mut rx = f.notifier.subscribe();
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));
        let conversations_before = f.storage.raw(StorageKey::Conversations);
        let messages_before = f.storage.raw(StorageKey::Messages);

        let err = f.store.transfer_conversation(&UserId::new()).unwrap_err();

        assert!(matches!(err, CrmError::UserNotFound(_)));
        assert_eq!(f.storage.raw(StorageKey::Conversations), conversations_before);
        assert_eq!(f.storage.raw(StorageKey::Messages), messages_before);
        assert_eq!(f.store.active().unwrap().id, first.id);
        assert_eq!(rx.try_recv().unwrap().kind, NotificationKind::Error);
    }

    #[test]
    fn status_operations_accept_any_transition() {
        let f = fixture("admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();

        for status in [ConversationStatus::Closed, ConversationStatus::Pending, ConversationStatus::Active] {
            let updated = f.store.set_status(&first.id, status).unwrap();
            assert_eq!(updated.status, status);
        }
        let updated = f.store.set_ai_status(&first.id, AiStatus::Manual).unwrap();
        assert_eq!(updated.ai_status, AiStatus::Manual);
        assert!(f.store.set_status(&ConversationId::new(), ConversationStatus::Closed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn simulator_delivers_to_active_conversation() {
        let f = fixture_with(always(30), "admin@nexaautomations.com");
        let mut rx = f.notifier.subscribe();
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));
        assert!(f.store.snapshot().simulator_running);
        let count_before = f.store.messages().len();

        tokio::time::sleep(Duration::from_secs(31)).await;

        let snapshot = f.store.snapshot();
        assert_eq!(snapshot.messages.len(), count_before + 1);
        let inbound = snapshot.messages.last().unwrap();
        assert_eq!(inbound.sender, MessageSender::Contact);
        assert!(!inbound.is_read);
        assert_eq!(snapshot.active.unwrap().unread_count, 1);
        assert_cache_consistent(&f.storage);

        let toast = rx.try_recv().unwrap();
        assert_eq!(toast.kind, NotificationKind::Incoming);
        assert_eq!(toast.text, format!("Nova mensagem de {}", first.contact_name));

        // The loop reschedules itself.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(f.store.messages().len(), count_before + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn changing_selection_cancels_previous_loop() {
        let f = fixture_with(always(30), "admin@nexaautomations.com");
        let conversations = f.store.conversations();
        let (a, b) = (conversations[0].clone(), conversations[1].clone());
        let stored_for = |id: &ConversationId| {
            let messages: Vec<Message> = f.storage.get(StorageKey::Messages, Vec::new());
            messages.iter().filter(|m| &m.conversation_id == id).count()
        };
        let a_before = stored_for(&a.id);

        f.store.select_conversation(Some(&a.id));
        tokio::time::sleep(Duration::from_secs(10)).await;
        f.store.select_conversation(Some(&b.id));
        let b_before = stored_for(&b.id);

        // A's wake-up at 30s must not fire; B's is due at 40s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(stored_for(&a.id), a_before);
        assert_eq!(stored_for(&b.id), b_before);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(stored_for(&a.id), a_before);
        assert_eq!(stored_for(&b.id), b_before + 1);
        assert_eq!(f.store.messages().len(), b_before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_the_loop() {
        let f = fixture_with(always(30), "admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));
        let raw_before = f.storage.raw(StorageKey::Messages);

        f.store.teardown();
        assert!(!f.store.snapshot().simulator_running);
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(f.storage.raw(StorageKey::Messages), raw_before);
        assert!(f.store.active().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_probability_never_delivers() {
        let f = fixture("admin@nexaautomations.com");
        let first = f.store.conversations()[0].clone();
        f.store.select_conversation(Some(&first.id));
        let raw_before = f.storage.raw(StorageKey::Messages);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(f.storage.raw(StorageKey::Messages), raw_before);
        assert!(f.store.snapshot().simulator_running);
    }
}
