//! # nexa-client
//!
//! Client-side data layer of the Nexa CRM: the entity stores the views read
//! from and send intents to, the role-scoped visibility filter, and the
//! simulator that fabricates inbound messages for the active conversation.
//!
//! Everything is synchronous except the two operations that model network
//! latency ([`ConversationStore::send_message`] and
//! [`ConversationStore::trigger_ai`]) and the simulator task, which need a
//! tokio runtime.

pub mod conversations;
pub mod dashboard;
pub mod deals;
pub mod events;
pub mod session;
pub mod settings;
pub mod simulator;
pub mod state;
pub mod tasks;
pub mod visibility;

mod collection;

pub use conversations::{ConversationSnapshot, ConversationStore};
pub use dashboard::DashboardSummary;
pub use deals::{DealBoard, DealStore};
pub use events::{Notification, NotificationKind, Notifier};
pub use session::SessionStore;
pub use settings::{ClientSettings, SimulatorSettings};
pub use simulator::SimulatorHandle;
pub use state::AppState;
pub use tasks::{TaskBoard, TaskStore};
