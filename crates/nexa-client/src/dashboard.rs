//! Figures for the landing dashboard, computed over role-scoped views.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use nexa_shared::constants::{DASHBOARD_LIST_LIMIT, RECENT_CONVERSATION_HOURS};
use nexa_shared::types::{AiStatus, ConversationStatus, DealStage, TaskPriority, TaskStatus};
use nexa_store::{Conversation, Deal, Task};

use crate::tasks::upcoming_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_conversations: usize,
    pub active_conversations: usize,
    pub unread_messages: u32,
    pub ai_active_conversations: usize,
    pub ai_paused_conversations: usize,
    pub pending_tasks: usize,
    pub high_priority_tasks: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_deal_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub closed_deal_value: Decimal,
    /// Newest first, at most five, last message within 24 hours.
    pub recent_conversations: Vec<Conversation>,
    /// Pending tasks due soonest first, at most five.
    pub upcoming_tasks: Vec<Task>,
}

impl DashboardSummary {
    pub fn compute(
        conversations: &[Conversation],
        tasks: &[Task],
        deals: &[Deal],
        now: DateTime<Utc>,
    ) -> Self {
        let count_ai = |mode: AiStatus| conversations.iter().filter(|c| c.ai_status == mode).count();

        let cutoff = now - Duration::hours(RECENT_CONVERSATION_HOURS);
        let mut recent: Vec<Conversation> = conversations
            .iter()
            .filter(|c| c.last_message_time >= cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        recent.truncate(DASHBOARD_LIST_LIMIT);

        Self {
            total_conversations: conversations.len(),
            active_conversations: conversations
                .iter()
                .filter(|c| c.status == ConversationStatus::Active)
                .count(),
            unread_messages: conversations.iter().map(|c| c.unread_count).sum(),
            ai_active_conversations: count_ai(AiStatus::Active),
            ai_paused_conversations: count_ai(AiStatus::Paused),
            pending_tasks: tasks.iter().filter(|t| t.status != TaskStatus::Done).count(),
            high_priority_tasks: tasks
                .iter()
                .filter(|t| t.priority == TaskPriority::High)
                .count(),
            total_deal_value: deals.iter().map(|d| d.value).sum(),
            closed_deal_value: deals
                .iter()
                .filter(|d| d.stage == DealStage::Closed)
                .map(|d| d.value)
                .sum(),
            recent_conversations: recent,
            upcoming_tasks: upcoming_of(tasks, DASHBOARD_LIST_LIMIT),
        }
    }
}
