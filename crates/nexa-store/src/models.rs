//! Domain model structs persisted as JSON documents.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names, which is the on-disk layout of each collection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexa_shared::types::{
    AiStatus, ConversationId, ConversationStatus, DealId, DealStage, MessageId, MessageSender,
    Role, TaskId, TaskPriority, TaskStatus, UserId,
};

/// Records that are owned by (assigned to) a user. Role-scoped views filter on
/// this.
pub trait Assigned {
    fn assigned_to(&self) -> &UserId;
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A CRM operator account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique across users, compared case-insensitively.
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Placeholder credential. Never checked at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A chat thread with an external contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub contact_name: String,
    pub contact_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    pub status: ConversationStatus,
    pub ai_status: AiStatus,
    pub unread_count: u32,
    /// Content of the chronologically last message (denormalized).
    pub last_message: String,
    /// Timestamp of the chronologically last message (denormalized).
    pub last_message_time: DateTime<Utc>,
    pub assigned_to_id: UserId,
}

impl Assigned for Conversation {
    fn assigned_to(&self) -> &UserId {
        &self.assigned_to_id
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Immutable after creation apart from `is_read`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: MessageSender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub sender_name: String,
}

impl Message {
    pub fn new(
        conversation_id: ConversationId,
        sender: MessageSender,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        is_read: bool,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender,
            content: content.into(),
            timestamp,
            is_read,
            sender_name: sender_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Optional link from a task to the record it is about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum RelatedTo {
    Conversation(ConversationId),
    Deal(DealId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_to: Option<RelatedTo>,
}

impl Assigned for Task {
    fn assigned_to(&self) -> &UserId {
        &self.assigned_to_id
    }
}

// ---------------------------------------------------------------------------
// Deal
// ---------------------------------------------------------------------------

/// A sales opportunity on the pipeline board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub company: String,
    pub contact_name: String,
    pub contact_email: String,
    pub stage: DealStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_to_id: UserId,
}

impl Assigned for Deal {
    fn assigned_to(&self) -> &UserId {
        &self.assigned_to_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_related_to_uses_type_and_id_fields() {
        let conv = ConversationId::new();
        let json = serde_json::to_value(RelatedTo::Conversation(conv.clone())).unwrap();
        assert_eq!(json["type"], "conversation");
        assert_eq!(json["id"], conv.to_string());
    }

    #[test]
    fn deal_value_is_a_json_number() {
        let now = Utc::now();
        let deal = Deal {
            id: DealId::new(),
            title: "Suporte Premium".into(),
            value: Decimal::new(12_000, 0),
            company: "Consulta SA".into(),
            contact_name: "Amanda Reis".into(),
            contact_email: "amanda@consulta.com.br".into(),
            stage: DealStage::Lead,
            created_at: now,
            updated_at: now,
            assigned_to_id: UserId::new(),
        };
        let json = serde_json::to_value(&deal).unwrap();
        assert!(json["value"].is_number());
        assert!(json.get("assignedToId").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn user_without_optional_fields_parses() {
        let json = format!(
            r#"{{"id":"{}","name":"Admin User","email":"admin@nexaautomations.com","role":"admin"}}"#,
            UserId::new()
        );
        let user: User = serde_json::from_str(&json).unwrap();
        assert!(user.is_admin());
        assert!(user.avatar_url.is_none());
        assert!(user.password.is_none());
    }
}
