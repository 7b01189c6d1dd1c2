//! Creation drafts and partial-update patches.
//!
//! A draft is an entity without its generated fields. A patch names each field
//! that may change; identity and creation timestamps are deliberately absent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexa_shared::types::{DealId, DealStage, Role, TaskId, TaskPriority, TaskStatus, UserId};
use nexa_shared::validation;
use nexa_shared::CrmError;

use crate::models::{Deal, RelatedTo, Task, User};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), CrmError> {
        validation::min_chars("name", &self.name, 2)?;
        validation::email("email", &self.email)?;
        if let Some(password) = &self.password {
            validation::password(password)?;
        }
        Ok(())
    }

    pub fn into_user(self) -> User {
        User {
            id: UserId::new(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: self.role,
            avatar_url: self.avatar_url,
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` clears the avatar.
    pub avatar_url: Option<Option<String>>,
    /// An empty password leaves the stored one untouched.
    pub password: Option<String>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), CrmError> {
        if let Some(name) = &self.name {
            validation::min_chars("name", name, 2)?;
        }
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            validation::password(password)?;
        }
        Ok(())
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = email.trim().to_string();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(avatar_url) = &self.avatar_url {
            user.avatar_url = avatar_url.clone();
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            user.password = Some(password.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to_id: UserId,
    #[serde(default)]
    pub related_to: Option<RelatedTo>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), CrmError> {
        validation::min_chars("title", &self.title, 3)?;
        validation::min_chars("description", &self.description, 5)
    }

    pub fn into_task(self) -> Task {
        Task {
            id: TaskId::new(),
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            status: self.status,
            priority: self.priority,
            assigned_to_id: self.assigned_to_id,
            related_to: self.related_to,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to_id: Option<UserId>,
    /// `Some(None)` unlinks the task.
    pub related_to: Option<Option<RelatedTo>>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), CrmError> {
        if let Some(title) = &self.title {
            validation::min_chars("title", title, 3)?;
        }
        if let Some(description) = &self.description {
            validation::min_chars("description", description, 5)?;
        }
        Ok(())
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assigned_to_id) = &self.assigned_to_id {
            task.assigned_to_id = assigned_to_id.clone();
        }
        if let Some(related_to) = &self.related_to {
            task.related_to = related_to.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Deal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub company: String,
    pub contact_name: String,
    pub contact_email: String,
    pub stage: DealStage,
    pub assigned_to_id: UserId,
}

fn validate_deal_value(value: Decimal) -> Result<(), CrmError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CrmError::invalid("value", "o valor não pode ser negativo"));
    }
    Ok(())
}

impl NewDeal {
    pub fn validate(&self) -> Result<(), CrmError> {
        validation::min_chars("title", &self.title, 3)?;
        validation::min_chars("company", &self.company, 2)?;
        validation::min_chars("contactName", &self.contact_name, 3)?;
        validation::email("contactEmail", &self.contact_email)?;
        validate_deal_value(self.value)
    }

    /// Both timestamps are set to `now`.
    pub fn into_deal(self, now: DateTime<Utc>) -> Deal {
        Deal {
            id: DealId::new(),
            title: self.title,
            value: self.value,
            company: self.company,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            stage: self.stage,
            created_at: now,
            updated_at: now,
            assigned_to_id: self.assigned_to_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub title: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub value: Option<Decimal>,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub stage: Option<DealStage>,
    pub assigned_to_id: Option<UserId>,
}

impl DealPatch {
    pub fn stage(stage: DealStage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CrmError> {
        if let Some(title) = &self.title {
            validation::min_chars("title", title, 3)?;
        }
        if let Some(company) = &self.company {
            validation::min_chars("company", company, 2)?;
        }
        if let Some(contact_name) = &self.contact_name {
            validation::min_chars("contactName", contact_name, 3)?;
        }
        if let Some(contact_email) = &self.contact_email {
            validation::email("contactEmail", contact_email)?;
        }
        if let Some(value) = self.value {
            validate_deal_value(value)?;
        }
        Ok(())
    }

    /// Merge the patch and stamp `updated_at`, even for an empty patch.
    pub fn apply(&self, deal: &mut Deal, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            deal.title = title.clone();
        }
        if let Some(value) = self.value {
            deal.value = value;
        }
        if let Some(company) = &self.company {
            deal.company = company.clone();
        }
        if let Some(contact_name) = &self.contact_name {
            deal.contact_name = contact_name.clone();
        }
        if let Some(contact_email) = &self.contact_email {
            deal.contact_email = contact_email.clone();
        }
        if let Some(stage) = self.stage {
            deal.stage = stage;
        }
        if let Some(assigned_to_id) = &self.assigned_to_id {
            deal.assigned_to_id = assigned_to_id.clone();
        }
        deal.updated_at = now;
    }
}
